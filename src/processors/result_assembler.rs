use crate::error::Result;
use crate::models::{DatedSamples, ResultTable, SampleRecord};
use tracing::debug;

/// Fills a pre-sized table from sample records.
///
/// The table covers every day of the run and every station before the first record
/// arrives. Records whose date or station falls outside it are counted and dropped.
pub struct ResultAssembler {
    table: ResultTable,
    written: usize,
    dropped: usize,
}

impl ResultAssembler {
    pub fn new(start_year: i32, end_year: i32, stations: Vec<String>) -> Result<Self> {
        Ok(Self::with_table(ResultTable::for_years(
            start_year, end_year, stations,
        )?))
    }

    pub fn with_table(table: ResultTable) -> Self {
        Self {
            table,
            written: 0,
            dropped: 0,
        }
    }

    pub fn write(&mut self, record: SampleRecord) {
        if self.table.set(record.date, &record.station_id, record.value) {
            self.written += 1;
        } else {
            self.dropped += 1;
        }
    }

    pub fn write_samples(&mut self, samples: DatedSamples) {
        for record in samples.into_records() {
            self.write(record);
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn finish(self) -> ResultTable {
        if self.dropped > 0 {
            debug!(
                "Dropped {} records outside the table index ({} written)",
                self.dropped, self.written
            );
        }
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StationValues;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_table_is_dense_before_writes() -> Result<()> {
        let assembler = ResultAssembler::new(2019, 2020, vec!["A".into(), "B".into()])?;
        let table = assembler.finish();
        assert_eq!(table.n_rows(), 365 + 366);
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.filled_count(), 0);
        assert_eq!(table.start_date(), Some(day(2019, 1, 1)));
        assert_eq!(table.end_date(), Some(day(2020, 12, 31)));
        Ok(())
    }

    #[test]
    fn test_out_of_index_records_are_dropped() -> Result<()> {
        let mut assembler = ResultAssembler::new(2020, 2020, vec!["A".into()])?;
        assembler.write(SampleRecord::new(day(2020, 3, 1), "A", 1.0));
        assembler.write(SampleRecord::new(day(2021, 1, 1), "A", 2.0));
        assembler.write(SampleRecord::new(day(2020, 3, 2), "ZZ", 3.0));

        assert_eq!(assembler.written(), 1);
        assert_eq!(assembler.dropped(), 2);
        let table = assembler.finish();
        assert_eq!(table.n_rows(), 366);
        assert_eq!(table.n_cols(), 1);
        assert_eq!(table.get(day(2020, 3, 1), "A"), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_unsampled_stations_stay_absent() -> Result<()> {
        let mut assembler = ResultAssembler::new(2020, 2020, vec!["A".into(), "B".into()])?;
        let values: StationValues = [("A".to_string(), 0.0)].into_iter().collect();
        assembler.write_samples(DatedSamples::new(day(2020, 5, 5), values));

        let table = assembler.finish();
        assert_eq!(table.get(day(2020, 5, 5), "A"), Some(0.0));
        assert_eq!(table.get(day(2020, 5, 5), "B"), None);
        Ok(())
    }
}
