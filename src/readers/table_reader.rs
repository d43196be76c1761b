use crate::error::{FetchError, Result};
use crate::models::ResultTable;
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::Path;

/// Reads a persisted dataset table (`date,<station ids…>`) back into a [`ResultTable`].
pub struct TableReader;

impl TableReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_table(&self, path: &Path) -> Result<ResultTable> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        self.read_from(reader)
    }

    pub fn read_table_from<R: Read>(&self, source: R) -> Result<ResultTable> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        self.read_from(reader)
    }

    fn read_from<R: Read>(&self, mut reader: csv::Reader<R>) -> Result<ResultTable> {
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(FetchError::InvalidFormat(
                "table has no header row".to_string(),
            ));
        }
        let stations: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut dates = Vec::new();
        let mut cells = Vec::new();
        for record in reader.records() {
            let record = record?;
            let date = parse_index_date(record.get(0).unwrap_or_default())?;
            dates.push(date);
            for i in 0..stations.len() {
                cells.push(parse_cell(record.get(i + 1).unwrap_or_default())?);
            }
        }

        ResultTable::from_rows(dates, stations, cells)
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepts `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS` index values.
pub fn parse_index_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Ok(date),
        Err(_) => Ok(NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")?.date()),
    }
}

fn parse_cell(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| FetchError::InvalidFormat(format!("Invalid cell value: '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reads_sparse_table() -> Result<()> {
        let data = "date,A,B\n2020-01-01,1.5,\n2020-01-02 00:00:00,,2\n";
        let table = TableReader::new().read_table_from(data.as_bytes())?;

        assert_eq!(table.dates(), &[day(2020, 1, 1), day(2020, 1, 2)]);
        assert_eq!(table.stations(), &["A".to_string(), "B".to_string()]);
        assert_eq!(table.get(day(2020, 1, 1), "A"), Some(1.5));
        assert_eq!(table.get(day(2020, 1, 1), "B"), None);
        assert_eq!(table.get(day(2020, 1, 2), "B"), Some(2.0));
        Ok(())
    }

    #[test]
    fn test_rejects_non_date_index() {
        let data = "date,A\nnot-a-date,1\n";
        let result = TableReader::new().read_table_from(data.as_bytes());
        assert!(matches!(result, Err(FetchError::DateParse(_))));
    }

    #[test]
    fn test_rejects_bad_cell() {
        let data = "date,A\n2020-01-01,wet\n";
        assert!(TableReader::new().read_table_from(data.as_bytes()).is_err());
    }
}
