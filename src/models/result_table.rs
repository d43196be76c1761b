use crate::error::{FetchError, Result};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// Dense date x station matrix of sampled values.
///
/// Rows and columns are fixed at construction. Writes only ever fill cells; a cell that
/// was never written stays `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    dates: Vec<NaiveDate>,
    stations: Vec<String>,
    cells: Vec<Option<f64>>,
    date_index: HashMap<NaiveDate, usize>,
    station_index: HashMap<String, usize>,
}

impl ResultTable {
    /// Empty table over every calendar day of `[start_year-01-01, end_year-12-31]`.
    pub fn for_years(start_year: i32, end_year: i32, stations: Vec<String>) -> Result<Self> {
        let dates = daily_index(start_year, end_year)?;
        Ok(Self::new(dates, stations))
    }

    pub fn new(dates: Vec<NaiveDate>, stations: Vec<String>) -> Self {
        let cells = vec![None; dates.len() * stations.len()];
        Self::assemble(dates, stations, cells)
    }

    /// Rebuild a table from row-major cells, e.g. when loading a persisted file.
    pub fn from_rows(
        dates: Vec<NaiveDate>,
        stations: Vec<String>,
        cells: Vec<Option<f64>>,
    ) -> Result<Self> {
        if cells.len() != dates.len() * stations.len() {
            return Err(FetchError::InvalidFormat(format!(
                "expected {} cells for {} rows x {} columns, got {}",
                dates.len() * stations.len(),
                dates.len(),
                stations.len(),
                cells.len()
            )));
        }
        Ok(Self::assemble(dates, stations, cells))
    }

    fn assemble(dates: Vec<NaiveDate>, stations: Vec<String>, cells: Vec<Option<f64>>) -> Self {
        let date_index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let station_index = stations
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Self {
            dates,
            stations,
            cells,
            date_index,
            station_index,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_cols(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.stations.is_empty()
    }

    pub fn get(&self, date: NaiveDate, station_id: &str) -> Option<f64> {
        let row = *self.date_index.get(&date)?;
        let col = *self.station_index.get(station_id)?;
        self.cells[row * self.stations.len() + col]
    }

    /// Fill one cell. Returns `false` when the date or station is not part of the index.
    pub fn set(&mut self, date: NaiveDate, station_id: &str, value: f64) -> bool {
        match (self.date_index.get(&date), self.station_index.get(station_id)) {
            (Some(&row), Some(&col)) => {
                let width = self.stations.len();
                self.cells[row * width + col] = Some(value);
                true
            }
            _ => false,
        }
    }

    pub fn row(&self, index: usize) -> &[Option<f64>] {
        let width = self.stations.len();
        &self.cells[index * width..(index + 1) * width]
    }

    /// Column of values for one station, in date order.
    pub fn column(&self, station_id: &str) -> Option<Vec<Option<f64>>> {
        let col = *self.station_index.get(station_id)?;
        let width = self.stations.len();
        Some(
            (0..self.dates.len())
                .map(|row| self.cells[row * width + col])
                .collect(),
        )
    }

    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, &[Option<f64>])> + '_ {
        self.dates
            .iter()
            .enumerate()
            .map(move |(i, date)| (*date, self.row(i)))
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn absent_count(&self) -> usize {
        self.cells.len() - self.filled_count()
    }

    /// `absent / (rows x columns) x 100`; an empty table counts as fully missing.
    pub fn missing_percentage(&self) -> f64 {
        if self.cells.is_empty() {
            return 100.0;
        }
        self.absent_count() as f64 / self.cells.len() as f64 * 100.0
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.dates.iter().min().copied()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.dates.iter().max().copied()
    }

    /// True when dates are strictly increasing, i.e. a proper date index.
    pub fn has_ordered_index(&self) -> bool {
        self.dates.windows(2).all(|w| w[0] < w[1])
    }
}

/// Every calendar day in `[start_year-01-01, end_year-12-31]`.
pub fn daily_index(start_year: i32, end_year: i32) -> Result<Vec<NaiveDate>> {
    let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
        .ok_or_else(|| FetchError::Config(format!("invalid start year {}", start_year)))?;
    let end = NaiveDate::from_ymd_opt(end_year, 12, 31)
        .ok_or_else(|| FetchError::Config(format!("invalid end year {}", end_year)))?;
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
    let next = first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(first);
    (next - first).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dense_index_covers_leap_years() {
        let table =
            ResultTable::for_years(2020, 2021, vec!["A".to_string(), "B".to_string()]).unwrap();
        assert_eq!(table.n_rows(), 366 + 365);
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.start_date(), Some(day(2020, 1, 1)));
        assert_eq!(table.end_date(), Some(day(2021, 12, 31)));
        assert_eq!(table.absent_count(), 731 * 2);
        assert!(table.has_ordered_index());
    }

    #[test]
    fn test_set_only_fills_known_cells() {
        let mut table = ResultTable::for_years(2020, 2020, vec!["A".to_string()]).unwrap();
        assert!(table.set(day(2020, 2, 29), "A", 1.5));
        assert!(!table.set(day(2021, 1, 1), "A", 1.0));
        assert!(!table.set(day(2020, 1, 1), "Z", 1.0));

        assert_eq!(table.get(day(2020, 2, 29), "A"), Some(1.5));
        assert_eq!(table.get(day(2020, 3, 1), "A"), None);
        assert_eq!(table.n_rows(), 366);
        assert_eq!(table.filled_count(), 1);
    }

    #[test]
    fn test_missing_percentage() {
        let mut table = ResultTable::new(
            vec![day(2020, 1, 1), day(2020, 1, 2)],
            vec!["A".to_string(), "B".to_string()],
        );
        table.set(day(2020, 1, 1), "A", 0.0);
        assert!((table.missing_percentage() - 75.0).abs() < 1e-9);
        assert_eq!(table.column("A").unwrap(), vec![Some(0.0), None]);
    }

    #[test]
    fn test_from_rows_checks_shape() {
        let result = ResultTable::from_rows(vec![day(2020, 1, 1)], vec!["A".to_string()], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(day(2021, 4, 1)), 30);
        assert_eq!(days_in_month(day(2020, 2, 1)), 29);
        assert_eq!(days_in_month(day(2021, 12, 15)), 31);
    }
}
