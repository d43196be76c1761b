use crate::error::{FetchError, Result};
use crate::models::ResultTable;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub const GRIDDED_DATA_TYPE: &str = "Gridded";

/// Per-dataset figures reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub dataset: String,
    pub n_stations: usize,
    pub n_rows: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub data_type: String,
    pub missing_percentage: f64,
}

pub struct TableValidator;

impl TableValidator {
    pub fn new() -> Self {
        Self
    }

    /// A usable table has at least one row and column and a strictly increasing date index.
    pub fn validate(&self, dataset: &str, table: &ResultTable) -> Result<()> {
        if table.is_empty() {
            return Err(FetchError::TableValidation {
                dataset: dataset.to_string(),
                message: format!(
                    "table is empty ({} rows x {} stations)",
                    table.n_rows(),
                    table.n_cols()
                ),
            });
        }
        if !table.has_ordered_index() {
            return Err(FetchError::TableValidation {
                dataset: dataset.to_string(),
                message: "date index is not strictly increasing".to_string(),
            });
        }
        Ok(())
    }

    pub fn summarize(&self, dataset: &str, table: &ResultTable) -> DatasetSummary {
        DatasetSummary {
            dataset: dataset.to_string(),
            n_stations: table.n_cols(),
            n_rows: table.n_rows(),
            start_date: table.start_date(),
            end_date: table.end_date(),
            data_type: GRIDDED_DATA_TYPE.to_string(),
            missing_percentage: table.missing_percentage(),
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, summaries: &BTreeMap<String, DatasetSummary>) -> String {
        let mut summary = String::new();

        summary.push_str("=== Dataset Summary ===\n");
        summary.push_str(&format!("Datasets: {}\n", summaries.len()));

        for item in summaries.values() {
            let range = match (item.start_date, item.end_date) {
                (Some(start), Some(end)) => format!("{} to {}", start, end),
                _ => "n/a".to_string(),
            };
            summary.push_str(&format!("\n{}\n", item.dataset));
            summary.push_str(&format!("  Stations: {}\n", item.n_stations));
            summary.push_str(&format!("  Rows: {}\n", item.n_rows));
            summary.push_str(&format!("  Date Range: {}\n", range));
            summary.push_str(&format!("  Data Type: {}\n", item.data_type));
            summary.push_str(&format!(
                "  Missing Values: {:.1}%\n",
                item.missing_percentage
            ));
        }

        summary
    }
}

impl Default for TableValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_table_fails() {
        let table = ResultTable::new(vec![day(2020, 1, 1)], Vec::new());
        let result = TableValidator::new().validate("X", &table);
        assert!(matches!(result, Err(FetchError::TableValidation { .. })));
    }

    #[test]
    fn test_unordered_index_fails() {
        let table = ResultTable::new(vec![day(2020, 1, 2), day(2020, 1, 1)], vec!["A".into()]);
        assert!(TableValidator::new().validate("X", &table).is_err());
    }

    #[test]
    fn test_all_absent_table_is_still_valid() {
        let table = ResultTable::for_years(2020, 2020, vec!["A".into()]).unwrap();
        assert!(TableValidator::new().validate("X", &table).is_ok());
    }

    #[test]
    fn test_summary_missing_percentage() {
        let mut table = ResultTable::new(
            vec![day(2020, 1, 1), day(2020, 1, 2)],
            vec!["A".into(), "B".into()],
        );
        table.set(day(2020, 1, 1), "A", 1.0);

        let validator = TableValidator::new();
        let summary = validator.summarize("ERA5", &table);
        assert_eq!(summary.n_stations, 2);
        assert_eq!(summary.n_rows, 2);
        assert_eq!(summary.start_date, Some(day(2020, 1, 1)));
        assert_eq!(summary.missing_percentage, 75.0);

        let report = validator.generate_summary(&BTreeMap::from([("ERA5".to_string(), summary)]));
        assert!(report.contains("Missing Values: 75.0%"));
        assert!(report.contains("Date Range: 2020-01-01 to 2020-01-02"));
    }
}
