use chrono::NaiveDate;
use std::collections::HashMap;

/// Values sampled from one image, keyed by station id. Stations without a value are absent.
pub type StationValues = HashMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub date: NaiveDate,
    pub station_id: String,
    pub value: f64,
}

impl SampleRecord {
    pub fn new(date: NaiveDate, station_id: &str, value: f64) -> Self {
        Self {
            date,
            station_id: station_id.to_string(),
            value,
        }
    }
}

/// All values sampled for one date.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSamples {
    pub date: NaiveDate,
    pub values: StationValues,
}

impl DatedSamples {
    pub fn new(date: NaiveDate, values: StationValues) -> Self {
        Self { date, values }
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for value in self.values.values_mut() {
            *value *= factor;
        }
        self
    }

    pub fn into_records(self) -> impl Iterator<Item = SampleRecord> {
        let date = self.date;
        self.values.into_iter().map(move |(station_id, value)| SampleRecord {
            date,
            station_id,
            value,
        })
    }
}
