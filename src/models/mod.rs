pub mod dataset;
pub mod result_table;
pub mod sample;
pub mod station;

pub use dataset::{default_datasets, DatasetDescriptor, DatasetFamily, TimeScale, ValidYears};
pub use result_table::{daily_index, days_in_month, ResultTable};
pub use sample::{DatedSamples, SampleRecord, StationValues};
pub use station::{Station, StationRegistry};
