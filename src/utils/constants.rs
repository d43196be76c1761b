/// File names
pub const STATIONS_FILE: &str = "stations_metadata.csv";
pub const TABLE_EXTENSION: &str = "csv";
pub const DATE_COLUMN: &str = "date";

/// Run range accepted by the configuration
pub const MIN_YEAR: i32 = 1980;
pub const MAX_YEAR: i32 = 2024;

/// Processing defaults
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SAMPLE_SCALE_M: u32 = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_PROJECT_ID: &str = "gridded-fetcher";
pub const DEFAULT_DATA_DIR: &str = "Data";

/// Datasets routed to the month-by-month strategy regardless of their native cadence.
/// Their collections exceed remote memory limits when listed over multi-year ranges.
pub const RESOURCE_INTENSIVE_DATASETS: &[&str] = &["GSMAP", "GLDAS-Historical", "GLDAS-Current"];

/// Temporal weights
pub const HOURS_PER_DAY: f64 = 24.0;
pub const THREE_HOURLY_DAY_FRACTION: f64 = 3.0 / 24.0;

/// Progress checkpoints (percent)
pub const PROGRESS_STARTED: u8 = 5;
pub const PROGRESS_SETTLED: u8 = 95;
pub const PROGRESS_DONE: u8 = 100;
pub const STANDARD_SETUP: u8 = 15;
pub const STANDARD_SPAN: f64 = 80.0;
pub const CHUNKED_SETUP: u8 = 10;
pub const CHUNKED_SPAN: f64 = 85.0;
pub const MONTHLY_SETUP: u8 = 15;
pub const MONTHLY_SPAN: f64 = 80.0;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
