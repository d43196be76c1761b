use crate::service::ServiceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid coordinate format: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Imagery service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Metadata fetch failed for {period}: {source}")]
    MetadataFetch {
        period: String,
        #[source]
        source: ServiceError,
    },

    #[error("Sampling failed for {date}: {source}")]
    Sampling {
        date: String,
        #[source]
        source: ServiceError,
    },

    #[error("Table validation failed for {dataset}: {message}")]
    TableValidation { dataset: String, message: String },

    #[error("Station registry error: {0}")]
    StationRegistry(String),
}

impl FetchError {
    /// Wrap a failed listing call, keeping an unavailable service fatal.
    pub fn metadata(period: impl Into<String>, source: ServiceError) -> Self {
        match source {
            ServiceError::Unavailable(message) => FetchError::ServiceUnavailable(message),
            source => FetchError::MetadataFetch {
                period: period.into(),
                source,
            },
        }
    }

    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, FetchError::ServiceUnavailable(_))
    }
}

impl From<ServiceError> for FetchError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Unavailable(message) => FetchError::ServiceUnavailable(message),
            other => FetchError::MetadataFetch {
                period: "collection".to_string(),
                source: other,
            },
        }
    }
}
