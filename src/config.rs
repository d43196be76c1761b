use crate::error::{FetchError, Result};
use crate::models::{default_datasets, DatasetDescriptor};
use crate::service::RetryPolicy;
use crate::utils::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_DATA_DIR, DEFAULT_PROJECT_ID, DEFAULT_SAMPLE_SCALE_M, MAX_YEAR,
    MIN_YEAR, RESOURCE_INTENSIVE_DATASETS, STATIONS_FILE,
};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "GRIDDED";

/// Run configuration.
///
/// Fields missing from every source fall back to [`FetchConfig::default`], which carries
/// the built-in dataset registry with every dataset disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub data_dir: PathBuf,
    pub project_id: String,
    pub stations_file: String,
    pub batch_size: usize,
    pub sample_scale_m: u32,
    /// Datasets fetched month by month whatever their cadence.
    pub resource_intensive: Vec<String>,
    pub retry: RetryPolicy,
    pub datasets: Vec<DatasetDescriptor>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            start_year: MIN_YEAR,
            end_year: MAX_YEAR,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            project_id: DEFAULT_PROJECT_ID.to_string(),
            stations_file: STATIONS_FILE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            sample_scale_m: DEFAULT_SAMPLE_SCALE_M,
            resource_intensive: RESOURCE_INTENSIVE_DATASETS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            retry: RetryPolicy::default(),
            datasets: default_datasets(),
        }
    }
}

impl FetchConfig {
    /// Layer defaults, an optional TOML file and `GRIDDED_*` environment variables.
    ///
    /// Nested keys use a double underscore, e.g. `GRIDDED_RETRY__MAX_ATTEMPTS`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("resource_intensive"),
        );

        let mut config: FetchConfig = builder.build()?.try_deserialize()?;
        if config.datasets.is_empty() {
            config.datasets = default_datasets();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_year < MIN_YEAR || self.end_year > MAX_YEAR {
            return Err(FetchError::Config(format!(
                "years must lie within {}..={}, got {}..={}",
                MIN_YEAR, MAX_YEAR, self.start_year, self.end_year
            )));
        }
        if self.start_year > self.end_year {
            return Err(FetchError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if self.batch_size == 0 {
            return Err(FetchError::Config("batch_size must be positive".to_string()));
        }
        if self.sample_scale_m == 0 {
            return Err(FetchError::Config(
                "sample_scale_m must be positive".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(FetchError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for dataset in &self.datasets {
            dataset.validate_descriptor()?;
            if !names.insert(dataset.name.as_str()) {
                return Err(FetchError::Config(format!(
                    "duplicate dataset name {}",
                    dataset.name
                )));
            }
        }
        Ok(())
    }

    pub fn stations_path(&self) -> PathBuf {
        self.data_dir.join(&self.stations_file)
    }

    pub fn enabled_datasets(&self) -> impl Iterator<Item = &DatasetDescriptor> + '_ {
        self.datasets.iter().filter(|d| d.enabled)
    }

    pub fn find_dataset(&self, name: &str) -> Option<&DatasetDescriptor> {
        self.datasets
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Enable datasets by name (case-insensitive). Unknown names are a config error.
    pub fn enable<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            let dataset = self
                .datasets
                .iter_mut()
                .find(|d| d.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| FetchError::Config(format!("unknown dataset {}", name)))?;
            dataset.enabled = true;
        }
        Ok(())
    }
}
