use crate::models::DatasetDescriptor;
use crate::utils::constants::TABLE_EXTENSION;
use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Path of the persisted table for `dataset` inside `data_dir`.
pub fn table_path(data_dir: &Path, dataset: &DatasetDescriptor) -> PathBuf {
    data_dir.join(format!("{}.{}", dataset.output_key(), TABLE_EXTENSION))
}

/// Default Parquet export name: `{output_key}-{YYMMDD}.parquet` under `output/`.
pub fn generate_default_parquet_filename(dataset: &DatasetDescriptor) -> PathBuf {
    let now = Local::now();
    let filename = format!(
        "{}-{:02}{:02}{:02}.parquet",
        dataset.output_key(),
        now.year() % 100,
        now.month(),
        now.day()
    );
    PathBuf::from("output").join(filename)
}
