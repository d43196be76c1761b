pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod processors;
pub mod readers;
pub mod service;
pub mod utils;
pub mod writers;

pub use config::FetchConfig;
pub use error::{FetchError, Result};
pub use fetcher::{DatasetState, FetchReport, GriddedFetcher, RunOutcome, SaveOutcome};
