use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gridded-fetcher")]
#[command(about = "Station point sampling of gridded precipitation datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
}

/// Overrides applied on top of the loaded configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    #[arg(long, help = "First year of the run (inclusive)")]
    pub start_year: Option<i32>,

    #[arg(long, help = "Last year of the run (inclusive)")]
    pub end_year: Option<i32>,

    #[arg(long, help = "Directory holding station metadata and dataset tables")]
    pub data_dir: Option<PathBuf>,

    #[arg(
        short,
        long = "dataset",
        value_name = "NAME",
        help = "Enable a dataset by name (repeatable)"
    )]
    pub datasets: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch enabled datasets and write one table per dataset
    Fetch {
        #[command(flatten)]
        overrides: RunOverrides,

        #[arg(long, help = "Hide progress bars")]
        no_progress: bool,
    },

    /// List the dataset registry and the strategy each dataset would use
    Datasets {
        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Summarize persisted dataset tables
    Summary {
        #[command(flatten)]
        overrides: RunOverrides,

        #[arg(long, help = "Print the summary as JSON")]
        json: bool,
    },

    /// Convert a persisted dataset table to Parquet
    Export {
        #[arg(help = "Dataset name")]
        dataset: String,

        #[arg(long, help = "Directory holding dataset tables")]
        data_dir: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output Parquet file path [default: output/{output_key}-{YYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(long, default_value = "snappy")]
        compression: String,
    },
}
