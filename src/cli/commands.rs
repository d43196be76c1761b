use crate::cli::args::{Cli, Commands, RunOverrides};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::fetcher::GriddedFetcher;
use crate::processors::{select_strategy, DatasetSummary, TableValidator};
use crate::readers::TableReader;
use crate::service::SyntheticService;
use crate::utils::filename::{generate_default_parquet_filename, table_path};
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn, Level};

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Fetch {
            overrides,
            no_progress,
        } => {
            let config = load_config(config_path, &overrides)?;
            println!(
                "Fetching {} datasets for {}-{} into {}",
                config.enabled_datasets().count(),
                config.start_year,
                config.end_year,
                config.data_dir.display()
            );

            // dry run against the in-process backend
            let service = SyntheticService::for_datasets(&config.datasets);
            let reporter = ProgressReporter::new(no_progress);
            let mut fetcher = GriddedFetcher::new(config, service);
            fetcher.set_progress_callback(reporter.callback());

            let outcome = fetcher.process();
            reporter.finish_all();
            let outcome = outcome?;

            println!();
            for (name, state) in &outcome.report.outcomes {
                println!("{:<18} {}", name, state);
            }
            println!("\n{}", fetcher.summary_text(&outcome.report));

            for path in &outcome.save.saved {
                println!("Saved {}", path.display());
            }
            for (name, reason) in &outcome.save.failed {
                println!("Could not save {}: {}", name, reason);
            }
            fetcher.close();
        }

        Commands::Datasets { overrides } => {
            let config = load_config(config_path, &overrides)?;
            println!(
                "{:<18} {:<8} {:<12} {:<11} {:<24} {}",
                "NAME", "SCALE", "FACTOR", "YEARS", "STRATEGY", "ENABLED"
            );
            for dataset in &config.datasets {
                let years = match dataset.valid_years {
                    Some(range) => match range.end {
                        Some(end) => format!("{}-{}", range.start, end),
                        None => format!("{}-", range.start),
                    },
                    None => "any".to_string(),
                };
                let strategy = select_strategy(
                    dataset,
                    config.start_year,
                    config.end_year,
                    &config.resource_intensive,
                );
                println!(
                    "{:<18} {:<8} {:<12} {:<11} {:<24} {}",
                    dataset.name,
                    dataset.time_scale.as_str(),
                    dataset.conversion_factor,
                    years,
                    strategy.to_string(),
                    if dataset.enabled { "yes" } else { "no" }
                );
            }
        }

        Commands::Summary { overrides, json } => {
            let config = load_config(config_path, &overrides)?;
            let summaries = summarize_tables(&config);

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                println!("{}", TableValidator::new().generate_summary(&summaries));
            }
        }

        Commands::Export {
            dataset,
            data_dir,
            output_file,
            compression,
        } => {
            let mut config = FetchConfig::load(config_path)?;
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            let descriptor = config
                .find_dataset(&dataset)
                .ok_or_else(|| FetchError::Config(format!("unknown dataset {}", dataset)))?;

            let input = table_path(&config.data_dir, descriptor);
            let output = output_file.unwrap_or_else(|| generate_default_parquet_filename(descriptor));
            println!("Exporting {} to {}", input.display(), output.display());

            let table = TableReader::new().read_table(&input)?;
            let writer = ParquetWriter::new().with_compression(&compression)?;
            writer.write_table(&table, &output)?;

            let file_info = writer.get_file_info(&output)?;
            println!("\n{}", file_info.summary());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| FetchError::Config(format!("failed to initialize logging: {}", e)))
}

fn load_config(path: Option<&Path>, overrides: &RunOverrides) -> Result<FetchConfig> {
    let mut config = FetchConfig::load(path)?;
    if let Some(year) = overrides.start_year {
        config.start_year = year;
    }
    if let Some(year) = overrides.end_year {
        config.end_year = year;
    }
    if let Some(dir) = &overrides.data_dir {
        config.data_dir = dir.clone();
    }
    config.enable(&overrides.datasets)?;
    config.validate()?;
    Ok(config)
}

/// Summaries of persisted tables for the enabled datasets, or for every dataset with a
/// table on disk when none is enabled.
fn summarize_tables(config: &FetchConfig) -> BTreeMap<String, DatasetSummary> {
    let any_enabled = config.enabled_datasets().next().is_some();
    let validator = TableValidator::new();
    let reader = TableReader::new();
    let mut summaries = BTreeMap::new();

    for dataset in config.datasets.iter().filter(|d| d.enabled || !any_enabled) {
        let path: PathBuf = table_path(&config.data_dir, dataset);
        if !path.exists() {
            if any_enabled {
                warn!("No table for {} at {}", dataset.name, path.display());
            }
            continue;
        }
        match reader.read_table(&path) {
            Ok(table) => {
                info!("Loaded {} from {}", dataset.name, path.display());
                summaries.insert(
                    dataset.name.clone(),
                    validator.summarize(&dataset.name, &table),
                );
            }
            Err(e) => warn!("Could not read {}: {}", path.display(), e),
        }
    }

    summaries
}
