use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::models::{DatasetDescriptor, ResultTable, StationRegistry};
use crate::processors::{
    select_strategy, BatchOrchestrator, DatasetSummary, FetchStrategy, ResultAssembler,
    TableValidator,
};
use crate::readers::{StationReader, TableReader};
use crate::service::{ImageryService, ServiceSession};
use crate::utils::constants::PROGRESS_DONE;
use crate::utils::filename::table_path;
use crate::utils::progress::{ProgressCallback, ProgressTracker};
use crate::writers::TableWriter;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Final state of one enabled dataset after a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetState {
    /// Loaded from an existing table; no remote calls were made.
    CacheHit,
    /// Valid years do not overlap the run.
    Skipped,
    Succeeded,
    Failed(String),
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetState::CacheHit => write!(f, "cached"),
            DatasetState::Skipped => write!(f, "skipped"),
            DatasetState::Succeeded => write!(f, "fetched"),
            DatasetState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Tables produced by a fetch, plus the state of every enabled dataset.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub tables: BTreeMap<String, ResultTable>,
    pub outcomes: BTreeMap<String, DatasetState>,
}

impl FetchReport {
    pub fn state(&self, dataset: &str) -> Option<&DatasetState> {
        self.outcomes.get(dataset)
    }

    pub fn failed(&self) -> impl Iterator<Item = (&String, &str)> + '_ {
        self.outcomes.iter().filter_map(|(name, state)| match state {
            DatasetState::Failed(reason) => Some((name, reason.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub saved: Vec<PathBuf>,
    /// `(dataset, reason)` for every table that could not be written.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: FetchReport,
    pub save: SaveOutcome,
}

/// Drives every enabled dataset through cache lookup, strategy dispatch and validation.
///
/// Datasets run one after another. A failing dataset is logged and recorded; only an
/// unavailable imagery service stops the run.
pub struct GriddedFetcher<S: ImageryService> {
    config: FetchConfig,
    session: ServiceSession<S>,
    progress: ProgressTracker,
    validator: TableValidator,
    stations: Option<StationRegistry>,
}

impl<S: ImageryService> GriddedFetcher<S> {
    pub fn new(config: FetchConfig, service: S) -> Self {
        let session = ServiceSession::new(service, &config.project_id);
        Self {
            config,
            session,
            progress: ProgressTracker::default(),
            validator: TableValidator::new(),
            stations: None,
        }
    }

    /// Use `registry` instead of reading the station metadata file.
    pub fn with_stations(mut self, registry: StationRegistry) -> Self {
        self.stations = Some(registry);
        self
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress.set_callback(callback);
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn session(&self) -> &ServiceSession<S> {
        &self.session
    }

    /// Fetch every enabled dataset.
    ///
    /// Returns `Err` only when the imagery service is unavailable; any other failure is
    /// confined to its dataset and reported in [`FetchReport::outcomes`].
    pub fn fetch_data(&mut self) -> Result<FetchReport> {
        match self.fetch_all() {
            (_, Some(abort)) => Err(abort),
            (report, None) => Ok(report),
        }
    }

    /// Run every enabled dataset, stopping at an unavailable service. The report holds
    /// whatever completed before the abort.
    fn fetch_all(&mut self) -> (FetchReport, Option<FetchError>) {
        let datasets: Vec<DatasetDescriptor> = self.config.enabled_datasets().cloned().collect();
        let mut report = FetchReport::default();
        info!(
            "Fetching {} datasets for {}-{}",
            datasets.len(),
            self.config.start_year,
            self.config.end_year
        );

        for dataset in &datasets {
            let name = dataset.name.as_str();
            self.progress.reset(name);

            if let Some(table) = self.load_cached(dataset) {
                self.progress.report(name, PROGRESS_DONE);
                report.tables.insert(name.to_string(), table);
                report.outcomes.insert(name.to_string(), DatasetState::CacheHit);
                continue;
            }

            let strategy = select_strategy(
                dataset,
                self.config.start_year,
                self.config.end_year,
                &self.config.resource_intensive,
            );
            if strategy == FetchStrategy::Skip {
                warn!(
                    "Skipping {}: no data for {}-{}",
                    name, self.config.start_year, self.config.end_year
                );
                self.progress.report(name, PROGRESS_DONE);
                report.outcomes.insert(name.to_string(), DatasetState::Skipped);
                continue;
            }

            match self.fetch_dataset(dataset, strategy) {
                Ok(table) => {
                    self.progress.report(name, PROGRESS_DONE);
                    report.tables.insert(name.to_string(), table);
                    report.outcomes.insert(name.to_string(), DatasetState::Succeeded);
                }
                Err(e) if e.is_service_unavailable() => {
                    error!("Aborting fetch at {}: {}", name, e);
                    self.progress.reset(name);
                    return (report, Some(e));
                }
                Err(e) => {
                    error!("Failed to fetch {}: {}", name, e);
                    self.progress.reset(name);
                    report
                        .outcomes
                        .insert(name.to_string(), DatasetState::Failed(e.to_string()));
                }
            }
        }

        (report, None)
    }

    fn fetch_dataset(
        &mut self,
        dataset: &DatasetDescriptor,
        strategy: FetchStrategy,
    ) -> Result<ResultTable> {
        if self.stations.is_none() {
            let path = self.config.stations_path();
            self.stations = Some(StationReader::new().read_stations(&path)?);
        }
        let Some(registry) = self.stations.as_ref() else {
            return Err(FetchError::StationRegistry("no stations loaded".to_string()));
        };
        if registry.is_empty() {
            return Err(FetchError::StationRegistry(
                "station registry is empty".to_string(),
            ));
        }

        let service = self.session.ensure_ready()?;
        info!("Fetching {} with {} strategy", dataset.name, strategy);

        let mut assembler =
            ResultAssembler::new(self.config.start_year, self.config.end_year, registry.ids())?;
        let mut progress = self.progress.scoped(&dataset.name);
        let stats = BatchOrchestrator::new(
            service,
            dataset,
            registry,
            self.config.start_year,
            self.config.end_year,
        )
        .with_batch_size(self.config.batch_size)
        .with_sample_scale(self.config.sample_scale_m)
        .with_retry(self.config.retry)
        .run(strategy, &mut assembler, &mut progress)?;

        let table = assembler.finish();
        self.validator.validate(&dataset.name, &table)?;
        info!(
            "{}: {} of {} periods sampled, {} skipped, {:.1}% missing",
            dataset.name,
            stats.sampled,
            stats.periods,
            stats.skipped,
            table.missing_percentage()
        );
        Ok(table)
    }

    /// Load an existing table for `dataset`. An unreadable file is re-fetched.
    fn load_cached(&self, dataset: &DatasetDescriptor) -> Option<ResultTable> {
        let path = table_path(&self.config.data_dir, dataset);
        if !path.exists() {
            return None;
        }
        match TableReader::new().read_table(&path) {
            Ok(table) => {
                info!("Loaded cached {} from {}", dataset.name, path.display());
                Some(table)
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable table {} for {}: {}",
                    path.display(),
                    dataset.name,
                    e
                );
                None
            }
        }
    }

    pub fn validate(&self, dataset: &str, table: &ResultTable) -> Result<()> {
        self.validator.validate(dataset, table)
    }

    /// Persist the tables fetched in this run. Cached tables are left untouched.
    pub fn save_data(&self, report: &FetchReport) -> SaveOutcome {
        let writer = TableWriter::new();
        let mut outcome = SaveOutcome::default();

        for (name, table) in &report.tables {
            if report.state(name) != Some(&DatasetState::Succeeded) {
                continue;
            }
            let Some(dataset) = self.config.datasets.iter().find(|d| d.name == *name) else {
                let e = FetchError::Config(format!("no dataset descriptor for table {}", name));
                error!("{}", e);
                outcome.failed.push((name.clone(), e.to_string()));
                continue;
            };

            let path = table_path(&self.config.data_dir, dataset);
            match writer.write_table(table, &path) {
                Ok(()) => outcome.saved.push(path),
                Err(e) => {
                    error!("Failed to save {} to {}: {}", name, path.display(), e);
                    outcome.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        outcome
    }

    pub fn summary(&self, report: &FetchReport) -> BTreeMap<String, DatasetSummary> {
        report
            .tables
            .iter()
            .map(|(name, table)| (name.clone(), self.validator.summarize(name, table)))
            .collect()
    }

    pub fn summary_text(&self, report: &FetchReport) -> String {
        self.validator.generate_summary(&self.summary(report))
    }

    /// Fetch, persist and summarize. Fails when no dataset is enabled.
    ///
    /// If the service becomes unavailable mid-run, the datasets fetched before it are
    /// still saved and the error is returned.
    pub fn process(&mut self) -> Result<RunOutcome> {
        if self.config.enabled_datasets().next().is_none() {
            return Err(FetchError::Config("no datasets enabled".to_string()));
        }

        let (report, abort) = self.fetch_all();
        let save = self.save_data(&report);
        if let Some(e) = abort {
            error!(
                "Run aborted after saving {} of {} tables: {}",
                save.saved.len(),
                report.tables.len(),
                e
            );
            return Err(e);
        }
        for (name, reason) in report.failed() {
            warn!("{} produced no table: {}", name, reason);
        }
        info!(
            "Run finished: {} tables, {} saved, {} save failures",
            report.tables.len(),
            save.saved.len(),
            save.failed.len()
        );
        Ok(RunOutcome { report, save })
    }

    pub fn close(&mut self) {
        self.session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Station, TimeScale};
    use crate::service::synthetic::Cadence;
    use crate::service::{SessionState, SyntheticService};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn config(dir: &TempDir, datasets: Vec<DatasetDescriptor>) -> FetchConfig {
        FetchConfig {
            start_year: 2020,
            end_year: 2020,
            data_dir: dir.path().to_path_buf(),
            datasets,
            ..FetchConfig::default()
        }
    }

    fn stations() -> StationRegistry {
        StationRegistry::new(vec![Station::new("A", 1.0, 1.0), Station::new("B", 2.0, 2.0)])
    }

    #[test]
    fn test_failed_dataset_does_not_stop_others() -> Result<()> {
        let dir = TempDir::new()?;
        let good = DatasetDescriptor::new("GOOD", "good", "v", TimeScale::Daily).enabled(true);
        let bad = DatasetDescriptor::new("BAD", "bad", "v", TimeScale::Daily).enabled(true);
        // "bad" is not registered, so listing fails with CollectionNotFound
        let service = SyntheticService::new().with_constant("good", Cadence::EveryHours(24), 1.0);

        let mut fetcher =
            GriddedFetcher::new(config(&dir, vec![good, bad]), &service).with_stations(stations());
        let report = fetcher.fetch_data()?;

        assert_eq!(report.state("GOOD"), Some(&DatasetState::Succeeded));
        assert!(matches!(report.state("BAD"), Some(DatasetState::Failed(_))));
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.failed().count(), 1);
        Ok(())
    }

    #[test]
    fn test_save_only_fetched_tables() -> Result<()> {
        let dir = TempDir::new()?;
        let dataset = DatasetDescriptor::new("GOOD", "good", "v", TimeScale::Daily).enabled(true);
        let service = SyntheticService::new().with_constant("good", Cadence::EveryHours(24), 1.0);
        let mut fetcher =
            GriddedFetcher::new(config(&dir, vec![dataset]), &service).with_stations(stations());

        let first = fetcher.process()?;
        assert_eq!(first.save.saved, vec![dir.path().join("good_precipitation.csv")]);

        let second = fetcher.fetch_data()?;
        assert_eq!(second.state("GOOD"), Some(&DatasetState::CacheHit));
        assert!(fetcher.save_data(&second).saved.is_empty());

        let day = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        assert_eq!(second.tables["GOOD"].get(day, "B"), Some(1.0));
        Ok(())
    }

    #[test]
    fn test_missing_station_file_fails_datasets() -> Result<()> {
        let dir = TempDir::new()?;
        let dataset = DatasetDescriptor::new("GOOD", "good", "v", TimeScale::Daily).enabled(true);
        let service = SyntheticService::new().with_constant("good", Cadence::EveryHours(24), 1.0);
        let mut fetcher = GriddedFetcher::new(config(&dir, vec![dataset]), &service);

        let report = fetcher.fetch_data()?;
        assert!(matches!(report.state("GOOD"), Some(DatasetState::Failed(_))));
        assert_eq!(service.remote_calls(), 0);
        Ok(())
    }

    #[test]
    fn test_process_requires_enabled_dataset() {
        let dir = TempDir::new().unwrap();
        let service = SyntheticService::new();
        let mut fetcher = GriddedFetcher::new(config(&dir, Vec::new()), &service);
        assert!(matches!(fetcher.process(), Err(FetchError::Config(_))));
    }

    #[test]
    fn test_abort_keeps_tables_fetched_before_it() -> Result<()> {
        let dir = TempDir::new()?;
        let good = DatasetDescriptor::new("GOOD", "good", "v", TimeScale::Daily).enabled(true);
        let expired = DatasetDescriptor::new("LATE", "late", "v", TimeScale::Daily).enabled(true);
        let service = SyntheticService::new()
            .with_constant("good", Cadence::EveryHours(24), 1.0)
            .with_constant("late", Cadence::EveryHours(24), 1.0)
            .expire_session_for("late");
        let mut fetcher = GriddedFetcher::new(config(&dir, vec![good, expired]), &service)
            .with_stations(stations());

        let result = fetcher.process();
        assert!(matches!(result, Err(FetchError::ServiceUnavailable(_))));
        assert!(dir.path().join("good_precipitation.csv").exists());
        assert!(!dir.path().join("late_precipitation.csv").exists());
        Ok(())
    }

    #[test]
    fn test_close_shuts_down_once() -> Result<()> {
        let dir = TempDir::new()?;
        let dataset = DatasetDescriptor::new("GOOD", "good", "v", TimeScale::Daily).enabled(true);
        let service = SyntheticService::new().with_constant("good", Cadence::EveryHours(24), 1.0);
        {
            let mut fetcher =
                GriddedFetcher::new(config(&dir, vec![dataset]), &service).with_stations(stations());
            fetcher.fetch_data()?;
            assert_eq!(fetcher.session().state(), &SessionState::Ready);
            fetcher.close();
            assert_eq!(fetcher.session().state(), &SessionState::Closed);
        }
        assert_eq!(service.init_calls(), 1);
        assert_eq!(service.shutdown_calls(), 1);
        Ok(())
    }
}
