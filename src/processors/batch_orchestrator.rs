use crate::error::{FetchError, Result};
use crate::models::{days_in_month, DatasetDescriptor, DatedSamples, StationRegistry};
use crate::processors::point_sampler::PointSampler;
use crate::processors::result_assembler::ResultAssembler;
use crate::processors::strategy_selector::FetchStrategy;
use crate::processors::temporal_aggregator::TemporalAggregator;
use crate::service::{CollectionQuery, ImageryService, RetryPolicy, ServiceResult};
use crate::utils::constants::{
    CHUNKED_SETUP, CHUNKED_SPAN, DEFAULT_BATCH_SIZE, DEFAULT_SAMPLE_SCALE_M, MONTHLY_SETUP,
    MONTHLY_SPAN, PROGRESS_SETTLED, PROGRESS_STARTED, STANDARD_SETUP, STANDARD_SPAN,
};
use crate::utils::progress::DatasetProgress;
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Counts for one strategy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Days or months attempted.
    pub periods: usize,
    /// Periods that produced an image and were sampled.
    pub sampled: usize,
    /// Periods skipped because of a missing image or failed listing.
    pub skipped: usize,
}

/// Runs one fetch strategy for one dataset, writing into a [`ResultAssembler`].
///
/// Everything is sequential: each metadata and sampling call completes before the next
/// one starts.
pub struct BatchOrchestrator<'a, S: ImageryService> {
    service: &'a S,
    dataset: &'a DatasetDescriptor,
    registry: &'a StationRegistry,
    start_year: i32,
    end_year: i32,
    batch_size: usize,
    sample_scale_m: u32,
    retry: RetryPolicy,
}

impl<'a, S: ImageryService> BatchOrchestrator<'a, S> {
    pub fn new(
        service: &'a S,
        dataset: &'a DatasetDescriptor,
        registry: &'a StationRegistry,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        Self {
            service,
            dataset,
            registry,
            start_year,
            end_year,
            batch_size: DEFAULT_BATCH_SIZE,
            sample_scale_m: DEFAULT_SAMPLE_SCALE_M,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_sample_scale(mut self, scale_m: u32) -> Self {
        self.sample_scale_m = scale_m;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Dispatch to the strategy's fetch routine. `Skip` does nothing.
    pub fn run(
        &self,
        strategy: FetchStrategy,
        assembler: &mut ResultAssembler,
        progress: &mut DatasetProgress<'_>,
    ) -> Result<BatchStats> {
        match strategy {
            FetchStrategy::Skip => Ok(BatchStats::default()),
            FetchStrategy::StandardDaily => self.standard_daily(assembler, progress),
            FetchStrategy::ChunkedHighRes => self.chunked_high_res(assembler, progress),
            FetchStrategy::Monthly => self.monthly(assembler, progress),
        }
    }

    /// Whole run range as a half-open query, `[start-01-01, (end+1)-01-01)`.
    pub fn run_query(&self) -> Result<CollectionQuery> {
        let start = first_of_year(self.start_year)?;
        let end = first_of_year(self.end_year + 1)?;
        Ok(CollectionQuery::new(
            &self.dataset.collection_id,
            &self.dataset.variable_id,
            start,
            end,
        ))
    }

    /// One image per listed day, sampled in batches of `batch_size` days.
    pub fn standard_daily(
        &self,
        assembler: &mut ResultAssembler,
        progress: &mut DatasetProgress<'_>,
    ) -> Result<BatchStats> {
        progress.report(PROGRESS_STARTED);
        let query = self.run_query()?;
        let timestamps = self
            .retry
            .run("list timestamps", || self.service.list_timestamps(&query))
            .map_err(|e| FetchError::metadata(query.describe(), e))?;
        progress.report(STANDARD_SETUP);

        let dates: Vec<NaiveDate> = timestamps
            .iter()
            .map(|t| t.date_naive())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let batches: Vec<&[NaiveDate]> = dates.chunks(self.batch_size).collect();
        info!(
            "{}: {} dates in {} batches",
            self.dataset.name,
            dates.len(),
            batches.len()
        );

        let sampler = self.sampler();
        let factor = self.dataset.conversion_factor;
        let mut stats = BatchStats::default();

        for (i, batch) in batches.iter().enumerate() {
            progress.report_fraction(STANDARD_SETUP, STANDARD_SPAN, i, batches.len());
            debug!(
                "{}: batch {}/{} ({} dates)",
                self.dataset.name,
                i + 1,
                batches.len(),
                batch.len()
            );

            for &date in batch.iter() {
                stats.periods += 1;
                let day = query.narrowed(date, date.succ_opt().unwrap_or(date));
                let image = self
                    .period_metadata("first image", &day, || self.service.first_image(&day))?
                    .flatten();
                let Some(image) = image else {
                    stats.skipped += 1;
                    continue;
                };

                let mut samples = DatedSamples::new(date, sampler.sample(&image, self.registry)?);
                if factor != 1.0 {
                    samples = samples.scaled(factor);
                }
                assembler.write_samples(samples);
                stats.sampled += 1;
            }
        }

        progress.report(PROGRESS_SETTLED);
        Ok(stats)
    }

    /// Month-by-month listing, aggregating each month's images to daily values.
    pub fn chunked_high_res(
        &self,
        assembler: &mut ResultAssembler,
        progress: &mut DatasetProgress<'_>,
    ) -> Result<BatchStats> {
        progress.report(PROGRESS_STARTED);
        let query = self.run_query()?;
        let months = month_starts(query.start, query.end);
        let aggregator = TemporalAggregator::for_dataset(self.dataset);
        let sampler = self.sampler();
        let mut stats = BatchStats::default();

        info!(
            "{}: {} monthly chunks with {:?}",
            self.dataset.name,
            months.len(),
            aggregator.rule()
        );

        for (m, &month) in months.iter().enumerate() {
            progress.report_fraction(CHUNKED_SETUP, CHUNKED_SPAN, m + 1, months.len());
            stats.periods += 1;

            let chunk = query.narrowed(month, next_month(month));
            let Some(images) =
                self.period_metadata("list images", &chunk, || self.service.list_images(&chunk))?
            else {
                stats.skipped += 1;
                continue;
            };

            let daily = aggregator.aggregate(images);
            debug!(
                "{}: {} daily images for {}",
                self.dataset.name,
                daily.len(),
                month.format("%Y-%m")
            );
            for image in &daily {
                let values = sampler.sample(image, self.registry)?;
                assembler.write_samples(DatedSamples::new(image.date(), values));
            }
            stats.sampled += 1;
        }

        progress.report(PROGRESS_SETTLED);
        Ok(stats)
    }

    /// One image per month, converted to a monthly depth and stored on the month's first day.
    pub fn monthly(
        &self,
        assembler: &mut ResultAssembler,
        progress: &mut DatasetProgress<'_>,
    ) -> Result<BatchStats> {
        progress.report(PROGRESS_STARTED);
        let query = self.run_query()?;
        let timestamps = self
            .retry
            .run("list timestamps", || self.service.list_timestamps(&query))
            .map_err(|e| FetchError::metadata(query.describe(), e))?;
        progress.report(MONTHLY_SETUP);

        let months: Vec<NaiveDate> = timestamps
            .iter()
            .filter_map(|t| t.date_naive().with_day(1))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        info!("{}: {} months", self.dataset.name, months.len());

        let sampler = self.sampler();
        let factor = self.dataset.conversion_factor;
        let mut stats = BatchStats::default();

        for (i, &month) in months.iter().enumerate() {
            progress.report_fraction(MONTHLY_SETUP, MONTHLY_SPAN, i, months.len());
            stats.periods += 1;

            let period = query.narrowed(month, next_month(month));
            let image = self
                .period_metadata("first image", &period, || self.service.first_image(&period))?
                .flatten();
            let Some(image) = image else {
                stats.skipped += 1;
                continue;
            };

            let days = f64::from(days_in_month(month));
            let values = sampler.sample(&image, self.registry)?;
            assembler.write_samples(DatedSamples::new(month, values).scaled(factor * days));
            stats.sampled += 1;
        }

        progress.report(PROGRESS_SETTLED);
        Ok(stats)
    }

    fn sampler(&self) -> PointSampler<'a, S> {
        PointSampler::new(self.service, &self.dataset.variable_id, self.sample_scale_m)
    }

    /// Metadata call for one period. A failure is logged and becomes `None`, except an
    /// unavailable service, which aborts the run.
    fn period_metadata<T, F>(
        &self,
        operation: &str,
        period: &CollectionQuery,
        call: F,
    ) -> Result<Option<T>>
    where
        F: FnMut() -> ServiceResult<T>,
    {
        match self.retry.run(operation, call) {
            Ok(value) => Ok(Some(value)),
            Err(source) => {
                let e = FetchError::metadata(period.describe(), source);
                if e.is_service_unavailable() {
                    return Err(e);
                }
                warn!("{}: skipping period: {}", self.dataset.name, e);
                Ok(None)
            }
        }
    }
}

fn first_of_year(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| FetchError::Config(format!("invalid year {}", year)))
}

fn next_month(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(1)).unwrap_or(date)
}

/// First day of every month in `[start, end)`; `start` is expected to be a first-of-month.
fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut month = start;
    while month < end {
        months.push(month);
        let next = next_month(month);
        if next == month {
            break;
        }
        month = next;
    }
    months
}
