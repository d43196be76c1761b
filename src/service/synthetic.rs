use crate::models::{DatasetDescriptor, TimeScale};
use crate::service::{
    CollectionQuery, Image, ImageExpr, ImageryService, Point, SampledPoint, ServiceError,
    ServiceResult,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub type ValueFn = Arc<dyn Fn(Point, DateTime<Utc>) -> Option<f64> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Monthly,
    EveryHours(u32),
}

impl From<TimeScale> for Cadence {
    fn from(time_scale: TimeScale) -> Self {
        match time_scale {
            TimeScale::Monthly => Cadence::Monthly,
            TimeScale::Daily => Cadence::EveryHours(24),
            TimeScale::Hourly => Cadence::EveryHours(1),
            TimeScale::ThreeHourly => Cadence::EveryHours(3),
        }
    }
}

#[derive(Clone)]
struct SyntheticCollection {
    cadence: Cadence,
    value: ValueFn,
}

/// Deterministic in-process imagery backend.
///
/// Used by the test suite and by the CLI for dry runs. Every collection yields images on a
/// fixed cadence whose pixel values come from a caller-supplied function of location and
/// time. Failures, gaps and an unavailable session can be injected per date.
pub struct SyntheticService {
    collections: HashMap<String, SyntheticCollection>,
    unavailable: Option<String>,
    failing_listings: HashSet<NaiveDate>,
    failing_samples: HashSet<NaiveDate>,
    missing_images: HashSet<NaiveDate>,
    expired_collections: HashSet<String>,
    initialized: AtomicBool,
    init_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    remote_calls: AtomicUsize,
    sample_calls: AtomicUsize,
}

impl SyntheticService {
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
            unavailable: None,
            failing_listings: HashSet::new(),
            failing_samples: HashSet::new(),
            missing_images: HashSet::new(),
            expired_collections: HashSet::new(),
            initialized: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            remote_calls: AtomicUsize::new(0),
            sample_calls: AtomicUsize::new(0),
        }
    }

    /// Register one collection per descriptor with a smooth seasonal signal.
    pub fn for_datasets(datasets: &[DatasetDescriptor]) -> Self {
        datasets.iter().fold(Self::new(), |service, dataset| {
            service.with_collection(
                &dataset.collection_id,
                dataset.time_scale.into(),
                seasonal_signal(dataset.time_scale),
            )
        })
    }

    pub fn with_collection(mut self, collection_id: &str, cadence: Cadence, value: ValueFn) -> Self {
        self.collections
            .insert(collection_id.to_string(), SyntheticCollection { cadence, value });
        self
    }

    pub fn with_constant(self, collection_id: &str, cadence: Cadence, value: f64) -> Self {
        self.with_collection(collection_id, cadence, Arc::new(move |_, _| Some(value)))
    }

    /// Make the handshake fail with `message`.
    pub fn unavailable(mut self, message: &str) -> Self {
        self.unavailable = Some(message.to_string());
        self
    }

    /// Listing calls whose range covers `date` fail.
    pub fn fail_listing_on(mut self, date: NaiveDate) -> Self {
        self.failing_listings.insert(date);
        self
    }

    /// Sampling an image dated `date` fails.
    pub fn fail_sampling_on(mut self, date: NaiveDate) -> Self {
        self.failing_samples.insert(date);
        self
    }

    /// Timestamps for `date` are still listed but no image can be fetched.
    pub fn missing_image_on(mut self, date: NaiveDate) -> Self {
        self.missing_images.insert(date);
        self
    }

    /// Sampling any image built from `collection_id` reports the session as expired.
    /// Listing still succeeds.
    pub fn expire_session_for(mut self, collection_id: &str) -> Self {
        self.expired_collections.insert(collection_id.to_string());
        self
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    /// Listing, fetching and sampling calls made so far.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    pub fn sample_calls(&self) -> usize {
        self.sample_calls.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> ServiceResult<()> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(
                "service has not been initialized".to_string(),
            ));
        }
        Ok(())
    }

    fn collection(&self, query: &CollectionQuery) -> ServiceResult<&SyntheticCollection> {
        self.collections
            .get(&query.collection_id)
            .ok_or_else(|| ServiceError::CollectionNotFound(query.collection_id.clone()))
    }

    fn check_listing(&self, query: &CollectionQuery) -> ServiceResult<()> {
        if let Some(date) = self
            .failing_listings
            .iter()
            .find(|d| **d >= query.start && **d < query.end)
        {
            return Err(ServiceError::Request(format!(
                "listing {} failed on {}",
                query.describe(),
                date
            )));
        }
        Ok(())
    }

    fn timestamps(collection: &SyntheticCollection, query: &CollectionQuery) -> Vec<DateTime<Utc>> {
        let mut timestamps = Vec::new();
        match collection.cadence {
            Cadence::Monthly => {
                let mut month = first_of_month(query.start);
                if month < query.start {
                    month = next_month(month);
                }
                while month < query.end {
                    timestamps.push(midnight(month));
                    month = next_month(month);
                }
            }
            Cadence::EveryHours(hours) => {
                let step = Duration::hours(i64::from(hours.max(1)));
                let mut t = midnight(query.start);
                while t.date_naive() < query.end {
                    timestamps.push(t);
                    t += step;
                }
            }
        }
        timestamps
    }
}

impl Default for SyntheticService {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageryService for SyntheticService {
    fn initialize(&self) -> ServiceResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.unavailable {
            return Err(ServiceError::Unavailable(message.clone()));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn list_timestamps(&self, query: &CollectionQuery) -> ServiceResult<Vec<DateTime<Utc>>> {
        self.begin_call()?;
        self.check_listing(query)?;
        let collection = self.collection(query)?;
        Ok(Self::timestamps(collection, query))
    }

    fn list_images(&self, query: &CollectionQuery) -> ServiceResult<Vec<Image>> {
        self.begin_call()?;
        self.check_listing(query)?;
        let collection = self.collection(query)?;
        Ok(Self::timestamps(collection, query)
            .into_iter()
            .filter(|t| !self.missing_images.contains(&t.date_naive()))
            .map(|t| Image::asset(&query.collection_id, &query.variable_id, t))
            .collect())
    }

    fn first_image(&self, query: &CollectionQuery) -> ServiceResult<Option<Image>> {
        self.begin_call()?;
        self.check_listing(query)?;
        let collection = self.collection(query)?;
        Ok(Self::timestamps(collection, query)
            .into_iter()
            .find(|t| !self.missing_images.contains(&t.date_naive()))
            .map(|t| Image::asset(&query.collection_id, &query.variable_id, t)))
    }

    fn sample_points(
        &self,
        image: &Image,
        points: &[Point],
        _scale_m: u32,
    ) -> ServiceResult<Vec<SampledPoint>> {
        self.begin_call()?;
        self.sample_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(collection_id) = self
            .expired_collections
            .iter()
            .find(|id| references(&image.expr, id))
        {
            return Err(ServiceError::Unavailable(format!(
                "session expired while sampling {}",
                collection_id
            )));
        }

        if self.failing_samples.contains(&image.date()) {
            return Err(ServiceError::Request(format!(
                "sampling failed for image at {}",
                image.time_start
            )));
        }

        Ok(points
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let mut leaf = |collection_id: &str, _band: &str, time_start: DateTime<Utc>| {
                    self.collections
                        .get(collection_id)
                        .and_then(|c| (c.value)(*point, time_start))
                };
                let mut properties = HashMap::new();
                if let Some(value) = image.expr.evaluate(&mut leaf) {
                    properties.insert(image.band.clone(), value);
                }
                SampledPoint { index, properties }
            })
            .collect())
    }
}

/// Deterministic seasonal precipitation-like signal in the dataset's native units.
fn seasonal_signal(time_scale: TimeScale) -> ValueFn {
    let scale = match time_scale {
        // kg m-2 s-1 style rates for monthly and 3-hourly land-surface products
        TimeScale::Monthly | TimeScale::ThreeHourly => 1.0 / 86_400.0,
        TimeScale::Hourly => 1.0 / 24.0,
        TimeScale::Daily => 1.0,
    };
    Arc::new(move |point: Point, t: DateTime<Utc>| {
        let phase = f64::from(t.ordinal()) / 365.25 * std::f64::consts::TAU;
        let site = (point.latitude.abs() + point.longitude.abs()) % 5.0;
        Some(((phase.sin() + 1.0) * 2.0 + site) * scale)
    })
}

fn references(expr: &ImageExpr, collection: &str) -> bool {
    match expr {
        ImageExpr::Asset { collection_id, .. } => collection_id == collection,
        ImageExpr::Scaled { source, .. } => references(source, collection),
        ImageExpr::Sum(terms) => terms.iter().any(|term| references(term, collection)),
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(chrono::Months::new(1))
        .unwrap_or(date)
}
