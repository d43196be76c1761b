use crate::service::{Image, ServiceResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// A collection filtered by variable and a half-open date range `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionQuery {
    pub collection_id: String,
    pub variable_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CollectionQuery {
    pub fn new(collection_id: &str, variable_id: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            variable_id: variable_id.to_string(),
            start,
            end,
        }
    }

    /// Narrow this query to a sub-range, keeping collection and variable.
    pub fn narrowed(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            ..self.clone()
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let date = timestamp.date_naive();
        date >= self.start && date < self.end
    }

    pub fn describe(&self) -> String {
        format!(
            "{}:{} [{}, {})",
            self.collection_id, self.variable_id, self.start, self.end
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub longitude: f64,
    pub latitude: f64,
}

/// Properties returned for one sampled point, keyed by its index in the request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampledPoint {
    pub index: usize,
    pub properties: HashMap<String, f64>,
}

/// Operations the pipeline needs from the remote imagery platform.
///
/// Every call is a blocking round-trip. Implementations must return
/// [`ServiceError::Unavailable`](crate::service::ServiceError::Unavailable) when no session
/// exists rather than partial results.
pub trait ImageryService {
    /// One-time handshake. Called at most once per session.
    fn initialize(&self) -> ServiceResult<()>;

    fn shutdown(&self) {}

    /// Acquisition timestamps of every image matching the query, in service order.
    fn list_timestamps(&self, query: &CollectionQuery) -> ServiceResult<Vec<DateTime<Utc>>>;

    /// Every image matching the query.
    fn list_images(&self, query: &CollectionQuery) -> ServiceResult<Vec<Image>>;

    /// First image matching the query, or `None` when the range is empty.
    fn first_image(&self, query: &CollectionQuery) -> ServiceResult<Option<Image>>;

    /// Evaluate `image` at all `points` in a single request.
    fn sample_points(
        &self,
        image: &Image,
        points: &[Point],
        scale_m: u32,
    ) -> ServiceResult<Vec<SampledPoint>>;
}

impl<S: ImageryService + ?Sized> ImageryService for &S {
    fn initialize(&self) -> ServiceResult<()> {
        (**self).initialize()
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }

    fn list_timestamps(&self, query: &CollectionQuery) -> ServiceResult<Vec<DateTime<Utc>>> {
        (**self).list_timestamps(query)
    }

    fn list_images(&self, query: &CollectionQuery) -> ServiceResult<Vec<Image>> {
        (**self).list_images(query)
    }

    fn first_image(&self, query: &CollectionQuery) -> ServiceResult<Option<Image>> {
        (**self).first_image(query)
    }

    fn sample_points(
        &self,
        image: &Image,
        points: &[Point],
        scale_m: u32,
    ) -> ServiceResult<Vec<SampledPoint>> {
        (**self).sample_points(image, points, scale_m)
    }
}
