use crate::error::{FetchError, Result};
use crate::models::{StationRegistry, StationValues};
use crate::service::{Image, ImageryService, Point, ServiceError};
use tracing::error;

/// Evaluates images at every station of a registry in one request.
pub struct PointSampler<'a, S: ImageryService> {
    service: &'a S,
    variable: String,
    scale_m: u32,
}

impl<'a, S: ImageryService> PointSampler<'a, S> {
    pub fn new(service: &'a S, variable: &str, scale_m: u32) -> Self {
        Self {
            service,
            variable: variable.to_string(),
            scale_m,
        }
    }

    /// Values of `variable` per station id. Stations with no value are absent.
    ///
    /// A failed request is logged and yields an empty map. An unavailable service is
    /// returned as [`FetchError::ServiceUnavailable`].
    pub fn sample(&self, image: &Image, registry: &StationRegistry) -> Result<StationValues> {
        let points: Vec<Point> = registry.points();
        let sampled = match self.service.sample_points(image, &points, self.scale_m) {
            Ok(sampled) => sampled,
            Err(ServiceError::Unavailable(message)) => {
                return Err(FetchError::ServiceUnavailable(message));
            }
            Err(source) => {
                let e = FetchError::Sampling {
                    date: image.date().to_string(),
                    source,
                };
                error!("{}", e);
                return Ok(StationValues::new());
            }
        };

        Ok(sampled
            .into_iter()
            .filter_map(|point| {
                let station = registry.get(point.index)?;
                let value = point.properties.get(&self.variable)?;
                Some((station.id.clone(), *value))
            })
            .collect())
    }
}
