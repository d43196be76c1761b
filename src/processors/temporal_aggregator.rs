use crate::models::{DatasetDescriptor, DatasetFamily, TimeScale};
use crate::service::{Image, ImageExpr};
use crate::utils::constants::{HOURS_PER_DAY, THREE_HOURLY_DAY_FRACTION};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// How the images of one day are combined into a daily depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregationRule {
    /// Hourly rates in mm/hr: the daily depth is their plain sum.
    RateAccumulation,
    /// Each 3-hourly flux image covers `weight` of a day, unit factor included.
    FractionOfDay { weight: f64 },
    ScaledTotal { factor: f64 },
    /// Hourly means: each image weighs 1/24, factor applied once to the total.
    HourlyMean { factor: f64 },
    Total { factor: f64 },
}

impl AggregationRule {
    pub fn for_dataset(dataset: &DatasetDescriptor) -> Self {
        let factor = dataset.conversion_factor;
        match (dataset.family, dataset.time_scale) {
            (DatasetFamily::RateHourly, _) => AggregationRule::RateAccumulation,
            (DatasetFamily::LandSurface, TimeScale::ThreeHourly) => AggregationRule::FractionOfDay {
                weight: THREE_HOURLY_DAY_FRACTION * factor,
            },
            (DatasetFamily::LandSurface, _) => AggregationRule::ScaledTotal { factor },
            (DatasetFamily::Generic, TimeScale::Hourly) => AggregationRule::HourlyMean { factor },
            (DatasetFamily::Generic, _) => AggregationRule::Total { factor },
        }
    }

    /// Combine the expressions of one day's images.
    pub fn apply(&self, terms: Vec<ImageExpr>) -> ImageExpr {
        match *self {
            AggregationRule::RateAccumulation => ImageExpr::Sum(terms),
            AggregationRule::FractionOfDay { weight } => ImageExpr::Sum(
                terms.into_iter().map(|term| scaled(term, weight)).collect(),
            ),
            AggregationRule::ScaledTotal { factor } => scaled(ImageExpr::Sum(terms), factor),
            AggregationRule::HourlyMean { factor } => {
                let total = ImageExpr::Sum(
                    terms
                        .into_iter()
                        .map(|term| scaled(term, 1.0 / HOURS_PER_DAY))
                        .collect(),
                );
                scale_unless_unit(total, factor)
            }
            AggregationRule::Total { factor } => scale_unless_unit(ImageExpr::Sum(terms), factor),
        }
    }
}

fn scaled(source: ImageExpr, factor: f64) -> ImageExpr {
    ImageExpr::Scaled {
        source: Box::new(source),
        factor,
    }
}

fn scale_unless_unit(expr: ImageExpr, factor: f64) -> ImageExpr {
    if factor == 1.0 {
        expr
    } else {
        scaled(expr, factor)
    }
}

/// Collapses sub-daily images into one image per UTC calendar day.
pub struct TemporalAggregator {
    rule: AggregationRule,
    band: String,
}

impl TemporalAggregator {
    pub fn for_dataset(dataset: &DatasetDescriptor) -> Self {
        Self {
            rule: AggregationRule::for_dataset(dataset),
            band: dataset.variable_id.clone(),
        }
    }

    pub fn rule(&self) -> AggregationRule {
        self.rule
    }

    /// One aggregate per distinct date in `images`, in date order.
    ///
    /// Days without any source image produce nothing.
    pub fn aggregate(&self, images: Vec<Image>) -> Vec<Image> {
        let source_count = images.len();
        let mut by_day: BTreeMap<NaiveDate, Vec<ImageExpr>> = BTreeMap::new();
        for image in images {
            by_day.entry(image.date()).or_default().push(image.expr);
        }

        let daily: Vec<Image> = by_day
            .into_iter()
            .map(|(date, terms)| Image::daily(&self.band, date, self.rule.apply(terms)))
            .collect();

        debug!(
            "Aggregated {} images into {} daily images ({:?})",
            source_count,
            daily.len(),
            self.rule
        );
        daily
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn hourly_images(start: DateTime<Utc>, count: i64, step_hours: i64) -> Vec<Image> {
        (0..count)
            .map(|i| Image::asset("c", "v", start + Duration::hours(i * step_hours)))
            .collect()
    }

    fn evaluate_constant(image: &Image, value: f64) -> Option<f64> {
        image.expr.evaluate(&mut |_, _, _| Some(value))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_rule_lookup() {
        let gsmap = DatasetDescriptor::new("GSMAP", "c", "v", TimeScale::Hourly)
            .with_family(DatasetFamily::RateHourly);
        assert_eq!(AggregationRule::for_dataset(&gsmap), AggregationRule::RateAccumulation);

        let gldas = DatasetDescriptor::new("GLDAS", "c", "v", TimeScale::ThreeHourly)
            .with_family(DatasetFamily::LandSurface)
            .with_conversion_factor(86_400.0);
        assert_eq!(
            AggregationRule::for_dataset(&gldas),
            AggregationRule::FractionOfDay { weight: 10_800.0 }
        );

        let daily_land = DatasetDescriptor::new("L", "c", "v", TimeScale::Daily)
            .with_family(DatasetFamily::LandSurface)
            .with_conversion_factor(2.0);
        assert_eq!(
            AggregationRule::for_dataset(&daily_land),
            AggregationRule::ScaledTotal { factor: 2.0 }
        );

        let daily = DatasetDescriptor::new("D", "c", "v", TimeScale::Daily);
        assert_eq!(AggregationRule::for_dataset(&daily), AggregationRule::Total { factor: 1.0 });
    }

    #[test]
    fn test_generic_hourly_mean_times_factor() {
        let dataset =
            DatasetDescriptor::new("H", "c", "v", TimeScale::Hourly).with_conversion_factor(1000.0);
        let daily = TemporalAggregator::for_dataset(&dataset).aggregate(hourly_images(start(), 24, 1));

        assert_eq!(daily.len(), 1);
        let value = evaluate_constant(&daily[0], 0.002).unwrap();
        assert!((value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_land_surface_three_hourly_fraction() {
        let dataset = DatasetDescriptor::new("G", "c", "v", TimeScale::ThreeHourly)
            .with_family(DatasetFamily::LandSurface)
            .with_conversion_factor(86_400.0);
        let daily = TemporalAggregator::for_dataset(&dataset).aggregate(hourly_images(start(), 8, 3));

        assert_eq!(daily.len(), 1);
        let rate = 1.0 / 86_400.0;
        let value = evaluate_constant(&daily[0], rate).unwrap();
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rate_accumulation_sums() {
        let dataset = DatasetDescriptor::new("GSMAP", "c", "v", TimeScale::Hourly)
            .with_family(DatasetFamily::RateHourly);
        let daily = TemporalAggregator::for_dataset(&dataset).aggregate(hourly_images(start(), 24, 1));
        assert_eq!(evaluate_constant(&daily[0], 0.5), Some(12.0));
    }

    #[test]
    fn test_land_surface_daily_scaled_total() {
        let dataset = DatasetDescriptor::new("L", "c", "v", TimeScale::Daily)
            .with_family(DatasetFamily::LandSurface)
            .with_conversion_factor(2.5);
        let daily = TemporalAggregator::for_dataset(&dataset).aggregate(hourly_images(start(), 2, 6));

        assert_eq!(daily.len(), 1);
        let value = evaluate_constant(&daily[0], 4.0).unwrap();
        assert!((value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_generic_total_times_factor() {
        let dataset =
            DatasetDescriptor::new("D", "c", "v", TimeScale::Daily).with_conversion_factor(10.0);
        let daily = TemporalAggregator::for_dataset(&dataset).aggregate(hourly_images(start(), 3, 4));

        assert_eq!(daily.len(), 1);
        let value = evaluate_constant(&daily[0], 0.5).unwrap();
        assert!((value - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_factor_leaves_total_unscaled() {
        let dataset = DatasetDescriptor::new("D", "c", "v", TimeScale::Daily);
        let daily = TemporalAggregator::for_dataset(&dataset).aggregate(hourly_images(start(), 2, 1));
        assert!(matches!(daily[0].expr, ImageExpr::Sum(ref terms) if terms.len() == 2));
        assert_eq!(evaluate_constant(&daily[0], 1.5), Some(3.0));

        let hourly = DatasetDescriptor::new("H", "c", "v", TimeScale::Hourly);
        let daily = TemporalAggregator::for_dataset(&hourly).aggregate(hourly_images(start(), 24, 1));
        assert!(matches!(daily[0].expr, ImageExpr::Sum(_)));
    }

    #[test]
    fn test_one_aggregate_per_date_in_order() {
        let dataset = DatasetDescriptor::new("H", "c", "v", TimeScale::Hourly);
        let mut images = hourly_images(start(), 48, 1);
        images.reverse();
        // leave a gap on July 3rd
        images.extend(hourly_images(start() + Duration::days(3), 2, 1));

        let daily = TemporalAggregator::for_dataset(&dataset).aggregate(images);
        let keys: Vec<&str> = daily.iter().filter_map(|i| i.date_key.as_deref()).collect();
        assert_eq!(keys, vec!["2020-07-01", "2020-07-02", "2020-07-04"]);
        assert!(daily.iter().all(|i| i.band == "v"));
        assert_eq!(daily[2].expr.leaf_count(), 2);
    }

    #[test]
    fn test_no_images_no_aggregates() {
        let dataset = DatasetDescriptor::new("H", "c", "v", TimeScale::Hourly);
        assert!(TemporalAggregator::for_dataset(&dataset).aggregate(Vec::new()).is_empty());
    }
}
