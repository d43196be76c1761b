use crate::models::{DatasetDescriptor, TimeScale};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Valid years do not overlap the run; nothing is fetched.
    Skip,
    Monthly,
    /// Month-by-month listing with on-the-fly daily aggregation.
    ChunkedHighRes,
    StandardDaily,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchStrategy::Skip => "skip",
            FetchStrategy::Monthly => "monthly",
            FetchStrategy::ChunkedHighRes => "chunked high-resolution",
            FetchStrategy::StandardDaily => "standard daily",
        };
        f.write_str(name)
    }
}

/// Pick how `dataset` is fetched for `[start_year, end_year]`.
///
/// A name on `resource_intensive` forces the chunked path even for daily products.
pub fn select_strategy(
    dataset: &DatasetDescriptor,
    start_year: i32,
    end_year: i32,
    resource_intensive: &[String],
) -> FetchStrategy {
    if dataset
        .valid_years
        .is_some_and(|range| range.is_disjoint_from(start_year, end_year))
    {
        return FetchStrategy::Skip;
    }

    match dataset.time_scale {
        TimeScale::Monthly => FetchStrategy::Monthly,
        TimeScale::Hourly | TimeScale::ThreeHourly => FetchStrategy::ChunkedHighRes,
        TimeScale::Daily if resource_intensive.iter().any(|name| *name == dataset.name) => {
            FetchStrategy::ChunkedHighRes
        }
        TimeScale::Daily => FetchStrategy::StandardDaily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_datasets;

    fn daily(name: &str) -> DatasetDescriptor {
        DatasetDescriptor::new(name, "c", "v", TimeScale::Daily)
    }

    #[test]
    fn test_time_scale_routing() {
        let none: Vec<String> = Vec::new();
        assert_eq!(select_strategy(&daily("ERA5"), 2020, 2021, &none), FetchStrategy::StandardDaily);

        let monthly = DatasetDescriptor::new("FLDAS", "c", "v", TimeScale::Monthly);
        assert_eq!(select_strategy(&monthly, 2020, 2021, &none), FetchStrategy::Monthly);

        for scale in [TimeScale::Hourly, TimeScale::ThreeHourly] {
            let sub_daily = DatasetDescriptor::new("X", "c", "v", scale);
            assert_eq!(
                select_strategy(&sub_daily, 2020, 2021, &none),
                FetchStrategy::ChunkedHighRes
            );
        }
    }

    #[test]
    fn test_allow_list_forces_chunking() {
        let listed = vec!["HEAVY".to_string()];
        assert_eq!(
            select_strategy(&daily("HEAVY"), 2020, 2021, &listed),
            FetchStrategy::ChunkedHighRes
        );
        assert_eq!(
            select_strategy(&daily("LIGHT"), 2020, 2021, &listed),
            FetchStrategy::StandardDaily
        );
    }

    #[test]
    fn test_disjoint_valid_years_skip() {
        let none: Vec<String> = Vec::new();
        let closed = daily("OLD").with_valid_years(2015, Some(2018));
        assert_eq!(select_strategy(&closed, 2020, 2021, &none), FetchStrategy::Skip);
        assert_eq!(select_strategy(&closed, 2018, 2021, &none), FetchStrategy::StandardDaily);

        let open = daily("NEW").with_valid_years(2014, None);
        assert_eq!(select_strategy(&open, 2010, 2013, &none), FetchStrategy::Skip);
        assert_eq!(select_strategy(&open, 2010, 2014, &none), FetchStrategy::StandardDaily);
    }

    #[test]
    fn test_builtin_registry() {
        let none: Vec<String> = Vec::new();
        let strategies: Vec<(String, FetchStrategy)> = default_datasets()
            .iter()
            .map(|d| (d.name.clone(), select_strategy(d, 2016, 2017, &none)))
            .collect();

        assert!(strategies.contains(&("GLDAS-Historical".to_string(), FetchStrategy::Skip)));
        assert!(strategies.contains(&("FLDAS".to_string(), FetchStrategy::Monthly)));
        assert!(strategies.contains(&("GSMAP".to_string(), FetchStrategy::ChunkedHighRes)));
        assert!(strategies.contains(&("CHIRPS".to_string(), FetchStrategy::StandardDaily)));
    }
}
