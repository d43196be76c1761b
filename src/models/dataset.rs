use crate::error::{FetchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native temporal resolution of a gridded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    Monthly,
    Daily,
    Hourly,
    #[serde(rename = "3hourly")]
    ThreeHourly,
}

impl TimeScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeScale::Monthly => "monthly",
            TimeScale::Daily => "daily",
            TimeScale::Hourly => "hourly",
            TimeScale::ThreeHourly => "3hourly",
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Product family, which decides how sub-daily images are weighted into a daily total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFamily {
    /// Hourly rain-rate products (mm/hr), e.g. GSMaP.
    RateHourly,
    /// Land-surface model output in flux units, e.g. GLDAS.
    LandSurface,
    #[default]
    Generic,
}

/// Years for which a dataset has data. `end` of `None` means still being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidYears {
    pub start: i32,
    #[serde(default)]
    pub end: Option<i32>,
}

impl ValidYears {
    pub fn new(start: i32, end: Option<i32>) -> Self {
        Self { start, end }
    }

    /// True when `[start_year, end_year]` shares no year with this range.
    pub fn is_disjoint_from(&self, start_year: i32, end_year: i32) -> bool {
        match self.end {
            None => end_year < self.start,
            Some(end) => start_year > end || end_year < self.start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub name: String,
    pub collection_id: String,
    pub variable_id: String,
    pub time_scale: TimeScale,
    #[serde(default)]
    pub family: DatasetFamily,
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,
    #[serde(default)]
    pub valid_years: Option<ValidYears>,
    #[serde(default)]
    pub output_key: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

fn default_conversion_factor() -> f64 {
    1.0
}

impl DatasetDescriptor {
    pub fn new(name: &str, collection_id: &str, variable_id: &str, time_scale: TimeScale) -> Self {
        Self {
            name: name.to_string(),
            collection_id: collection_id.to_string(),
            variable_id: variable_id.to_string(),
            time_scale,
            family: DatasetFamily::Generic,
            conversion_factor: 1.0,
            valid_years: None,
            output_key: None,
            enabled: false,
        }
    }

    pub fn with_family(mut self, family: DatasetFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_conversion_factor(mut self, conversion_factor: f64) -> Self {
        self.conversion_factor = conversion_factor;
        self
    }

    pub fn with_valid_years(mut self, start: i32, end: Option<i32>) -> Self {
        self.valid_years = Some(ValidYears::new(start, end));
        self
    }

    pub fn with_output_key(mut self, key: &str) -> Self {
        self.output_key = Some(key.to_string());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Stable identifier for the persisted table.
    pub fn output_key(&self) -> String {
        self.output_key
            .clone()
            .unwrap_or_else(|| format!("{}_precipitation", self.name.to_lowercase()))
    }

    pub fn validate_descriptor(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FetchError::Config("dataset name must not be empty".to_string()));
        }
        if self.collection_id.trim().is_empty() || self.variable_id.trim().is_empty() {
            return Err(FetchError::Config(format!(
                "dataset {} needs both collection_id and variable_id",
                self.name
            )));
        }
        if !(self.conversion_factor.is_finite() && self.conversion_factor > 0.0) {
            return Err(FetchError::Config(format!(
                "dataset {} has non-positive conversion_factor {}",
                self.name, self.conversion_factor
            )));
        }
        if let Some(range) = self.valid_years {
            if range.end.is_some_and(|end| end < range.start) {
                return Err(FetchError::Config(format!(
                    "dataset {} has valid_years ending before they start",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Built-in registry of supported precipitation products. All start disabled.
pub fn default_datasets() -> Vec<DatasetDescriptor> {
    vec![
        DatasetDescriptor::new(
            "ERA5",
            "ECMWF/ERA5_LAND/DAILY_AGGR",
            "total_precipitation_sum",
            TimeScale::Daily,
        )
        .with_conversion_factor(1000.0),
        DatasetDescriptor::new("DAYMET", "NASA/ORNL/DAYMET_V4", "prcp", TimeScale::Daily),
        DatasetDescriptor::new("PRISM", "OREGONSTATE/PRISM/AN81d", "ppt", TimeScale::Daily),
        DatasetDescriptor::new(
            "CHIRPS",
            "UCSB-CHG/CHIRPS/DAILY",
            "precipitation",
            TimeScale::Daily,
        )
        .with_valid_years(1981, None),
        DatasetDescriptor::new(
            "FLDAS",
            "NASA/FLDAS/NOAH01/C/GL/M/V001",
            "Rainf_f_tavg",
            TimeScale::Monthly,
        )
        .with_family(DatasetFamily::LandSurface)
        .with_conversion_factor(86_400.0)
        .with_valid_years(1982, None),
        DatasetDescriptor::new(
            "GSMAP",
            "JAXA/GPM_L3/GSMaP/v6/operational",
            "hourlyPrecipRate",
            TimeScale::Hourly,
        )
        .with_family(DatasetFamily::RateHourly)
        .with_valid_years(2014, None),
        DatasetDescriptor::new(
            "GLDAS-Historical",
            "NASA/GLDAS/V20/NOAH/G025/T3H",
            "Rainf_f_tavg",
            TimeScale::ThreeHourly,
        )
        .with_family(DatasetFamily::LandSurface)
        .with_conversion_factor(86_400.0)
        .with_valid_years(1948, Some(2014)),
        DatasetDescriptor::new(
            "GLDAS-Current",
            "NASA/GLDAS/V021/NOAH/G025/T3H",
            "Rainf_f_tavg",
            TimeScale::ThreeHourly,
        )
        .with_family(DatasetFamily::LandSurface)
        .with_conversion_factor(86_400.0)
        .with_valid_years(2000, None),
    ]
}
