use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Server-side image computation.
///
/// Leaves address a single acquisition in a collection. The aggregation rules only need
/// scaling and summation, so those are the only composite nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageExpr {
    Asset {
        collection_id: String,
        band: String,
        time_start: DateTime<Utc>,
    },
    Scaled {
        source: Box<ImageExpr>,
        factor: f64,
    },
    Sum(Vec<ImageExpr>),
}

impl ImageExpr {
    /// Evaluate at one location, resolving leaves through `leaf`.
    ///
    /// Masked leaves (`None`) are skipped by `Sum`; a sum with no unmasked term is masked.
    pub fn evaluate<F>(&self, leaf: &mut F) -> Option<f64>
    where
        F: FnMut(&str, &str, DateTime<Utc>) -> Option<f64>,
    {
        match self {
            ImageExpr::Asset {
                collection_id,
                band,
                time_start,
            } => leaf(collection_id, band, *time_start),
            ImageExpr::Scaled { source, factor } => source.evaluate(leaf).map(|v| v * factor),
            ImageExpr::Sum(terms) => terms
                .iter()
                .filter_map(|term| term.evaluate(leaf))
                .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v)),
        }
    }

    /// Number of asset leaves referenced by this expression.
    pub fn leaf_count(&self) -> usize {
        match self {
            ImageExpr::Asset { .. } => 1,
            ImageExpr::Scaled { source, .. } => source.leaf_count(),
            ImageExpr::Sum(terms) => terms.iter().map(ImageExpr::leaf_count).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub band: String,
    pub time_start: DateTime<Utc>,
    /// `YYYY-MM-DD` key set on daily aggregates.
    pub date_key: Option<String>,
    pub expr: ImageExpr,
}

impl Image {
    pub fn asset(collection_id: &str, band: &str, time_start: DateTime<Utc>) -> Self {
        Self {
            band: band.to_string(),
            time_start,
            date_key: None,
            expr: ImageExpr::Asset {
                collection_id: collection_id.to_string(),
                band: band.to_string(),
                time_start,
            },
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.time_start.date_naive()
    }

    /// Build a daily image stamped at midnight UTC of `date`.
    pub fn daily(band: &str, date: NaiveDate, expr: ImageExpr) -> Self {
        let midnight = date.and_time(NaiveTime::default()).and_utc();
        Self {
            band: band.to_string(),
            time_start: midnight,
            date_key: Some(date.format("%Y-%m-%d").to_string()),
            expr,
        }
    }
}
