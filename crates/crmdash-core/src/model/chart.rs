use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;

/// One month of one dashboard chart.
///
/// Serialized flat, matching the backend's history shape:
/// `{ "month": "May 2026", "leads": 12, "users": 40 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub month: String,
    #[serde(flatten)]
    pub metrics: IndexMap<String, u64>,
}

impl ChartPoint {
    pub fn value(&self, series: &str) -> u64 {
        self.metrics.get(series).copied().unwrap_or(0)
    }
}

/// Whether a series is real history or a derived approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeriesSource {
    /// Points returned verbatim by a history endpoint.
    History,
    /// Growth curve derived from current totals. Not historical data.
    #[default]
    Synthetic,
}

/// An ordered, oldest-first sequence of chart points plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChartSeries {
    pub source: SeriesSource,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn is_synthetic(&self) -> bool {
        self.source == SeriesSource::Synthetic
    }

    /// Series names in first-seen order across all points.
    pub fn series_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for point in &self.points {
            for name in point.metrics.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }
}
