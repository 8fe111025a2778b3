use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Category label → record count, in classifier order.
pub type Breakdown = IndexMap<String, u64>;

/// Where a summary's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SummaryBasis {
    /// Pre-aggregated counts from the stats endpoint.
    Stats,
    /// The whole set fit on the page; breakdown counts are exact.
    Exact,
    /// Partial page; breakdown scaled to the declared total.
    Estimated,
    /// No declared total; page length used as the total.
    Degraded,
    /// Source failed; zero fallback.
    #[default]
    Unavailable,
}

/// Normalized per-entity summary: authoritative total plus a breakdown.
///
/// `breakdown` values need not sum to `total` when the basis is
/// [`SummaryBasis::Estimated`]: each category is rounded independently.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntitySummary {
    pub total: u64,
    pub breakdown: Breakdown,
    pub basis: SummaryBasis,
}

impl EntitySummary {
    /// Zero-valued summary with every named category present at 0.
    pub fn unavailable<'a>(categories: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            total: 0,
            breakdown: categories.into_iter().map(|c| (c.to_owned(), 0)).collect(),
            basis: SummaryBasis::Unavailable,
        }
    }

    /// Summary with a total and no breakdown (content collections).
    pub fn total_only(total: u64, basis: SummaryBasis) -> Self {
        Self {
            total,
            breakdown: Breakdown::new(),
            basis,
        }
    }

    /// Count for one category, 0 if absent.
    pub fn count(&self, category: &str) -> u64 {
        self.breakdown.get(category).copied().unwrap_or(0)
    }

    pub fn is_available(&self) -> bool {
        self.basis != SummaryBasis::Unavailable
    }
}
