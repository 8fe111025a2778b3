// Pure metric derivations. No I/O, no clocks: callers pass the anchor date.

pub mod classify;
pub mod reconcile;
pub mod series;
pub mod stats;

pub use classify::{StatusClassifier, StatusKey, classify};
pub use reconcile::{ReconciledTotal, estimate_breakdown, reconcile_total, summarize};
pub use series::{build_chart_series, month_labels, synthesize_series};
pub use stats::summary_from_stats;
