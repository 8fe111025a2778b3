// ── Domain model ──
//
// Output shapes published to presentation consumers. All of them are plain
// serde-serializable values with no hidden behaviour.

pub mod chart;
pub mod source;
pub mod state;
pub mod summary;

pub use chart::{ChartPoint, ChartSeries, SeriesSource};
pub use source::Source;
pub use state::{
    Charts, DashboardState, PARTIAL_FAILURE_BANNER, SourceWarning, Summaries, WarningKind,
};
pub use summary::{Breakdown, EntitySummary, SummaryBasis};
