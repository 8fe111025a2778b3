//! Metrics layer between `crmdash-api` and dashboard consumers (CLI).
//!
//! This crate owns the reconciliation, estimation, and chart-derivation
//! logic for the training-CRM dashboard:
//!
//! - **[`Dashboard`]**: facade managing the polling lifecycle:
//!   [`start()`](Dashboard::start) runs an initial aggregation pass and spawns
//!   the "fast metrics" and "slow metrics" tasks; [`stop()`](Dashboard::stop)
//!   cancels and joins them. [`Dashboard::oneshot()`] runs a single pass for
//!   CLI invocations.
//!
//! - **[`MetricsAggregator`]**: fans out to every source endpoint
//!   concurrently and folds the responses into [`EntitySummary`] and
//!   [`ChartSeries`] values. A failing source degrades to a documented
//!   fallback instead of failing the pass.
//!
//! - **[`DashboardStore`]**: holds the published [`DashboardState`] behind a
//!   `tokio::sync::watch` channel and discards results from passes older than
//!   the last one applied.
//!
//! - **[`metrics`]**: pure functions for total reconciliation, status
//!   classification, proportional breakdown estimation, and synthetic
//!   growth-curve series.

pub mod aggregator;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregator::{ChartsReport, MetricsAggregator, PassReport, SummariesReport};
pub use config::{DashboardConfig, Endpoints, TlsVerification};
pub use dashboard::{Dashboard, PassOutcome};
pub use error::{CoreError, SourceError};
pub use store::{ApplyOutcome, DashboardStore};
pub use stream::{DashboardStream, DashboardWatchStream};

pub use model::{
    Breakdown, ChartPoint, ChartSeries, Charts, DashboardState, EntitySummary,
    PARTIAL_FAILURE_BANNER, SeriesSource, Source, SourceWarning, Summaries, SummaryBasis,
    WarningKind,
};
