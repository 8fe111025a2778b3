// ── Reactive dashboard store ──
//
// Single published state with push-based change notification and a
// sequence guard against out-of-order passes.

mod dashboard_store;

pub use dashboard_store::{ApplyOutcome, DashboardStore};
