// ── Dashboard state store ──
//
// The published `DashboardState` lives in a `watch` channel. Passes take a
// sequence number when they start and apply their results when they finish;
// a section is only replaced by a pass newer than the one that last wrote it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::aggregator::{ChartsReport, PassReport, SummariesReport};
use crate::model::DashboardState;
use crate::stream::DashboardStream;

/// Result of applying a pass to one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer pass already wrote this section; the result was dropped.
    StaleDiscarded { seq: u64, latest: u64 },
}

impl ApplyOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Holds the published dashboard state.
pub struct DashboardStore {
    state: watch::Sender<Arc<DashboardState>>,
    next_seq: AtomicU64,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(DashboardState::default()));
        Self {
            state,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Reserve the sequence number for a pass about to start.
    ///
    /// Strictly increasing across every pass of this store, fast or slow.
    pub fn begin_pass(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// The currently published state.
    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> DashboardStream {
        DashboardStream::new(self.state.subscribe())
    }

    /// Replace the summaries section if `seq` is newer than the last one applied.
    pub fn apply_summaries(&self, seq: u64, report: SummariesReport) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::Applied;
        self.state.send_if_modified(|state| {
            outcome = guard(state.summaries_seq, seq);
            if outcome.is_applied() {
                write_summaries(Arc::make_mut(state), seq, report);
            }
            outcome.is_applied()
        });
        log_discard("summaries", outcome);
        outcome
    }

    /// Replace the charts section if `seq` is newer than the last one applied.
    pub fn apply_charts(&self, seq: u64, report: ChartsReport) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::Applied;
        self.state.send_if_modified(|state| {
            outcome = guard(state.charts_seq, seq);
            if outcome.is_applied() {
                write_charts(Arc::make_mut(state), seq, report);
            }
            outcome.is_applied()
        });
        log_discard("charts", outcome);
        outcome
    }

    /// Apply both sections of a full pass under one sequence number.
    ///
    /// Both guards are checked and both sections written inside a single
    /// `send_if_modified`, so no reader sees one section without the other.
    pub fn apply_pass(&self, seq: u64, report: PassReport) -> (ApplyOutcome, ApplyOutcome) {
        let PassReport { summaries, charts } = report;
        let mut outcomes = (ApplyOutcome::Applied, ApplyOutcome::Applied);
        self.state.send_if_modified(|state| {
            outcomes = (guard(state.summaries_seq, seq), guard(state.charts_seq, seq));
            if !outcomes.0.is_applied() && !outcomes.1.is_applied() {
                return false;
            }
            let state = Arc::make_mut(state);
            if outcomes.0.is_applied() {
                write_summaries(state, seq, summaries);
            }
            if outcomes.1.is_applied() {
                write_charts(state, seq, charts);
            }
            true
        });
        log_discard("summaries", outcomes.0);
        log_discard("charts", outcomes.1);
        outcomes
    }
}

fn guard(latest: u64, seq: u64) -> ApplyOutcome {
    if seq <= latest {
        ApplyOutcome::StaleDiscarded { seq, latest }
    } else {
        ApplyOutcome::Applied
    }
}

fn write_summaries(state: &mut DashboardState, seq: u64, report: SummariesReport) {
    state.summaries = report.summaries;
    state.summary_warnings = report.warnings;
    state.summaries_seq = seq;
    state.summaries_updated_at = Some(Utc::now());
}

fn write_charts(state: &mut DashboardState, seq: u64, report: ChartsReport) {
    state.charts = report.charts;
    state.chart_warnings = report.warnings;
    state.charts_seq = seq;
    state.charts_updated_at = Some(Utc::now());
}

fn log_discard(section: &'static str, outcome: ApplyOutcome) {
    if let ApplyOutcome::StaleDiscarded { seq, latest } = outcome {
        debug!(section, seq, latest, "discarding result from an older pass");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{EntitySummary, SummaryBasis};

    fn summaries_with_leads(total: u64) -> SummariesReport {
        let mut report = SummariesReport::default();
        report.summaries.leads = EntitySummary::total_only(total, SummaryBasis::Exact);
        report
    }

    #[test]
    fn sequence_numbers_strictly_increase() {
        let store = DashboardStore::new();
        let a = store.begin_pass();
        let b = store.begin_pass();
        let c = store.begin_pass();
        assert!(a < b && b < c);
        assert!(a > 0);
    }

    #[test]
    fn older_pass_cannot_overwrite_newer() {
        let store = DashboardStore::new();
        let older = store.begin_pass();
        let newer = store.begin_pass();

        assert_eq!(
            store.apply_summaries(newer, summaries_with_leads(20)),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.apply_summaries(older, summaries_with_leads(10)),
            ApplyOutcome::StaleDiscarded {
                seq: older,
                latest: newer
            }
        );

        let state = store.snapshot();
        assert_eq!(state.summaries.leads.total, 20);
        assert_eq!(state.summaries_seq, newer);
    }

    #[test]
    fn sections_are_guarded_independently() {
        let store = DashboardStore::new();
        let slow = store.begin_pass();
        let fast = store.begin_pass();

        assert!(store.apply_summaries(fast, summaries_with_leads(5)).is_applied());
        // The charts section has not seen `fast`, so an earlier charts pass still lands.
        assert!(store.apply_charts(slow, ChartsReport::default()).is_applied());

        let state = store.snapshot();
        assert_eq!(state.charts_seq, slow);
        assert_eq!(state.summaries_seq, fast);
        assert!(state.is_loaded());
    }

    #[test]
    fn same_sequence_is_not_applied_twice() {
        let store = DashboardStore::new();
        let seq = store.begin_pass();
        assert!(store.apply_charts(seq, ChartsReport::default()).is_applied());
        assert!(!store.apply_charts(seq, ChartsReport::default()).is_applied());
    }

    #[tokio::test]
    async fn subscribers_see_applied_state_only() {
        let store = DashboardStore::new();
        let mut stream = store.subscribe();

        let older = store.begin_pass();
        let newer = store.begin_pass();
        store.apply_summaries(newer, summaries_with_leads(7));
        store.apply_summaries(older, summaries_with_leads(3));

        let state = stream.changed().await;
        assert_eq!(state.map(|s| s.summaries.leads.total), Some(7));
        assert_eq!(stream.latest().summaries.leads.total, 7);
    }

    #[test]
    fn full_pass_is_published_in_one_step() {
        let store = DashboardStore::new();
        let reader = store.subscribe();
        let torn = Arc::new(AtomicU64::new(0));
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let watcher = {
            let torn = torn.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let state = reader.latest();
                    if state.summaries_seq != state.charts_seq {
                        torn.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        };

        for _ in 0..20_000 {
            let seq = store.begin_pass();
            let (summaries, charts) = store.apply_pass(seq, PassReport::default());
            assert!(summaries.is_applied() && charts.is_applied());
        }
        done.store(true, Ordering::Relaxed);
        watcher.join().unwrap_or_else(|_| panic!("reader thread panicked"));

        assert_eq!(torn.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn full_pass_still_fills_a_section_only_the_other_guard_rejects() {
        let store = DashboardStore::new();
        let pass = store.begin_pass();
        let fast = store.begin_pass();
        assert!(store.apply_summaries(fast, summaries_with_leads(8)).is_applied());

        let report = PassReport {
            summaries: summaries_with_leads(1),
            charts: ChartsReport::default(),
        };
        let (summaries, charts) = store.apply_pass(pass, report);

        assert_eq!(
            summaries,
            ApplyOutcome::StaleDiscarded {
                seq: pass,
                latest: fast
            }
        );
        assert!(charts.is_applied());
        let state = store.snapshot();
        assert_eq!(state.summaries.leads.total, 8);
        assert_eq!(state.charts_seq, pass);
    }
}
