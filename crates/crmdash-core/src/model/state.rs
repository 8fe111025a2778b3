use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chart::ChartSeries;
use super::source::Source;
use super::summary::EntitySummary;
use crate::metrics::classify::{COLLEGES, LEADS, TRAINERS, USERS};

/// Banner shown when at least one source failed in the published state.
pub const PARTIAL_FAILURE_BANNER: &str = "Some data could not be loaded";

// ── Sections ─────────────────────────────────────────────────────────

/// Per-entity summaries, refreshed by the "fast metrics" task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summaries {
    pub leads: EntitySummary,
    pub users: EntitySummary,
    pub colleges: EntitySummary,
    pub trainers: EntitySummary,
    pub blogs: EntitySummary,
    pub videos: EntitySummary,
    pub courses: EntitySummary,
}

impl Default for Summaries {
    fn default() -> Self {
        Self {
            leads: EntitySummary::unavailable(LEADS.categories()),
            users: EntitySummary::unavailable(USERS.categories()),
            colleges: EntitySummary::unavailable(COLLEGES.categories()),
            trainers: EntitySummary::unavailable(TRAINERS.categories()),
            blogs: EntitySummary::default(),
            videos: EntitySummary::default(),
            courses: EntitySummary::default(),
        }
    }
}

impl Summaries {
    /// Current totals feeding the CRM chart, in series order.
    pub fn crm_totals(&self) -> [(&'static str, u64); 4] {
        [
            ("leads", self.leads.total),
            ("users", self.users.total),
            ("colleges", self.colleges.total),
            ("trainers", self.trainers.total),
        ]
    }

    /// Current totals feeding the content chart, in series order.
    pub fn content_totals(&self) -> [(&'static str, u64); 3] {
        [
            ("blogs", self.blogs.total),
            ("videos", self.videos.total),
            ("courses", self.courses.total),
        ]
    }

    /// Named entries for rendering, in display order.
    pub fn entries(&self) -> [(Source, &EntitySummary); 7] {
        [
            (Source::Leads, &self.leads),
            (Source::Users, &self.users),
            (Source::Colleges, &self.colleges),
            (Source::Trainers, &self.trainers),
            (Source::Blogs, &self.blogs),
            (Source::Videos, &self.videos),
            (Source::Courses, &self.courses),
        ]
    }
}

/// Chart series, refreshed by the "slow metrics" task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Charts {
    /// Leads / users / colleges / trainers over time.
    pub crm: ChartSeries,
    /// Blogs / videos / courses over time.
    pub content: ChartSeries,
}

// ── Warnings ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// The backend rejected the bearer token.
    Unauthorized { reason: String },
    /// No response within the request timeout.
    TimedOut,
    /// Unreachable, non-2xx, or `success: false`.
    Unavailable { reason: String },
    /// A consumed field was missing or wrong-typed.
    Malformed { field: String },
    /// No pagination total; the page length was used and may undercount.
    DegradedCount { page_len: u64 },
    /// Records whose fields had the wrong type; counted in no category.
    RejectedRecords { count: u64, field: String },
}

/// A non-fatal problem with one source, attached to the published state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceWarning {
    pub source: Source,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl SourceWarning {
    pub fn degraded_count(source: Source, page_len: u64) -> Self {
        Self {
            source,
            kind: WarningKind::DegradedCount { page_len },
        }
    }

    /// `count` records were rejected; `field` names the first offender.
    pub fn rejected_records(source: Source, count: u64, field: String) -> Self {
        Self {
            source,
            kind: WarningKind::RejectedRecords { count, field },
        }
    }

    /// Whether this warning means data failed to load (vs. a count caveat).
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            WarningKind::Unauthorized { .. }
                | WarningKind::TimedOut
                | WarningKind::Unavailable { .. }
                | WarningKind::Malformed { .. }
        )
    }
}

impl std::fmt::Display for SourceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            WarningKind::Unauthorized { reason } | WarningKind::Unavailable { reason } => {
                write!(f, "{}: {reason}", self.source)
            }
            WarningKind::TimedOut => write!(f, "{}: request timed out", self.source),
            WarningKind::Malformed { field } => {
                write!(f, "{}: malformed response (field `{field}`)", self.source)
            }
            WarningKind::DegradedCount { page_len } => write!(
                f,
                "{}: no pagination total, counted {page_len} records on the page",
                self.source
            ),
            WarningKind::RejectedRecords { count, field } => write!(
                f,
                "{}: {count} record(s) with invalid fields left uncategorized (first: `{field}`)",
                self.source
            ),
        }
    }
}

// ── DashboardState ───────────────────────────────────────────────────

/// Everything a dashboard renders, published as one value.
///
/// Each section remembers the sequence number of the pass that produced it;
/// the store uses these to discard results from older passes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardState {
    pub summaries: Summaries,
    pub charts: Charts,
    pub summary_warnings: Vec<SourceWarning>,
    pub chart_warnings: Vec<SourceWarning>,
    pub summaries_seq: u64,
    pub charts_seq: u64,
    pub summaries_updated_at: Option<DateTime<Utc>>,
    pub charts_updated_at: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// All warnings across both sections.
    pub fn warnings(&self) -> impl Iterator<Item = &SourceWarning> {
        self.summary_warnings.iter().chain(&self.chart_warnings)
    }

    /// `true` if at least one source failed in the currently published data.
    pub fn has_failures(&self) -> bool {
        self.warnings().any(SourceWarning::is_failure)
    }

    /// The non-blocking banner text, when one should be shown.
    pub fn banner(&self) -> Option<&'static str> {
        self.has_failures().then_some(PARTIAL_FAILURE_BANNER)
    }

    /// `true` when no entity summary could be loaded from any source.
    pub fn all_sources_failed(&self) -> bool {
        self.summaries_seq > 0
            && self
                .summaries
                .entries()
                .iter()
                .all(|(_, summary)| !summary.is_available())
    }

    /// `true` if any source rejected the bearer token.
    pub fn auth_rejected(&self) -> bool {
        self.warnings()
            .any(|w| matches!(w.kind, WarningKind::Unauthorized { .. }))
    }

    /// `true` if every failed source timed out.
    pub fn all_failures_timed_out(&self) -> bool {
        let mut failures = self.warnings().filter(|w| w.is_failure()).peekable();
        failures.peek().is_some() && failures.all(|w| w.kind == WarningKind::TimedOut)
    }

    /// `true` once both sections have been populated by at least one pass.
    pub fn is_loaded(&self) -> bool {
        self.summaries_seq > 0 && self.charts_seq > 0
    }
}
