// ── Metrics aggregation pass ──
//
// Fans out to every source endpoint concurrently and folds the responses
// into summaries and chart series. Each source is isolated: a failure
// degrades that source to its fallback and is reported as a warning, it
// never fails the pass or cancels sibling fetches.

use chrono::NaiveDate;
use crmdash_api::{
    ApiClient, ChartHistory, College, Lead, ListResponse, StatsResponse, Trainer, User,
};
use serde::de::IgnoredAny;
use tracing::{debug, info, warn};

use crate::config::{DashboardConfig, Endpoints};
use crate::error::SourceError;
use crate::metrics::classify::{COLLEGES, LEADS, StatusClassifier, StatusKey, TRAINERS, USERS};
use crate::metrics::reconcile::{reconcile_total, summarize};
use crate::metrics::series::build_chart_series;
use crate::metrics::stats::summary_from_stats;
use crate::model::{Charts, EntitySummary, Source, SourceWarning, Summaries, SummaryBasis};

type Fetched<T> = Result<T, SourceError>;

/// Optional sources: `None` when disabled or absent (404).
type OptionalFetch<T> = Option<Fetched<T>>;

// ── Reports ──────────────────────────────────────────────────────────

/// Output of a summaries pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummariesReport {
    pub summaries: Summaries,
    pub warnings: Vec<SourceWarning>,
}

/// Output of a charts pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartsReport {
    pub charts: Charts,
    pub warnings: Vec<SourceWarning>,
}

/// Output of a full pass: both sections from one consistent fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PassReport {
    pub summaries: SummariesReport,
    pub charts: ChartsReport,
}

// ── MetricsAggregator ────────────────────────────────────────────────

/// Fetches every source and derives the dashboard metrics.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    client: ApiClient,
    endpoints: Endpoints,
    page_limit: u32,
    series_len: usize,
    anchor: Option<NaiveDate>,
}

impl MetricsAggregator {
    pub fn new(client: ApiClient, config: &DashboardConfig) -> Self {
        Self {
            client,
            endpoints: config.endpoints.clone(),
            page_limit: config.page_limit,
            series_len: config.series_len,
            anchor: None,
        }
    }

    /// Pin the month synthetic series end on. Defaults to today (local time).
    pub fn with_anchor(mut self, anchor: NaiveDate) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn anchor(&self) -> NaiveDate {
        self.anchor.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    // ── Passes ───────────────────────────────────────────────────────

    /// Entity summaries: stats plus every list endpoint, concurrently.
    pub async fn summaries(&self) -> SummariesReport {
        let ep = &self.endpoints;
        let (stats, leads, users, colleges, trainers, blogs, videos, courses) = tokio::join!(
            self.fetch_stats(),
            self.fetch_list::<Lead>(Source::Leads, &ep.leads),
            self.fetch_list::<User>(Source::Users, &ep.users),
            self.fetch_list::<College>(Source::Colleges, &ep.colleges),
            self.fetch_list::<Trainer>(Source::Trainers, &ep.trainers),
            self.fetch_list::<IgnoredAny>(Source::Blogs, &ep.blogs),
            self.fetch_list::<IgnoredAny>(Source::Videos, &ep.videos),
            self.fetch_list::<IgnoredAny>(Source::Courses, &ep.courses),
        );

        let stats = match stats {
            Some(Ok(stats)) => Some(stats),
            Some(Err(err)) => {
                // Lists cover every category, so this is not a data loss.
                warn!(error = %err, "stats endpoint failed, using list endpoints");
                None
            }
            None => None,
        };
        let stats = stats.as_ref();

        let mut warnings = Vec::new();
        let summaries = Summaries {
            leads: entity_summary(Source::Leads, leads, &LEADS, stats, &mut warnings),
            users: entity_summary(Source::Users, users, &USERS, stats, &mut warnings),
            colleges: entity_summary(Source::Colleges, colleges, &COLLEGES, stats, &mut warnings),
            trainers: entity_summary(Source::Trainers, trainers, &TRAINERS, stats, &mut warnings),
            blogs: content_summary(Source::Blogs, blogs, &mut warnings),
            videos: content_summary(Source::Videos, videos, &mut warnings),
            courses: content_summary(Source::Courses, courses, &mut warnings),
        };

        debug!(
            leads = summaries.leads.total,
            users = summaries.users.total,
            colleges = summaries.colleges.total,
            trainers = summaries.trainers.total,
            warnings = warnings.len(),
            "summaries pass complete"
        );

        SummariesReport {
            summaries,
            warnings,
        }
    }

    /// Chart series, synthesizing from `current` when history is unusable.
    pub async fn charts(&self, current: &Summaries) -> ChartsReport {
        let (crm, cms) = self.fetch_histories().await;
        self.fold_charts(current, crm, cms)
    }

    /// Everything at once. Charts synthesize from the totals fetched here.
    pub async fn full(&self) -> PassReport {
        let (summaries, (crm, cms)) = tokio::join!(self.summaries(), self.fetch_histories());
        let charts = self.fold_charts(&summaries.summaries, crm, cms);

        let failed = summaries
            .warnings
            .iter()
            .chain(&charts.warnings)
            .filter(|w| w.is_failure())
            .count();
        if failed > 0 {
            info!(failed, "aggregation pass completed with failed sources");
        }

        PassReport { summaries, charts }
    }

    fn fold_charts(
        &self,
        current: &Summaries,
        crm: OptionalFetch<ChartHistory>,
        cms: OptionalFetch<ChartHistory>,
    ) -> ChartsReport {
        let anchor = self.anchor();
        let (crm, crm_warning) = build_chart_series(
            Source::CrmChart,
            &current.crm_totals(),
            crm,
            self.series_len,
            anchor,
        );
        let (content, content_warning) = build_chart_series(
            Source::CmsChart,
            &current.content_totals(),
            cms,
            self.series_len,
            anchor,
        );

        let warnings: Vec<SourceWarning> = crm_warning.into_iter().chain(content_warning).collect();
        for warning in &warnings {
            warn!(source = %warning.source, %warning, "chart history unusable, using synthetic series");
        }

        ChartsReport {
            charts: Charts { crm, content },
            warnings,
        }
    }

    // ── Fetchers ─────────────────────────────────────────────────────

    async fn fetch_list<T: serde::de::DeserializeOwned>(
        &self,
        source: Source,
        path: &str,
    ) -> Fetched<ListResponse<T>> {
        self.client
            .list(path, 1, self.page_limit)
            .await
            .map_err(|e| SourceError::from_api(source, &e))
    }

    async fn fetch_stats(&self) -> OptionalFetch<StatsResponse> {
        let path = Endpoints::optional(&self.endpoints.crm_stats)?;
        optional(Source::CrmStats, self.client.stats(path).await)
    }

    async fn fetch_histories(&self) -> (OptionalFetch<ChartHistory>, OptionalFetch<ChartHistory>) {
        tokio::join!(self.fetch_crm_history(), self.fetch_cms_history())
    }

    async fn fetch_crm_history(&self) -> OptionalFetch<ChartHistory> {
        let path = Endpoints::optional(&self.endpoints.crm_chart)?;
        optional(Source::CrmChart, self.client.crm_chart_history(path).await)
    }

    async fn fetch_cms_history(&self) -> OptionalFetch<ChartHistory> {
        let path = Endpoints::optional(&self.endpoints.cms_chart)?;
        optional(Source::CmsChart, self.client.cms_chart_history(path).await)
    }
}

// ── Folding helpers ──────────────────────────────────────────────────

/// A 404 on an optional endpoint means "not deployed here", not a failure.
fn optional<T>(source: Source, result: Result<T, crmdash_api::Error>) -> OptionalFetch<T> {
    match result {
        Ok(value) => Some(Ok(value)),
        Err(err) if source.is_optional() && err.is_not_found() => {
            debug!(%source, "optional endpoint not found, using fallback");
            None
        }
        Err(err) => Some(Err(SourceError::from_api(source, &err))),
    }
}

fn entity_summary<T: StatusKey>(
    source: Source,
    fetched: Fetched<ListResponse<T>>,
    classifier: &StatusClassifier,
    stats: Option<&StatsResponse>,
    warnings: &mut Vec<SourceWarning>,
) -> EntitySummary {
    if let Some(summary) = stats.and_then(|s| summary_from_stats(s, source.as_ref(), classifier)) {
        return summary;
    }

    match fetched {
        Ok(response) => {
            let summary = summarize(&response, classifier);
            if summary.basis == SummaryBasis::Degraded {
                debug!(%source, page_len = summary.total, "no pagination total, count may be low");
                warnings.push(SourceWarning::degraded_count(source, summary.total));
            }
            if let Some(first) = response.rejected.first() {
                let count = u64::try_from(response.rejected.len()).unwrap_or(u64::MAX);
                warnings.push(SourceWarning::rejected_records(source, count, first.field.clone()));
            }
            summary
        }
        Err(err) => {
            warn!(%source, error = %err, "source failed, using zero summary");
            warnings.push(err.into_warning());
            EntitySummary::unavailable(classifier.categories())
        }
    }
}

fn content_summary(
    source: Source,
    fetched: Fetched<ListResponse<IgnoredAny>>,
    warnings: &mut Vec<SourceWarning>,
) -> EntitySummary {
    match fetched {
        Ok(response) => {
            let reconciled = reconcile_total(&response);
            if reconciled.degraded {
                debug!(%source, page_len = reconciled.total, "no pagination total, count may be low");
                warnings.push(SourceWarning::degraded_count(source, reconciled.total));
                EntitySummary::total_only(reconciled.total, SummaryBasis::Degraded)
            } else {
                EntitySummary::total_only(reconciled.total, SummaryBasis::Exact)
            }
        }
        Err(err) => {
            warn!(%source, error = %err, "source failed, using zero total");
            warnings.push(err.into_warning());
            EntitySummary::default()
        }
    }
}
