// ── Runtime dashboard configuration ──
//
// These types describe *where* the sources live and *how often* to poll
// them. They carry the bearer token but never touch disk: the CLI builds a
// `DashboardConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::metrics::series::DEFAULT_SERIES_LEN;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (staging backends with self-signed certs).
    DangerAcceptInvalid,
}

/// Endpoint paths, relative to the backend base URL.
///
/// The stats and chart-history endpoints are optional: an empty string
/// disables the source and the aggregator goes straight to its fallback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub leads: String,
    pub users: String,
    pub colleges: String,
    pub trainers: String,
    pub blogs: String,
    pub videos: String,
    pub courses: String,
    pub crm_stats: String,
    pub crm_chart: String,
    pub cms_chart: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            leads: "/api/leads".into(),
            users: "/api/users".into(),
            colleges: "/api/colleges".into(),
            trainers: "/api/trainers".into(),
            blogs: "/api/blogs".into(),
            videos: "/api/videos".into(),
            courses: "/api/courses".into(),
            crm_stats: "/api/crm/stats".into(),
            crm_chart: "/api/crm/chart-data".into(),
            cms_chart: "/api/cms/analytics/chart".into(),
        }
    }
}

impl Endpoints {
    /// `None` when an optional endpoint is disabled.
    pub(crate) fn optional(path: &str) -> Option<&str> {
        let trimmed = path.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Configuration for one dashboard instance.
///
/// Built by the CLI, passed to [`Dashboard`](crate::Dashboard).
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend base URL (e.g., `https://crm.example.com`).
    pub base_url: Url,
    /// Bearer token issued by the external auth service.
    pub token: Option<SecretString>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Period of the "fast metrics" task (entity summaries). Zero disables it.
    pub fast_interval: Duration,
    /// Period of the "slow metrics" task (chart series). Zero disables it.
    pub slow_interval: Duration,
    /// `limit` requested from list endpoints; also the page the breakdown is classified over.
    pub page_limit: u32,
    /// Number of monthly points in a synthetic series.
    pub series_len: usize,
    pub endpoints: Endpoints,
}

impl DashboardConfig {
    pub const DEFAULT_FAST_INTERVAL: Duration = Duration::from_secs(10);
    pub const DEFAULT_SLOW_INTERVAL: Duration = Duration::from_secs(15);
    pub const DEFAULT_PAGE_LIMIT: u32 = 100;

    /// Defaults for everything except the backend URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            fast_interval: Self::DEFAULT_FAST_INTERVAL,
            slow_interval: Self::DEFAULT_SLOW_INTERVAL,
            page_limit: Self::DEFAULT_PAGE_LIMIT,
            series_len: DEFAULT_SERIES_LEN,
            endpoints: Endpoints::default(),
        }
    }
}
