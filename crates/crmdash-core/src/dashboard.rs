// ── Dashboard abstraction ──
//
// Polling lifecycle for one dashboard: an initial full pass, then a fast
// task refreshing entity summaries and a slow task refreshing charts.
// Results flow into the DashboardStore, which consumers observe.

use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crmdash_api::{ApiClient, TlsMode, TransportConfig};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::aggregator::MetricsAggregator;
use crate::config::{DashboardConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::DashboardState;
use crate::store::{ApplyOutcome, DashboardStore};
use crate::stream::DashboardStream;

/// What happened to the results of one on-demand pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub seq: u64,
    pub summaries: ApplyOutcome,
    pub charts: ApplyOutcome,
}

// ── Dashboard ────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<DashboardInner>`. Dropping the last handle
/// cancels the background tasks.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    aggregator: Arc<MetricsAggregator>,
    store: Arc<DashboardStore>,
    refresh_requested: Arc<Notify>,
    cancel: CancellationToken,
    running: AtomicBool,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    _cancel_on_drop: DropGuard,
}

impl Dashboard {
    /// Build the API client and aggregator. Does not fetch anything;
    /// call [`start()`](Self::start) or [`refresh()`](Self::refresh).
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let client = ApiClient::new(config.base_url.as_str(), &build_transport(&config))?;
        let aggregator = MetricsAggregator::new(client, &config);
        Ok(Self::with_aggregator(config, aggregator))
    }

    /// Use a pre-built aggregator (custom client, pinned anchor date).
    pub fn with_aggregator(config: DashboardConfig, aggregator: MetricsAggregator) -> Self {
        let cancel = CancellationToken::new();
        Self {
            inner: Arc::new(DashboardInner {
                config,
                aggregator: Arc::new(aggregator),
                store: Arc::new(DashboardStore::new()),
                refresh_requested: Arc::new(Notify::new()),
                _cancel_on_drop: cancel.clone().drop_guard(),
                cancel,
                running: AtomicBool::new(false),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.inner.store
    }

    /// Subscribe to published state.
    pub fn subscribe(&self) -> DashboardStream {
        self.inner.store.subscribe()
    }

    /// The currently published state.
    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.inner.store.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Run an initial full pass, then spawn the polling tasks.
    ///
    /// Calling `start()` on a running dashboard is a no-op. A stopped
    /// dashboard cannot be restarted; build a new one.
    pub async fn start(&self) -> Result<PassOutcome, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Config {
                message: "dashboard was stopped and cannot be restarted".into(),
            });
        }
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return Ok(self.current_outcome());
        }

        let outcome = self.refresh().await;

        let config = &self.inner.config;
        let mut handles = self.inner.task_handles.lock().await;

        handles.push(tokio::spawn(fast_metrics_task(
            Arc::clone(&self.inner.aggregator),
            Arc::clone(&self.inner.store),
            non_zero(config.fast_interval),
            Arc::clone(&self.inner.refresh_requested),
            self.inner.cancel.clone(),
        )));

        if let Some(period) = non_zero(config.slow_interval) {
            handles.push(tokio::spawn(slow_metrics_task(
                Arc::clone(&self.inner.aggregator),
                Arc::clone(&self.inner.store),
                period,
                self.inner.cancel.clone(),
            )));
        }

        info!(
            fast_secs = config.fast_interval.as_secs(),
            slow_secs = config.slow_interval.as_secs(),
            "dashboard polling started"
        );
        Ok(outcome)
    }

    /// Cancel and join the polling tasks.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.running.store(false, Ordering::Release);
        debug!("dashboard polling stopped");
    }

    /// Run a full pass now and publish it.
    pub async fn refresh(&self) -> PassOutcome {
        run_full_pass(&self.inner.aggregator, &self.inner.store).await
    }

    /// Ask the fast task to run a full pass as soon as possible.
    ///
    /// Does not wait for the pass. Repeated requests before the task wakes
    /// collapse into one pass.
    pub fn request_refresh(&self) {
        self.inner.refresh_requested.notify_one();
    }

    // ── One-shot convenience ─────────────────────────────────────────

    /// One full pass without background tasks. Optimized for the CLI.
    pub async fn oneshot(config: DashboardConfig) -> Result<Arc<DashboardState>, CoreError> {
        let dashboard = Self::new(config)?;
        dashboard.refresh().await;
        Ok(dashboard.snapshot())
    }

    fn current_outcome(&self) -> PassOutcome {
        let state = self.snapshot();
        PassOutcome {
            seq: state.summaries_seq.max(state.charts_seq),
            summaries: ApplyOutcome::Applied,
            charts: ApplyOutcome::Applied,
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically refresh entity summaries. Also serves refresh requests
/// with a full pass, even when the periodic refresh is disabled.
async fn fast_metrics_task(
    aggregator: Arc<MetricsAggregator>,
    store: Arc<DashboardStore>,
    period: Option<Duration>,
    refresh_requested: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut ticker = match period {
        Some(period) => Some(skip_first_tick(period).await),
        None => None,
    };

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = refresh_requested.notified() => {
                debug!("refresh requested");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = run_full_pass(&aggregator, &store) => {}
                }
                if let Some(ticker) = ticker.as_mut() {
                    ticker.reset();
                }
            }
            () = next_tick(ticker.as_mut()) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = run_summaries_pass(&aggregator, &store) => {}
                }
            }
        }
    }
}

/// Periodically refresh chart series.
async fn slow_metrics_task(
    aggregator: Arc<MetricsAggregator>,
    store: Arc<DashboardStore>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = skip_first_tick(period).await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = run_charts_pass(&aggregator, &store) => {}
                }
            }
        }
    }
}

async fn skip_first_tick(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick
    ticker
}

async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending().await,
    }
}

// ── Passes ───────────────────────────────────────────────────────────

async fn run_full_pass(aggregator: &MetricsAggregator, store: &DashboardStore) -> PassOutcome {
    let seq = store.begin_pass();
    let report = aggregator.full().await;
    let (summaries, charts) = store.apply_pass(seq, report);
    PassOutcome {
        seq,
        summaries,
        charts,
    }
}

async fn run_summaries_pass(aggregator: &MetricsAggregator, store: &DashboardStore) {
    let seq = store.begin_pass();
    let report = aggregator.summaries().await;
    store.apply_summaries(seq, report);
}

/// Synthesizes from the most recently applied summaries.
async fn run_charts_pass(aggregator: &MetricsAggregator, store: &DashboardStore) {
    let seq = store.begin_pass();
    let current = store.snapshot();
    let report = aggregator.charts(&current.summaries).await;
    store.apply_charts(seq, report);
}

// ── Helpers ──────────────────────────────────────────────────────────

fn non_zero(period: Duration) -> Option<Duration> {
    (!period.is_zero()).then_some(period)
}

/// Build a [`TransportConfig`] from the dashboard configuration.
fn build_transport(config: &DashboardConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        bearer_token: config.token.clone(),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
