// ── Reactive dashboard stream ──
//
// Subscription type for consuming published state from the DashboardStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::DashboardState;

/// A subscription to the published dashboard state.
///
/// Provides both point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct DashboardStream {
    current: Arc<DashboardState>,
    receiver: watch::Receiver<Arc<DashboardState>>,
}

impl DashboardStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<DashboardState>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<DashboardState> {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> Arc<DashboardState> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published state.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<DashboardState>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    ///
    /// The stream yields the current state first, then every change.
    pub fn into_stream(self) -> DashboardWatchStream {
        DashboardWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct DashboardWatchStream {
    inner: WatchStream<Arc<DashboardState>>,
}

impl Stream for DashboardWatchStream {
    type Item = Arc<DashboardState>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
