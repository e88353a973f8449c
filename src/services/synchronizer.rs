//! Debounced query synchronizer
//!
//! Bursts of sort/filter changes collapse into one query that is issued only
//! after the state has been quiet for the quiescence interval. Each issued
//! request gets the next sequence number; the grid uses it to drop responses
//! that arrive after a newer one has already been applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::data::query_state::QueryState;
use crate::error::GridResult;
use crate::services::gateway::{fetch, QueryGateway, QueryResponse};
use crate::utils::deferred::DeferredTask;

/// Default quiet period before a query is issued
pub const DEFAULT_QUIESCENCE_MS: u64 = 200;

/// Completion of one issued request
#[derive(Debug)]
pub struct SyncEvent {
    /// Issuance order, starting at 1
    pub seq: u64,
    /// The criteria the request was issued with
    pub query: QueryState,
    pub outcome: GridResult<QueryResponse>,
}

pub struct QuerySynchronizer {
    gateway: Arc<dyn QueryGateway>,
    quiescence: Duration,
    timer: DeferredTask,
    issued: Arc<AtomicU64>,
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl QuerySynchronizer {
    /// Create a synchronizer and the receiving end of its completion channel
    pub fn new(
        gateway: Arc<dyn QueryGateway>,
        quiescence: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let synchronizer = Self {
            gateway,
            quiescence,
            timer: DeferredTask::new(),
            issued: Arc::new(AtomicU64::new(0)),
            events,
        };
        (synchronizer, receiver)
    }

    /// Restart the quiet period with `state` as the criteria to query.
    /// A timer that has not fired yet is discarded without a request.
    pub fn notify(&mut self, state: QueryState) {
        if self.timer.cancel() {
            trace!(target: "sync", "Superseded pending query");
        }

        let gateway = self.gateway.clone();
        let issued = self.issued.clone();
        let events = self.events.clone();
        self.timer.schedule(self.quiescence, async move {
            Self::issue(gateway, issued, events, state);
        });
    }

    /// Skip the quiet period: cancel any pending timer and query now.
    /// Returns the sequence number of the issued request.
    pub fn request_now(&mut self, state: QueryState) -> u64 {
        self.timer.cancel();
        Self::issue(
            self.gateway.clone(),
            self.issued.clone(),
            self.events.clone(),
            state,
        )
    }

    /// Whether a debounce timer is still running
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Sequence number of the most recently issued request (0 if none)
    pub fn last_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn quiescence(&self) -> Duration {
        self.quiescence
    }

    /// Issue a request on its own task. The request task is detached from
    /// the debounce timer, so cancelling a later timer never cancels an
    /// in-flight request.
    fn issue(
        gateway: Arc<dyn QueryGateway>,
        issued: Arc<AtomicU64>,
        events: mpsc::UnboundedSender<SyncEvent>,
        query: QueryState,
    ) -> u64 {
        let seq = issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: "sync", "Issuing query #{}: {}", seq, query);

        tokio::spawn(async move {
            let outcome = fetch(gateway.as_ref(), &query).await;
            trace!(target: "sync", "Query #{} completed (ok={})", seq, outcome.is_ok());
            // The receiver is gone only when the grid was torn down
            let _ = events.send(SyncEvent {
                seq,
                query,
                outcome,
            });
        });
        seq
    }
}
