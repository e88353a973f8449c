use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stock_grid::data::query_state::{QueryState, SortDirection, SortState};
use stock_grid::data::record::{ColumnKey, Record};
use stock_grid::error::{GridError, GridResult};
use stock_grid::services::gateway::QueryGateway;
use stock_grid::services::synchronizer::QuerySynchronizer;
use stock_grid::state::sort_filter::StateController;

const QUIESCENCE: Duration = Duration::from_millis(200);

/// Gateway that records every query and answers after a scripted delay
#[derive(Default)]
struct ScriptedGateway {
    calls: Mutex<Vec<QueryState>>,
    delays: Mutex<VecDeque<Duration>>,
}

impl ScriptedGateway {
    fn with_delays(delays: &[u64]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(delays.iter().map(|ms| Duration::from_millis(*ms)).collect()),
        }
    }

    fn calls(&self) -> Vec<QueryState> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryGateway for ScriptedGateway {
    async fn query_rows(&self, query: &QueryState) -> GridResult<Vec<Record>> {
        let delay = {
            self.calls.lock().unwrap().push(query.clone());
            self.delays.lock().unwrap().pop_front().unwrap_or_default()
        };
        tokio::time::sleep(delay).await;

        if query.filter.pattern(ColumnKey::Brand) == "FAIL" {
            return Err(GridError::ImportFailed("storage offline".into()));
        }
        Ok(vec![Record {
            id: 1,
            name: query.filter.pattern(ColumnKey::Name).to_string(),
            ..Record::default()
        }])
    }

    async fn column_sample(&self) -> GridResult<Record> {
        Ok(Record::default())
    }

    async fn total_count(&self) -> GridResult<usize> {
        Ok(1)
    }
}

fn filtered(name: &str) -> QueryState {
    let mut state = StateController::new();
    state.set_filter("name", name).unwrap();
    state.snapshot()
}

#[tokio::test(start_paused = true)]
async fn test_burst_collapses_into_one_query_with_last_state() {
    let gateway = Arc::new(ScriptedGateway::default());
    let (mut sync, mut events) = QuerySynchronizer::new(gateway.clone(), QUIESCENCE);

    sync.notify(filtered("a"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    sync.notify(filtered("ab"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    sync.notify(filtered("abc"));
    assert!(sync.is_pending());

    let event = events.recv().await.unwrap();
    assert_eq!(event.seq, 1);
    assert_eq!(event.query, filtered("abc"));
    assert_eq!(event.outcome.unwrap().rows[0].name, "abc");

    // Nothing else was issued
    assert!(tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .is_err());
    assert_eq!(gateway.calls(), vec![filtered("abc")]);
    assert_eq!(sync.last_issued(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_query_waits_for_quiet_period() {
    let gateway = Arc::new(ScriptedGateway::default());
    let (mut sync, _events) = QuerySynchronizer::new(gateway.clone(), QUIESCENCE);

    sync.notify(filtered("x"));
    tokio::time::sleep(Duration::from_millis(199)).await;
    assert!(gateway.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(gateway.calls().len(), 1);
    assert!(!sync.is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_newer_request_is_not_blocked_by_one_in_flight() {
    // First request takes 500ms, second 10ms
    let gateway = Arc::new(ScriptedGateway::with_delays(&[500, 10]));
    let (mut sync, mut events) = QuerySynchronizer::new(gateway.clone(), QUIESCENCE);

    sync.notify(filtered("slow"));
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(gateway.calls().len(), 1);

    // Scheduling again does not cancel the request already running
    sync.notify(filtered("fast"));

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert_eq!((first.seq, first.query), (2, filtered("fast")));
    assert_eq!((second.seq, second.query), (1, filtered("slow")));
}

#[tokio::test(start_paused = true)]
async fn test_request_now_skips_and_cancels_timer() {
    let gateway = Arc::new(ScriptedGateway::default());
    let (mut sync, mut events) = QuerySynchronizer::new(gateway.clone(), QUIESCENCE);

    sync.notify(filtered("pending"));
    let seq = sync.request_now(filtered("now"));
    assert_eq!(seq, 1);
    assert!(!sync.is_pending());

    let event = events.recv().await.unwrap();
    assert_eq!(event.query, filtered("now"));

    tokio::time::sleep(QUIESCENCE * 3).await;
    assert_eq!(gateway.calls(), vec![filtered("now")]);
}

#[tokio::test(start_paused = true)]
async fn test_failures_surface_as_query_failed() {
    let gateway = Arc::new(ScriptedGateway::default());
    let (mut sync, mut events) = QuerySynchronizer::new(gateway, QUIESCENCE);

    let mut state = StateController::new();
    state.set_filter("brand", "FAIL").unwrap();
    sync.request_now(state.snapshot());

    let event = events.recv().await.unwrap();
    assert_eq!(
        event.outcome,
        Err(GridError::QueryFailed("import failed: storage offline".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_sort_only_change_is_carried_through() {
    let gateway = Arc::new(ScriptedGateway::default());
    let (mut sync, mut events) = QuerySynchronizer::new(gateway, QUIESCENCE);

    let mut state = StateController::new();
    state.set_sort("price").unwrap();
    state.set_sort("price").unwrap();
    sync.notify(state.snapshot());

    let event = events.recv().await.unwrap();
    assert_eq!(
        event.query.sort,
        SortState::new(ColumnKey::Price, SortDirection::Descending)
    );
}
