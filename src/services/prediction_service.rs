use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::predictor::PredictionSource;
use crate::models::prediction::GENERIC_FAILURE_MESSAGE;
use crate::models::{PredictionRequest, PredictionResult, RequestState};

/// Owns the lifecycle of the prediction request for one page.
///
/// Cloning is cheap and every clone observes the same state.
pub struct RequestCoordinator<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for RequestCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S> {
    source: S,
    state: watch::Sender<RequestState>,
    /// Generation of the most recent submit; only its completion may settle the state
    latest: AtomicU64,
}

/// Handle to a request started by [`RequestCoordinator::submit`]
pub struct Submission {
    pub generation: u64,
    pub handle: JoinHandle<()>,
}

impl Submission {
    /// Wait for the request task to finish, whether or not its result was applied
    pub async fn completed(self) {
        if let Err(e) = self.handle.await {
            warn!("Prediction request #{} ended abnormally: {}", self.generation, e);
        }
    }
}

impl<S: PredictionSource> RequestCoordinator<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            inner: Arc::new(Inner {
                source,
                state,
                latest: AtomicU64::new(0),
            }),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> RequestState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.inner.state.subscribe()
    }

    /// Generation of the most recently submitted request (0 before the first)
    #[cfg(test)]
    pub fn latest_generation(&self) -> u64 {
        self.inner.latest.load(Ordering::SeqCst)
    }

    /// Start a request for `ticker`.
    ///
    /// Returns immediately. The state is Loading before this returns, so no
    /// earlier result or error stays visible next to the new request. A second
    /// call does not cancel the first; the first's completion is simply ignored.
    pub fn submit(&self, ticker: &str) -> Submission {
        let request = PredictionRequest::new(ticker);
        let generation = self.begin(&request, false).unwrap_or_default();
        self.spawn(generation, request)
    }

    /// Start a request for `ticker` unless one is already loading.
    ///
    /// The Loading check and the transition happen under one write of the
    /// state, so two concurrent callers can never both start a request.
    pub fn try_submit(&self, ticker: &str) -> Option<Submission> {
        let request = PredictionRequest::new(ticker);
        match self.begin(&request, true) {
            Some(generation) => Some(self.spawn(generation, request)),
            None => {
                debug!("Refusing '{}': a request is already loading", request.ticker);
                None
            }
        }
    }

    /// Move to Loading and take the next generation, or return `None` when
    /// `only_if_idle` is set and a request is in flight
    fn begin(&self, request: &PredictionRequest, only_if_idle: bool) -> Option<u64> {
        let mut generation = None;
        self.inner.state.send_if_modified(|state| {
            if only_if_idle && state.is_loading() {
                return false;
            }
            generation = Some(self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1);
            *state = RequestState::Loading {
                ticker: request.ticker.clone(),
            };
            true
        });
        generation
    }

    fn spawn(&self, generation: u64, request: PredictionRequest) -> Submission {
        info!("Prediction request #{} started for '{}'", generation, request.ticker);

        let guard = LoadingGuard {
            inner: Arc::clone(&self.inner),
            generation,
            armed: true,
        };
        let handle = tokio::spawn(execute(guard, request));

        Submission { generation, handle }
    }

    /// Wait until the state leaves Loading and return it
    pub async fn wait_settled(&self) -> RequestState {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|state| !state.is_loading()).await.map(|state| state.clone());
        // The sender lives in `self`, so the channel cannot close while we wait
        settled.unwrap_or_else(|_| self.state())
    }
}

async fn execute<S: PredictionSource>(mut guard: LoadingGuard<S>, request: PredictionRequest) {
    let inner = Arc::clone(&guard.inner);
    let generation = guard.generation;

    let next = match inner.source.fetch(&request.ticker).await {
        Ok(response) => {
            let result = PredictionResult::from_response(&request, response);
            debug!(
                "Prediction request #{} for '{}' returned {} history points",
                generation,
                request.ticker,
                result.history.len()
            );
            RequestState::Succeeded(result)
        }
        Err(e) => {
            error!("Prediction request #{} for '{}' failed: {}", generation, request.ticker, e);
            RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        }
    };

    guard.armed = false;
    if !inner.settle(generation, next) {
        debug!(
            "Discarding stale response for request #{} ('{}'), latest is #{}",
            generation,
            request.ticker,
            inner.latest.load(Ordering::SeqCst)
        );
    }
}

impl<S> Inner<S> {
    /// Apply `next` only if `generation` is still the latest request
    fn settle(&self, generation: u64, next: RequestState) -> bool {
        self.state.send_if_modified(|state| {
            if self.latest.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            true
        })
    }
}

/// Leaves Loading if the request task is dropped before it settles
/// (aborted, runtime shutdown, or a panicking source).
struct LoadingGuard<S> {
    inner: Arc<Inner<S>>,
    generation: u64,
    armed: bool,
}

impl<S> Drop for LoadingGuard<S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Prediction request #{} dropped before completing", self.generation);
        self.inner.settle(
            self.generation,
            RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::predictor::{ApiError, PredictionResponse};
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type Reply = Result<PredictionResponse, ApiError>;

    /// Answers each ticker with whatever the test sends on its oneshot channel
    #[derive(Default)]
    struct ScriptedSource {
        pending: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn expect(&self, ticker: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().insert(ticker.to_string(), rx);
            tx
        }
    }

    impl PredictionSource for ScriptedSource {
        fn fetch(&self, ticker: &str) -> impl Future<Output = Reply> + Send {
            self.calls.lock().unwrap().push(ticker.to_string());
            let pending = self.pending.lock().unwrap().remove(ticker);
            async move {
                match pending {
                    Some(rx) => rx
                        .await
                        .unwrap_or_else(|_| Err(ApiError::Request("reply dropped".to_string()))),
                    None => Err(ApiError::Request("unexpected ticker".to_string())),
                }
            }
        }
    }

    struct PanickingSource;

    fn explode() -> ApiError {
        panic!("model exploded")
    }

    impl PredictionSource for PanickingSource {
        fn fetch(&self, _ticker: &str) -> impl Future<Output = Reply> + Send {
            async { Err::<PredictionResponse, ApiError>(explode()) }
        }
    }

    struct NeverSource;

    impl PredictionSource for NeverSource {
        fn fetch(&self, _ticker: &str) -> impl Future<Output = Reply> + Send {
            std::future::pending()
        }
    }

    fn response(prediction: Option<f64>, history: &[f64]) -> Reply {
        Ok(PredictionResponse {
            prediction,
            history: history.to_vec(),
        })
    }

    fn coordinator() -> (RequestCoordinator<Arc<ScriptedSource>>, Arc<ScriptedSource>) {
        let source = Arc::new(ScriptedSource::default());
        (RequestCoordinator::new(Arc::clone(&source)), source)
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let (coordinator, _) = coordinator();
        assert_eq!(coordinator.state(), RequestState::Idle);
        assert_eq!(coordinator.latest_generation(), 0);
    }

    #[tokio::test]
    async fn test_submit_normalizes_ticker() {
        let (coordinator, source) = coordinator();
        let tx = source.expect("AAPL");

        let submission = coordinator.submit("aapl");
        assert_eq!(
            coordinator.state(),
            RequestState::Loading {
                ticker: "AAPL".to_string()
            }
        );

        tx.send(response(None, &[1.0])).unwrap();
        submission.completed().await;

        assert_eq!(*source.calls.lock().unwrap(), vec!["AAPL".to_string()]);
    }

    #[tokio::test]
    async fn test_success_stores_result() {
        let (coordinator, source) = coordinator();
        let tx = source.expect("AAPL");

        coordinator.submit("AAPL");
        tx.send(response(None, &[100.0, 102.0, 101.0])).unwrap();
        let state = coordinator.wait_settled().await;

        let result = state.result().expect("succeeded");
        assert_eq!(result.ticker, "AAPL");
        assert_eq!(result.predicted_price, 200.0);
        assert_eq!(result.history, vec![100.0, 102.0, 101.0]);
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_missing_history_still_succeeds() {
        let (coordinator, source) = coordinator();
        let tx = source.expect("AAPL");

        coordinator.submit("AAPL");
        tx.send(Ok(PredictionResponse::from_json("{}").unwrap())).unwrap();
        let state = coordinator.wait_settled().await;

        let result = state.result().expect("succeeded");
        assert!(result.history.is_empty());
        assert_eq!(result.predicted_price, 200.0);
    }

    #[tokio::test]
    async fn test_failure_uses_generic_message() {
        let (coordinator, source) = coordinator();
        let tx = source.expect("AAPL");

        coordinator.submit("AAPL");
        tx.send(Err(ApiError::Status {
            code: 500,
            body: "Error: Cannot open CSV".to_string(),
        }))
        .unwrap();
        let state = coordinator.wait_settled().await;

        assert_eq!(state, RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string()));
        assert!(!state.is_loading());
        assert!(state.result().is_none());
    }

    #[tokio::test]
    async fn test_resubmit_clears_previous_result() {
        let (coordinator, source) = coordinator();
        let first = source.expect("AAPL");
        coordinator.submit("AAPL");
        first.send(response(Some(5.0), &[4.0])).unwrap();
        assert!(coordinator.wait_settled().await.result().is_some());

        let _second = source.expect("MSFT");
        coordinator.submit("MSFT");

        let state = coordinator.state();
        assert!(state.is_loading());
        assert!(state.result().is_none());
        assert!(state.error().is_none());
    }

    #[tokio::test]
    async fn test_resubmit_clears_previous_error() {
        let (coordinator, source) = coordinator();
        coordinator.submit("NOPE");
        assert!(coordinator.wait_settled().await.error().is_some());

        let _pending = source.expect("AAPL");
        coordinator.submit("AAPL");
        assert!(coordinator.state().error().is_none());
    }

    #[tokio::test]
    async fn test_late_response_from_superseded_request_is_discarded() {
        let (coordinator, source) = coordinator();
        let first = source.expect("AAPL");
        let second = source.expect("MSFT");

        let first_submission = coordinator.submit("AAPL");
        let second_submission = coordinator.submit("MSFT");
        assert_eq!(second_submission.generation, first_submission.generation + 1);

        second.send(response(Some(310.0), &[300.0])).unwrap();
        second_submission.completed().await;

        first.send(response(Some(190.0), &[180.0])).unwrap();
        first_submission.completed().await;

        let state = coordinator.state();
        let result = state.result().expect("succeeded");
        assert_eq!(result.ticker, "MSFT");
        assert_eq!(result.predicted_price, 310.0);
    }

    #[tokio::test]
    async fn test_superseded_request_does_not_end_loading() {
        let (coordinator, source) = coordinator();
        let first = source.expect("AAPL");
        let _second = source.expect("MSFT");

        let first_submission = coordinator.submit("AAPL");
        coordinator.submit("MSFT");

        first.send(response(None, &[1.0])).unwrap();
        first_submission.completed().await;

        assert_eq!(
            coordinator.state(),
            RequestState::Loading {
                ticker: "MSFT".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_panicking_source_leaves_loading() {
        let coordinator = RequestCoordinator::new(PanickingSource);

        let submission = coordinator.submit("AAPL");
        submission.completed().await;

        assert_eq!(
            coordinator.state(),
            RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_aborted_request_leaves_loading() {
        let coordinator = RequestCoordinator::new(NeverSource);

        let submission = coordinator.submit("AAPL");
        submission.handle.abort();
        let _ = submission.handle.await;

        assert_eq!(
            coordinator.state(),
            RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_try_submit_refuses_while_loading() {
        let (coordinator, source) = coordinator();
        let tx = source.expect("AAPL");

        let first = coordinator.try_submit("AAPL").expect("idle coordinator accepts");
        assert!(coordinator.try_submit("MSFT").is_none());
        assert_eq!(coordinator.latest_generation(), first.generation);
        assert_eq!(
            coordinator.state(),
            RequestState::Loading {
                ticker: "AAPL".to_string()
            }
        );

        tx.send(response(None, &[1.0])).unwrap();
        first.completed().await;
        assert_eq!(*source.calls.lock().unwrap(), vec!["AAPL".to_string()]);

        let _pending = source.expect("MSFT");
        assert!(coordinator.try_submit("MSFT").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_try_submit_starts_one_request() {
        let coordinator = RequestCoordinator::new(NeverSource);

        let attempts: Vec<_> = (0..16)
            .map(|i| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.try_submit(&format!("T{}", i)) })
            })
            .collect();

        let mut started = Vec::new();
        for attempt in attempts {
            if let Some(submission) = attempt.await.unwrap() {
                started.push(submission);
            }
        }

        assert_eq!(started.len(), 1);
        assert_eq!(coordinator.latest_generation(), 1);
        started[0].handle.abort();
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (coordinator, source) = coordinator();
        let observer = coordinator.clone();
        let tx = source.expect("AAPL");

        coordinator.submit("AAPL");
        assert!(observer.state().is_loading());

        tx.send(response(None, &[])).unwrap();
        assert!(observer.wait_settled().await.result().is_some());
    }
}
