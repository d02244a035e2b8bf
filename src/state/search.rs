use crate::api::{ApiError, ApiResult, OfferApi, RecordStream, SearchParams};
use crate::models::Address;
use crate::state::StateStore;
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const SEARCH_FAILED_MESSAGE: &str = "Failed to fetch offers. Please try again.";
pub const SHARED_FAILED_MESSAGE: &str = "Failed to fetch shared offers. Please try again.";

/// Reasons a search is refused before any request is made
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("No session id available")]
    MissingSession,

    #[error("Address is incomplete")]
    IncompleteAddress,

    #[error("Share id is empty")]
    EmptyShareId,
}

/// How a stream subscription ended
#[derive(Debug)]
pub enum StreamOutcome {
    Completed { records: usize },
    Failed(ApiError),
    Cancelled,
}

impl StreamOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StreamOutcome::Completed { .. })
    }
}

struct ActiveStream {
    cancel: CancellationToken,
    task: JoinHandle<StreamOutcome>,
}

/// Runs at most one offer stream at a time and feeds it into a [`StateStore`].
///
/// Starting a new search or shared load cancels the previous stream and waits
/// for it to stop before the store is reset, so late records of an abandoned
/// search can never reach the new query.
pub struct SearchController {
    api: Arc<dyn OfferApi>,
    store: StateStore,
    active: Option<ActiveStream>,
}

impl SearchController {
    pub fn new(api: Arc<dyn OfferApi>, store: StateStore) -> Self {
        Self {
            api,
            store,
            active: None,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|a| !a.task.is_finished())
    }

    /// Start streaming offers for an address
    pub async fn start_search(&mut self, address: Address) -> Result<(), SearchError> {
        let session_id = self.store.session_id();
        if session_id.is_empty() {
            return Err(SearchError::MissingSession);
        }
        if !address.is_complete() {
            return Err(SearchError::IncompleteAddress);
        }

        let params = SearchParams::new(address.trimmed(), session_id);
        let api = Arc::clone(&self.api);
        let open: BoxFuture<'static, ApiResult<RecordStream>> =
            Box::pin(async move { api.search_offers(&params).await });

        self.begin(open, SEARCH_FAILED_MESSAGE).await;
        Ok(())
    }

    /// Start streaming a previously shared query
    pub async fn load_shared(&mut self, share_id: &str) -> Result<(), SearchError> {
        let share_id = share_id.trim().to_string();
        if share_id.is_empty() {
            return Err(SearchError::EmptyShareId);
        }

        let api = Arc::clone(&self.api);
        let open: BoxFuture<'static, ApiResult<RecordStream>> =
            Box::pin(async move { api.shared_offers(&share_id).await });

        self.begin(open, SHARED_FAILED_MESSAGE).await;
        Ok(())
    }

    /// Stop the active stream, e.g. when its results are no longer shown.
    /// Offers already applied stay in the store.
    pub async fn cancel(&mut self) {
        if self.stop_active().await.is_some() {
            self.store.set_loading(false);
        }
    }

    /// Wait for the active stream to end on its own
    pub async fn wait(&mut self) -> Option<StreamOutcome> {
        let active = self.active.take()?;
        Some(join(active.task).await)
    }

    async fn stop_active(&mut self) -> Option<StreamOutcome> {
        let active = self.active.take()?;
        active.cancel.cancel();
        let outcome = join(active.task).await;
        debug!("Previous stream stopped: {:?}", outcome);
        Some(outcome)
    }

    async fn begin(
        &mut self,
        open: BoxFuture<'static, ApiResult<RecordStream>>,
        failure_message: &'static str,
    ) {
        self.stop_active().await;

        self.store.reset_state();
        self.store.set_loading(true);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(drive(
            open,
            self.store.clone(),
            cancel.clone(),
            failure_message,
        ));
        self.active = Some(ActiveStream { cancel, task });
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

async fn join(task: JoinHandle<StreamOutcome>) -> StreamOutcome {
    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Stream task ended abnormally: {}", e);
            StreamOutcome::Cancelled
        }
    }
}

/// Apply records in arrival order until the stream ends, fails or is cancelled
async fn drive(
    open: BoxFuture<'static, ApiResult<RecordStream>>,
    store: StateStore,
    cancel: CancellationToken,
    failure_message: &'static str,
) -> StreamOutcome {
    let fail = |e: ApiError| {
        error!("Offer stream failed: {}", e);
        store.set_error(Some(failure_message.to_string()));
        store.set_loading(false);
        StreamOutcome::Failed(e)
    };

    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return StreamOutcome::Cancelled,
        opened = open => match opened {
            Ok(stream) => stream,
            Err(e) => return fail(e),
        },
    };

    let mut records = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamOutcome::Cancelled,
            next = stream.next() => match next {
                Some(Ok(record)) => {
                    records += 1;
                    store.handle_streamed_record(record);
                }
                Some(Err(e)) => return fail(e),
                None => {
                    info!("Stream completed after {} records", records);
                    store.set_loading(false);
                    return StreamOutcome::Completed { records };
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ShareRequest;
    use crate::models::fixtures::{offer, query};
    use crate::models::StreamRecord;
    use async_trait::async_trait;
    use futures_util::stream;
    use std::sync::Mutex;

    /// Serves canned record lists; `pending` keeps a stream open forever after its records
    #[derive(Default)]
    struct FakeApi {
        searches: Mutex<Vec<Vec<ApiResult<StreamRecord>>>>,
        pending: bool,
        seen_sessions: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn with(responses: Vec<Vec<ApiResult<StreamRecord>>>) -> Self {
            Self {
                searches: Mutex::new(responses),
                ..Default::default()
            }
        }

        fn next_stream(&self) -> RecordStream {
            let records = self.searches.lock().unwrap().remove(0);
            if self.pending {
                stream::iter(records).chain(stream::pending()).boxed()
            } else {
                stream::iter(records).boxed()
            }
        }
    }

    #[async_trait]
    impl OfferApi for FakeApi {
        async fn search_offers(&self, params: &SearchParams) -> ApiResult<RecordStream> {
            self.seen_sessions.lock().unwrap().push(params.session_id.clone());
            Ok(self.next_stream())
        }

        async fn share_offers(&self, _request: &ShareRequest) -> ApiResult<String> {
            Err(ApiError::MissingShareId)
        }

        async fn shared_offers(&self, share_id: &str) -> ApiResult<RecordStream> {
            if share_id == "missing" {
                return Err(ApiError::MissingShareId);
            }
            Ok(self.next_stream())
        }
    }

    fn address() -> Address {
        Address::new("Main St", "1", "Berlin", "10115")
    }

    fn scenario() -> Vec<ApiResult<StreamRecord>> {
        vec![
            Ok(StreamRecord::Query(query("abc"))),
            Ok(StreamRecord::Offer(offer("x1", "ByteMe", 100, 2999))),
            Ok(StreamRecord::Offer(offer("x2", "WebWunder", 50, 1999))),
        ]
    }

    #[tokio::test]
    async fn completed_search_fills_the_store() {
        let api = Arc::new(FakeApi::with(vec![scenario()]));
        let store = StateStore::with_session_id("local");
        let mut controller = SearchController::new(api.clone(), store.clone());

        controller.start_search(address()).await.unwrap();
        assert!(store.is_loading());

        let outcome = controller.wait().await.unwrap();
        assert!(matches!(outcome, StreamOutcome::Completed { records: 3 }));
        assert_eq!(store.offer_count(), 2);
        assert!(!store.is_loading());
        assert!(store.error().is_none());
        assert_eq!(store.session_id(), "abc");
        assert_eq!(api.seen_sessions.lock().unwrap().as_slice(), ["local"]);
    }

    #[tokio::test]
    async fn failure_keeps_applied_offers() {
        let mut records = scenario();
        records.truncate(2);
        records.push(Err(ApiError::MissingShareId));
        let api = Arc::new(FakeApi::with(vec![records]));
        let store = StateStore::with_session_id("abc");
        let mut controller = SearchController::new(api, store.clone());

        controller.start_search(address()).await.unwrap();
        let outcome = controller.wait().await.unwrap();

        assert!(matches!(outcome, StreamOutcome::Failed(_)));
        assert_eq!(store.offer_count(), 1);
        assert!(!store.is_loading());
        assert_eq!(store.error().as_deref(), Some(SEARCH_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn failed_shared_load_sets_its_own_message() {
        let api = Arc::new(FakeApi::default());
        let store = StateStore::with_session_id("abc");
        let mut controller = SearchController::new(api, store.clone());

        controller.load_shared("missing").await.unwrap();
        let outcome = controller.wait().await.unwrap();

        assert!(matches!(outcome, StreamOutcome::Failed(ApiError::MissingShareId)));
        assert_eq!(store.error().as_deref(), Some(SHARED_FAILED_MESSAGE));
        assert!(store.query().is_none());
    }

    #[tokio::test]
    async fn new_search_cancels_the_previous_stream() {
        let mut second = scenario();
        second[0] = Ok(StreamRecord::Query({
            let mut q = query("abc");
            q.address_hash = "h2".to_string();
            q
        }));
        second.truncate(2);

        let api = Arc::new(FakeApi {
            pending: true,
            ..FakeApi::with(vec![scenario(), second])
        });
        let store = StateStore::with_session_id("abc");
        let mut controller = SearchController::new(api, store.clone());

        controller.start_search(address()).await.unwrap();
        let mut rx = store.subscribe();
        while rx.borrow_and_update().offer_count() < 2 {
            rx.changed().await.unwrap();
        }
        assert!(controller.is_active());

        controller.start_search(address()).await.unwrap();
        while rx.borrow_and_update().offer_count() < 1 {
            rx.changed().await.unwrap();
        }

        let query = store.query().unwrap();
        assert_eq!(query.address_hash, "h2");
        assert_eq!(query.offers.len(), 1);
        assert!(store.is_loading());

        controller.cancel().await;
        assert!(!store.is_loading());
        assert!(!controller.is_active());
        assert_eq!(store.offer_count(), 1);
    }

    #[tokio::test]
    async fn refuses_without_session_or_complete_address() {
        let api = Arc::new(FakeApi::default());
        let mut controller = SearchController::new(api.clone(), StateStore::with_session_id(""));
        assert_eq!(
            controller.start_search(address()).await,
            Err(SearchError::MissingSession)
        );

        let mut controller = SearchController::new(api, StateStore::with_session_id("abc"));
        assert_eq!(
            controller.start_search(Address::new("Main St", "", "Berlin", "10115")).await,
            Err(SearchError::IncompleteAddress)
        );
        assert_eq!(controller.load_shared("  ").await, Err(SearchError::EmptyShareId));
        assert!(controller.wait().await.is_none());
    }
}
