//! Aggregate state of the current search.
//!
//! [`StateStore`] owns the current [`Query`] plus the loading flag, the last
//! user-facing error and the session id. It is an explicitly constructed
//! handle: clone it into whatever needs to read or mutate the state. Changes
//! are published through a `tokio::sync::watch` channel, so observers can
//! `subscribe()` and await updates instead of polling.
//!
//! The query is held behind an `Arc` and every mutation swaps in a new one.
//! A reader holding an old snapshot never sees a half-applied offer, and
//! `Arc::ptr_eq` is enough to tell whether anything changed.

pub mod search;

use crate::models::{Offer, Query, StreamRecord};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

pub use search::{SearchController, SearchError, StreamOutcome};

/// Snapshot of everything the store tracks
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub query: Option<Arc<Query>>,
    pub loading: bool,
    pub error: Option<String>,
    pub session_id: String,
}

impl StoreState {
    pub fn offer_count(&self) -> usize {
        self.query.as_ref().map_or(0, |q| q.offers.len())
    }

    pub fn has_offers(&self) -> bool {
        self.offer_count() > 0
    }
}

/// Shared handle to the search state
#[derive(Debug, Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<StoreState>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create a store with a freshly generated session id
    pub fn new() -> Self {
        Self::with_session_id(generate_session_id())
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        let state = StoreState {
            session_id: session_id.into(),
            ..Default::default()
        };
        let (tx, _) = watch::channel(state);
        Self { tx: Arc::new(tx) }
    }

    /// Receive a notification after every change
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> StoreState {
        self.tx.borrow().clone()
    }

    pub fn query(&self) -> Option<Arc<Query>> {
        self.tx.borrow().query.clone()
    }

    pub fn session_id(&self) -> String {
        self.tx.borrow().session_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.tx.borrow().error.clone()
    }

    pub fn offer_count(&self) -> usize {
        self.tx.borrow().offer_count()
    }

    pub fn has_offers(&self) -> bool {
        self.tx.borrow().has_offers()
    }

    pub fn set_session_id(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.tx.send_if_modified(|state| {
            if state.session_id == session_id {
                return false;
            }
            state.session_id = session_id;
            true
        });
    }

    /// Replace the current query wholesale
    pub fn set_query(&self, query: Query) {
        self.tx.send_modify(|state| replace_query(state, query));
    }

    /// Upsert an offer into the current query by its hash.
    /// Without a current query the offer is dropped.
    pub fn add_offer(&self, offer: Offer) {
        self.tx.send_if_modified(|state| {
            let Some(current) = &state.query else {
                warn!("No current query to add offer {} to", offer.offer_hash);
                return false;
            };

            let mut next = Query::clone(current);
            if next.offers.upsert(offer) {
                debug!("Offer updated in query {}", next.address_hash);
            }
            state.query = Some(Arc::new(next));
            true
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.tx.send_if_modified(|state| {
            let changed = state.error != error;
            state.error = error;
            changed
        });
    }

    /// Apply one decoded stream record
    pub fn handle_streamed_record(&self, record: StreamRecord) {
        match record {
            // Query and session id change in one notification
            StreamRecord::Query(query) => self.tx.send_modify(|state| {
                if !query.session_id.is_empty() {
                    state.session_id = query.session_id.clone();
                }
                replace_query(state, query);
            }),
            StreamRecord::Offer(offer) => self.add_offer(offer),
        }
    }

    /// Clear query, loading and error. The session id is kept so the next
    /// search and share calls still carry one.
    pub fn reset_state(&self) {
        self.tx.send_modify(|state| {
            state.query = None;
            state.loading = false;
            state.error = None;
        });
    }
}

fn replace_query(state: &mut StoreState, query: Query) {
    if let Some(previous) = &state.query {
        if !previous.offers.is_empty() {
            warn!(
                "Replacing query {} and discarding {} accumulated offers",
                previous.address_hash,
                previous.offers.len()
            );
        }
    }
    state.query = Some(Arc::new(query));
}

/// Two base-36 segments of random digits
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let mut segment = || {
        let mut n: u64 = rng.gen();
        let mut digits = Vec::with_capacity(13);
        while digits.len() < 13 {
            digits.push(std::char::from_digit((n % 36) as u32, 36).unwrap_or('0'));
            n /= 36;
        }
        digits.into_iter().collect::<String>()
    };
    let first = segment();
    let second = segment();
    format!("{first}{second}")
}
