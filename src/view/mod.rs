pub mod form;
pub mod share;

use crate::models::{
    active_filters, filter_offer, is_filter_empty, sort_offers, ActiveFilter, FilterKind,
    FilterOptions, Offer, Query, SortOption,
};
use crate::state::StateStore;
use std::collections::BTreeSet;
use std::sync::Arc;

pub use form::{AddressField, SearchForm};
pub use share::{Clipboard, ClipboardError, ShareDialog};

/// Filterable, sortable view over the store's current query.
///
/// The offer list and the dropdown domains are cached per query snapshot and
/// rebuilt only when [`sync`](Self::sync) sees a different `Arc<Query>`.
/// Filtering and sorting are applied on every read of
/// [`filtered_offers`](Self::filtered_offers).
#[derive(Debug, Default)]
pub struct ResultsView {
    filter: FilterOptions,
    sort: Option<&'static SortOption>,
    snapshot: Option<Arc<Query>>,
    offers: Vec<Offer>,
    providers: Vec<String>,
    connection_types: Vec<String>,
}

impl ResultsView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up the store's current query. Returns true when the cache was rebuilt.
    pub fn sync(&mut self, store: &StateStore) -> bool {
        self.sync_query(store.query().as_ref())
    }

    pub fn sync_query(&mut self, query: Option<&Arc<Query>>) -> bool {
        let unchanged = match (&self.snapshot, query) {
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }

        self.snapshot = query.cloned();
        self.offers = query.map(|q| q.offers.as_slice().to_vec()).unwrap_or_default();
        self.providers = distinct(self.offers.iter().map(|o| o.provider.as_str()));
        self.connection_types = distinct(self.offers.iter().map(|o| o.connection_type.as_str()));
        true
    }

    pub fn query(&self) -> Option<&Arc<Query>> {
        self.snapshot.as_ref()
    }

    /// Offers in arrival order, unfiltered
    pub fn offers(&self) -> &[Offer] {
        &self.offers
    }

    pub fn available_providers(&self) -> &[String] {
        &self.providers
    }

    pub fn available_connection_types(&self) -> &[String] {
        &self.connection_types
    }

    pub fn filter(&self) -> &FilterOptions {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterOptions) {
        self.filter = filter;
    }

    pub fn sort(&self) -> Option<&'static SortOption> {
        self.sort
    }

    pub fn set_sort(&mut self, sort: Option<&'static SortOption>) {
        self.sort = sort;
    }

    /// Offers passing the filter, in sort order when one is selected
    pub fn filtered_offers(&self) -> Vec<Offer> {
        let filtered: Vec<Offer> = self
            .offers
            .iter()
            .filter(|o| filter_offer(o, &self.filter))
            .cloned()
            .collect();

        match self.sort {
            Some(option) => sort_offers(&filtered, option),
            None => filtered,
        }
    }

    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        active_filters(&self.filter)
    }

    pub fn has_active_filters(&self) -> bool {
        !is_filter_empty(&self.filter)
    }

    pub fn remove_filter(&mut self, kind: FilterKind) {
        self.filter.clear(kind);
    }

    pub fn clear_filters(&mut self) {
        self.filter = FilterOptions::default();
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
