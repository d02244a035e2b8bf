//! Client for an internet-offer comparison backend.
//!
//! An address search streams back newline-delimited JSON: one `query`
//! record followed by any number of `offer` records. This crate decodes that
//! stream ([`api`]), folds it into a shared state store ([`state`]) and
//! derives the filtered, sorted result list plus share-link handling
//! ([`view`]). [`route`] maps client paths onto those operations and
//! [`config`] holds the runtime settings.

pub mod api;
pub mod config;
pub mod models;
pub mod route;
pub mod state;
pub mod view;

pub use api::{ApiError, OfferApi, OfferClient};
pub use config::Settings;
pub use models::{Address, FilterOptions, Offer, Query, SortOption, StreamRecord};
pub use route::Route;
pub use state::{SearchController, StateStore, StreamOutcome};
pub use view::{ResultsView, ShareDialog};
