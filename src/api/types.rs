use crate::api::error::ApiResult;
use crate::models::{Address, FilterOptions, StreamRecord};
use futures_util::stream::BoxStream;
use serde::Deserialize;

/// Lazily decoded records of one response body, in arrival order.
/// Ends after the first error.
pub type RecordStream = BoxStream<'static, ApiResult<StreamRecord>>;

/// Parameters of an address search
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub address: Address,
    pub session_id: String,
}

impl SearchParams {
    pub fn new(address: Address, session_id: impl Into<String>) -> Self {
        Self {
            address,
            session_id: session_id.into(),
        }
    }

    /// Query string pairs in the order the backend documents them
    pub fn query_pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("street", self.address.street.as_str()),
            ("houseNumber", self.address.house_number.as_str()),
            ("city", self.address.city.as_str()),
            ("plz", self.address.zip_code.as_str()),
            ("sessionId", self.session_id.as_str()),
        ]
    }
}

/// Request to persist a query for sharing
#[derive(Debug, Clone)]
pub struct ShareRequest {
    /// Identifier of the query to share (its address hash)
    pub query_id: String,
    pub session_id: String,
    /// Filter snapshot stored alongside the query
    pub filters: Option<FilterOptions>,
}

impl ShareRequest {
    pub fn new(query_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            session_id: session_id.into(),
            filters: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterOptions) -> Self {
        self.filters = Some(filters);
        self
    }

    /// JSON body: the filter snapshot, or `{}` when none was given
    pub fn body(&self) -> FilterOptions {
        self.filters.clone().unwrap_or_default()
    }
}

/// Body of a successful share creation
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ShareResponse {
    #[serde(rename = "shareId", default)]
    pub share_id: Option<String>,
}
