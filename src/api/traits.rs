use crate::api::error::ApiResult;
use crate::api::types::{RecordStream, SearchParams, ShareRequest};
use async_trait::async_trait;

/// Common trait for the offers backend
/// Lets the store and view logic run against the HTTP client or an in-memory double
#[async_trait]
pub trait OfferApi: Send + Sync {
    /// Stream the query and offer records for an address
    async fn search_offers(&self, params: &SearchParams) -> ApiResult<RecordStream>;

    /// Persist a query plus filter snapshot and return its share id
    async fn share_offers(&self, request: &ShareRequest) -> ApiResult<String>;

    /// Stream the records of a previously shared query
    async fn shared_offers(&self, share_id: &str) -> ApiResult<RecordStream>;
}
