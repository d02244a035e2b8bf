use crate::api::error::{ApiError, ApiResult};
use crate::api::ndjson::decode_records;
use crate::api::traits::OfferApi;
use crate::api::types::{RecordStream, SearchParams, ShareRequest, ShareResponse};
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

/// HTTP client for the offers backend
#[derive(Debug, Clone)]
pub struct OfferClient {
    client: Client,
    base_url: String,
}

impl OfferClient {
    /// Create a client for the backend configured in `settings`
    pub fn new(settings: &Settings) -> ApiResult<Self> {
        Self::with_base_url(&settings.api_url)
    }

    /// Create a client for an explicit base URL.
    /// No request timeout is set: streams run until the server closes them.
    pub fn with_base_url(base_url: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fail on non-success statuses, logging them the same way for every endpoint
    fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            warn!("{} returned status: {}", url, status);
            return Err(ApiError::Status { status, url });
        }
        Ok(response)
    }

    fn open_stream(&self, response: Response) -> ApiResult<RecordStream> {
        let response = Self::check_status(response)?;
        debug!("Streaming records from {}", response.url());
        Ok(decode_records(response.bytes_stream()))
    }
}

#[async_trait]
impl OfferApi for OfferClient {
    async fn search_offers(&self, params: &SearchParams) -> ApiResult<RecordStream> {
        info!("Searching offers for {}", params.address);

        let response = self
            .client
            .get(self.endpoint("offers"))
            .query(&params.query_pairs())
            .send()
            .await?;

        self.open_stream(response)
    }

    async fn share_offers(&self, request: &ShareRequest) -> ApiResult<String> {
        info!("Creating share link for query {}", request.query_id);

        let url = self.endpoint(&format!("offers/shared/{}", request.query_id));
        let response = self
            .client
            .post(url)
            .query(&[("sessionId", request.session_id.as_str())])
            .json(&request.body())
            .send()
            .await?;

        let body = Self::check_status(response)?.text().await?;
        let parsed: ShareResponse = serde_json::from_str(&body)?;

        match parsed.share_id.filter(|id| !id.trim().is_empty()) {
            Some(share_id) => {
                debug!("Share id {} created", share_id);
                Ok(share_id)
            }
            None => {
                warn!("Share response carried no shareId: {}", body);
                Err(ApiError::MissingShareId)
            }
        }
    }

    async fn shared_offers(&self, share_id: &str) -> ApiResult<RecordStream> {
        info!("Loading shared offers {}", share_id);

        let response = self
            .client
            .get(self.endpoint(&format!("offers/shared/{share_id}")))
            .send()
            .await?;

        self.open_stream(response)
    }
}
