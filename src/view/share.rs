use crate::api::{OfferApi, ShareRequest};
use crate::models::FilterOptions;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

pub const SHARE_FAILED_MESSAGE: &str = "Failed to create share link. Please try again.";
pub const COPY_FAILED_MESSAGE: &str = "Failed to copy link to clipboard.";
pub const NOTHING_TO_SHARE_MESSAGE: &str = "There is no search result to share yet.";

#[derive(Debug, Error)]
#[error("Clipboard rejected the write: {0}")]
pub struct ClipboardError(pub String);

/// Destination for copied share links
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// State of the share dialog: one link request plus copy feedback.
///
/// Errors stay local to the dialog and never touch the search state; a failed
/// request can be retried with [`retry`](Self::retry).
pub struct ShareDialog {
    api: Arc<dyn OfferApi>,
    origin: String,
    request: Option<ShareRequest>,
    share_link: Option<String>,
    link_copied: bool,
    error: Option<String>,
    generating: bool,
}

impl ShareDialog {
    /// `origin` is the public base the link is built on, e.g. `https://offers.example.com`
    pub fn new(api: Arc<dyn OfferApi>, origin: impl Into<String>) -> Self {
        Self {
            api,
            origin: origin.into().trim_end_matches('/').to_string(),
            request: None,
            share_link: None,
            link_copied: false,
            error: None,
            generating: false,
        }
    }

    pub fn share_link(&self) -> Option<&str> {
        self.share_link.as_deref()
    }

    pub fn link_copied(&self) -> bool {
        self.link_copied
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Request a share link for a query and remember the request for retries
    pub async fn open(
        &mut self,
        query_id: impl Into<String>,
        session_id: impl Into<String>,
        filters: Option<FilterOptions>,
    ) -> Option<&str> {
        let mut request = ShareRequest::new(query_id, session_id);
        request.filters = filters;
        self.request = Some(request);
        self.generate().await
    }

    /// Re-issue the last request
    pub async fn retry(&mut self) -> Option<&str> {
        if self.request.is_none() {
            return None;
        }
        self.generate().await
    }

    async fn generate(&mut self) -> Option<&str> {
        let request = self.request.clone()?;
        if request.query_id.is_empty() || request.session_id.is_empty() {
            warn!(
                "Share skipped: query id {:?}, session id {:?}",
                request.query_id, request.session_id
            );
            self.share_link = None;
            self.link_copied = false;
            self.error = Some(NOTHING_TO_SHARE_MESSAGE.to_string());
            return None;
        }

        self.generating = true;
        self.error = None;
        self.link_copied = false;
        self.share_link = None;

        match self.api.share_offers(&request).await {
            Ok(share_id) => {
                self.share_link = Some(format!("{}/offers/shared/{}", self.origin, share_id));
            }
            Err(e) => {
                error!("Failed to create share link: {}", e);
                self.error = Some(SHARE_FAILED_MESSAGE.to_string());
            }
        }
        self.generating = false;
        self.share_link.as_deref()
    }

    pub fn copy_link(&mut self, clipboard: &mut dyn Clipboard) {
        let Some(link) = self.share_link.as_deref() else {
            return;
        };
        match clipboard.write_text(link) {
            Ok(()) => self.link_copied = true,
            Err(e) => {
                error!("Failed to copy link: {}", e);
                self.error = Some(COPY_FAILED_MESSAGE.to_string());
            }
        }
    }

    /// Forget the link and any feedback, keeping the last request
    pub fn close(&mut self) {
        self.share_link = None;
        self.link_copied = false;
        self.error = None;
        self.generating = false;
    }
}
