pub mod client;
pub mod error;
pub mod ndjson;
pub mod traits;
pub mod types;

pub use client::OfferClient;
pub use error::{ApiError, ApiResult};
pub use traits::OfferApi;
pub use types::{RecordStream, SearchParams, ShareRequest};
