use thiserror::Error;

/// Failures of the offers backend client
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network fault, or a body that could not be read
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("{url} returned status {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// A line of the response was not valid JSON or not a valid record
    #[error("Malformed response record: {0}")]
    Decode(#[from] serde_json::Error),

    /// Share creation succeeded at the HTTP level but carried no share id
    #[error("Share response does not contain a shareId")]
    MissingShareId,
}

/// Result type for client operations
pub type ApiResult<T> = Result<T, ApiError>;
