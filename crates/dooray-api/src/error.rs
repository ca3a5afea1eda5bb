use reqwest::StatusCode;
use thiserror::Error;

/// Failures from the Dooray REST API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-success status.
    #[error("dooray api request failed ({status}): {body}")]
    Status { status: StatusCode, body: String },

    /// A redirect response carried no Location header. The drive content
    /// retrieval protocol requires one.
    #[error("redirect response did not carry a Location header")]
    MissingRedirectLocation,

    /// The Location header was not valid UTF-8 or not a usable URL.
    #[error("redirect location is not usable: {0}")]
    InvalidRedirectLocation(String),

    /// The redirect target answered with another redirect; the protocol
    /// allows exactly one hop.
    #[error("redirect target issued another redirect")]
    RedirectLoop,

    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// HTTP status of the upstream answer, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
