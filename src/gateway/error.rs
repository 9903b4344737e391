use axum::{body::Bytes, http::StatusCode};

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The session could not be recovered. Carries the body of the original 401.
    #[error("Unauthorized")]
    Unauthorized { body: Bytes },
    #[error("Unexpected status {status}")]
    Status { status: StatusCode, body: Bytes },
    #[error("Failed to encode request: {0}")]
    Encode(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Why a refresh attempt did not yield a new access token.
#[derive(Debug, Clone)]
pub(crate) enum RefreshFailure {
    /// The server rejected the refresh cookie.
    Rejected,
    Transport(String),
    Decode(String),
}
