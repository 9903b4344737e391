//! Authentication error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::ErrorBody;

/// Why a protected request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No `Authorization: Bearer` header, or a malformed one.
    NotAuthenticated,
    /// The bearer token failed verification (bad signature, wrong type, expired).
    InvalidToken,
    /// Valid identity without the administrator flag.
    InsufficientRole,
}

/// Rejection returned by the access guard extractors.
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NotAuthenticated | AuthErrorKind::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Unauthorized",
            AuthErrorKind::InvalidToken => "Invalid token",
            AuthErrorKind::InsufficientRole => "Forbidden",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        (self.status_code(), ErrorBody::json(self.message())).into_response()
    }
}
