//! Axum extractors guarding protected routes.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthContext;

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn authenticate<S>(parts: &Parts, state: &S) -> Result<AuthContext, AuthErrorKind>
where
    S: HasAuthBackend,
{
    let token = bearer_token(parts).ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state
        .tokens()
        .verify_access_token(token)
        .map_err(|_| AuthErrorKind::InvalidToken)?;

    Ok(AuthContext::from(claims))
}

/// Extractor for endpoints that require a valid access token.
/// Stateless: no database lookup, the token claims are trusted until expiry.
pub struct Auth(pub AuthContext);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .map(Auth)
            .map_err(ApiAuthError::new)
    }
}

/// Extractor for endpoints restricted to administrators.
/// Runs the same checks as `Auth`, then requires the admin flag.
pub struct AdminAuth(pub AuthContext);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(context) = Auth::from_request_parts(parts, state).await?;

        if !context.is_admin {
            tracing::debug!(user_id = %context.user_id, "Admin route denied");
            return Err(ApiAuthError::new(AuthErrorKind::InsufficientRole));
        }
        Ok(AdminAuth(context))
    }
}
