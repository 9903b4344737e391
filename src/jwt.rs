//! JWT token generation and validation.
//!
//! Two token kinds are signed with the same HS256 secret and told apart by the
//! `typ` claim:
//! - Access tokens: short-lived (15 minutes by default), carry authorization claims
//! - Refresh tokens: long-lived (7 days by default), carry only the subject
//!
//! Neither kind is stored server-side.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "ratingLevel")]
    pub rating_level: i64,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens. No authorization data on purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Unique per token, so two refresh tokens minted in the same second differ.
    pub jti: String,
    pub sub: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

/// Default access token lifetime: 15 minutes
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime: 7 days
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Issues and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// A freshly issued token plus its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl TokenCodec {
    /// Create a codec with the default lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(secret, ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL)
    }

    pub fn with_ttls(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(
        &self,
        subject: &str,
        is_admin: bool,
        rating_level: i64,
    ) -> Result<IssuedToken, JwtError> {
        self.issue_access_token_at(subject, is_admin, rating_level, unix_now()?)
    }

    /// Issue an access token as if the current time were `now`.
    pub fn issue_access_token_at(
        &self,
        subject: &str,
        is_admin: bool,
        rating_level: i64,
        now: u64,
    ) -> Result<IssuedToken, JwtError> {
        let exp = expiry(now, self.access_ttl)?;
        let claims = AccessClaims {
            sub: subject.to_string(),
            is_admin,
            rating_level,
            token_type: TokenType::Access,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    pub fn issue_refresh_token(&self, subject: &str) -> Result<IssuedToken, JwtError> {
        self.issue_refresh_token_at(subject, unix_now()?)
    }

    pub fn issue_refresh_token_at(&self, subject: &str, now: u64) -> Result<IssuedToken, JwtError> {
        let exp = expiry(now, self.refresh_ttl)?;
        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: subject.to_string(),
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.verify_access_token_at(token, unix_now()?)
    }

    pub fn verify_access_token_at(&self, token: &str, now: u64) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = self.decode(token)?;
        if claims.token_type != TokenType::Access || now >= claims.exp {
            return Err(JwtError::Invalid);
        }
        Ok(claims)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        self.verify_refresh_token_at(token, unix_now()?)
    }

    pub fn verify_refresh_token_at(
        &self,
        token: &str,
        now: u64,
    ) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = self.decode(token)?;
        if claims.token_type != TokenType::Refresh || now >= claims.exp {
            return Err(JwtError::Invalid);
        }
        Ok(claims)
    }

    /// Signature and structure check only; expiry is compared by the callers
    /// against an explicit clock.
    fn decode<T: DeserializeOwned + Clone>(&self, token: &str) -> Result<T, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        jsonwebtoken::decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(kind = ?e.kind(), "Token rejected");
                JwtError::Invalid
            })
    }
}

fn expiry(now: u64, ttl: Duration) -> Result<u64, JwtError> {
    now.checked_add(ttl.as_secs()).ok_or(JwtError::Lifetime)
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::Clock)
}

/// Errors that can occur during JWT operations.
///
/// Every verification failure collapses into `Invalid` so callers cannot tell
/// an expired token from a forged one.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Invalid token")]
    Invalid,
    #[error("System time error")]
    Clock,
    #[error("Token lifetime out of range")]
    Lifetime,
}
