//! Registration, login and token rotation.
//!
//! The service is stateless: every operation reads the stores it was built
//! with and returns fresh tokens. Nothing is remembered about issued tokens,
//! so logout cannot revoke them.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::db::{DEFAULT_RATING_LEVEL, Identity};
use crate::jwt::{JwtError, TokenCodec};
use crate::password::{PasswordError, PasswordHasher};
use crate::store::{NewIdentity, StoreError, UserRepository, WalletRepository};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const DEFAULT_FIRST_NAME: &str = "Имя";
pub const DEFAULT_LAST_NAME: &str = "Фамилия";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("{0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        error!(error = %e, "{}", context);
        Self::Internal(context.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        Self::internal("Store operation failed", e)
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        Self::internal("Password hashing failed", e)
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        Self::internal("Token issuance failed", e)
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub tokens: TokenPair,
    pub identity: Identity,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutOutcome {
    pub success: bool,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    wallets: Arc<dyn WalletRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<TokenCodec>,
    /// Verified against when the email is unknown so both login paths cost
    /// one hash verification.
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        wallets: Arc<dyn WalletRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<TokenCodec>,
    ) -> Self {
        Self {
            users,
            wallets,
            hasher,
            tokens,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    pub async fn register(&self, input: RegisterInput) -> Result<AuthOutcome, AuthError> {
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        if self.users.is_email_taken(&input.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(&input.password).await?;

        let new = NewIdentity {
            email: input.email,
            password_hash,
            first_name: name_or(input.first_name, DEFAULT_FIRST_NAME),
            last_name: name_or(input.last_name, DEFAULT_LAST_NAME),
            middle_name: input.middle_name.filter(|n| !n.trim().is_empty()),
            rating_level: DEFAULT_RATING_LEVEL,
            is_admin: false,
        };

        let identity = match self.users.create(new).await {
            Ok(identity) => identity,
            // Lost a race against a concurrent registration
            Err(StoreError::Conflict) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.wallets.create_for_user(&identity.id).await {
            // Every identity owns a wallet; without one the account must not exist
            if let Err(cleanup) = self.users.delete(&identity.id).await {
                error!(user_id = %identity.id, error = %cleanup, "Failed to roll back identity");
            }
            return Err(e.into());
        }

        let tokens = self.issue_pair(&identity)?;
        info!(user_id = %identity.id, "User registered");

        Ok(AuthOutcome { tokens, identity })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        let Some(identity) = self.users.find_by_email(email).await? else {
            let dummy = self.dummy_hash().await?;
            self.hasher.verify(dummy, password).await?;
            info!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(&identity.password_hash, password).await? {
            info!("Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&identity)?;
        info!(user_id = %identity.id, "User logged in");

        Ok(AuthOutcome { tokens, identity })
    }

    /// Exchange a refresh token for a new access token and a rotated refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = match self.tokens.verify_refresh_token(refresh_token) {
            Ok(claims) => claims,
            Err(JwtError::Invalid) => {
                warn!("Refresh rejected: invalid token");
                return Err(AuthError::InvalidRefreshToken);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(identity) = self.users.find_by_id(&claims.sub).await? else {
            warn!(user_id = %claims.sub, "Refresh rejected: unknown user");
            return Err(AuthError::InvalidRefreshToken);
        };

        self.issue_pair(&identity)
    }

    pub fn logout(&self) -> LogoutOutcome {
        LogoutOutcome { success: true }
    }

    fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let access =
            self.tokens
                .issue_access_token(&identity.id, identity.is_admin, identity.rating_level)?;
        let refresh = self.tokens.issue_refresh_token(&identity.id)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    async fn dummy_hash(&self) -> Result<&str, AuthError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async {
                let mut bytes = [0u8; 16];
                rand::RngCore::fill_bytes(&mut rand::rng(), &mut bytes);
                let plain: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                self.hasher.hash(&plain).await
            })
            .await?;
        Ok(hash.as_str())
    }
}

fn name_or(name: Option<String>, default: &str) -> String {
    name.filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::Validation("Email is required".into()));
    }
    if !email.contains('@') {
        return Err(AuthError::Validation("Invalid email".into()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
