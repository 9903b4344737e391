//! Client-side request gateway.
//!
//! Attaches the in-memory access token to outgoing requests and recovers from
//! a 401 by refreshing the session once, then retrying the request once.
//! Concurrent 401s share a single refresh call: the first caller publishes a
//! shared future into the refresh slot and everyone else awaits that handle.

mod error;
mod transport;

use axum::http::{HeaderValue, StatusCode, header};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub use error::GatewayError;
use error::RefreshFailure;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

type RefreshHandle = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

/// Called once per failed refresh, after the access token has been cleared.
pub type AuthFailureHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct GatewayConfig {
    pub login_path: String,
    pub register_path: String,
    pub refresh_path: String,
    pub logout_path: String,
    pub access_token: Option<String>,
    pub on_auth_failure: Option<AuthFailureHook>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            login_path: "/auth/login".to_string(),
            register_path: "/auth/register".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            logout_path: "/auth/logout".to_string(),
            access_token: None,
            on_auth_failure: None,
        }
    }
}

/// Registration form sent by [`RequestGateway::register`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBody {
    access_token: String,
}

struct SessionState {
    access_token: Option<String>,
    /// Bumped whenever the held token is replaced or cleared.
    generation: u64,
    refresh_in_flight: Option<RefreshHandle>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    config: GatewayConfig,
    state: Mutex<SessionState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh calls carry no Authorization header; the cookie is the credential.
    async fn call_refresh(&self) -> Result<String, RefreshFailure> {
        let response = self
            .transport
            .send(ApiRequest::post(self.config.refresh_path.clone()))
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        if !response.is_success() {
            warn!(status = %response.status, "Session refresh rejected");
            return Err(RefreshFailure::Rejected);
        }

        let body: TokenBody = response
            .json()
            .map_err(|e| RefreshFailure::Decode(e.to_string()))?;
        debug!("Session refreshed");
        Ok(body.access_token)
    }
}

#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<Inner>,
}

impl RequestGateway {
    pub fn new(transport: impl Transport, config: GatewayConfig) -> Self {
        Self::with_transport(Arc::new(transport), config)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: GatewayConfig) -> Self {
        let state = SessionState {
            access_token: config.access_token.clone(),
            generation: 0,
            refresh_in_flight: None,
        };
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.lock().access_token.clone()
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        let mut state = self.inner.lock();
        state.access_token = Some(token.into());
        state.generation += 1;
    }

    pub fn clear_access_token(&self) {
        let mut state = self.inner.lock();
        state.access_token = None;
        state.generation += 1;
    }

    /// Send a request, refreshing the session and retrying once on 401.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let pending = self.inner.lock().refresh_in_flight.clone();
        if let Some(handle) = pending {
            // Outcome is read back from the session state below
            let _ = handle.await;
        }

        let (token, generation) = {
            let state = self.inner.lock();
            (state.access_token.clone(), state.generation)
        };

        let response = self.send(request.clone(), token.as_deref()).await?;
        if response.status != StatusCode::UNAUTHORIZED
            || request.path == self.inner.config.refresh_path
        {
            return into_result(response);
        }

        let token = match self.recover(generation).await {
            Ok(token) => token,
            Err(RefreshFailure::Rejected) => {
                return Err(GatewayError::Unauthorized {
                    body: response.body,
                });
            }
            Err(RefreshFailure::Transport(e)) => return Err(GatewayError::Transport(e)),
            Err(RefreshFailure::Decode(e)) => return Err(GatewayError::Decode(e)),
        };

        debug!(path = %request.path, "Retrying request after refresh");
        let retried = self.send(request, Some(&token)).await?;
        into_result(retried)
    }

    /// Silent refresh for application start.
    ///
    /// `Ok(false)` when the server has no usable refresh cookie for us.
    pub async fn resume_session(&self) -> Result<bool, GatewayError> {
        let handle = {
            let mut state = self.inner.lock();
            self.refresh_handle(&mut state)
        };

        match handle.await {
            Ok(_) => Ok(true),
            Err(RefreshFailure::Rejected) => Ok(false),
            Err(RefreshFailure::Transport(e)) => Err(GatewayError::Transport(e)),
            Err(RefreshFailure::Decode(e)) => Err(GatewayError::Decode(e)),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), GatewayError> {
        let request = ApiRequest::post(self.inner.config.login_path.clone()).json(
            &serde_json::json!({ "email": email, "password": password }),
        )?;
        self.start_session(request).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), GatewayError> {
        let request =
            ApiRequest::post(self.inner.config.register_path.clone()).json(registration)?;
        self.start_session(request).await
    }

    /// Ask the server to clear the refresh cookie, then forget the access token.
    pub async fn logout(&self) -> Result<(), GatewayError> {
        let token = self.access_token();
        let result = self
            .send(
                ApiRequest::post(self.inner.config.logout_path.clone()),
                token.as_deref(),
            )
            .await
            .and_then(into_result);
        self.clear_access_token();
        result.map(|_| ())
    }

    async fn start_session(&self, request: ApiRequest) -> Result<(), GatewayError> {
        let response = into_result(self.inner.transport.send(request).await?)?;
        let body: TokenBody = response.json()?;
        self.set_access_token(body.access_token);
        Ok(())
    }

    async fn send(
        &self,
        mut request: ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, GatewayError> {
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            request.headers.insert(header::AUTHORIZATION, value);
        }
        self.inner.transport.send(request).await
    }

    /// Obtain a token to retry with after a 401 on a request sent at `generation`.
    async fn recover(&self, generation: u64) -> Result<String, RefreshFailure> {
        let handle = {
            let mut state = self.inner.lock();
            if state.generation != generation {
                // Someone else refreshed (or logged out) after our request went out
                return state.access_token.clone().ok_or(RefreshFailure::Rejected);
            }
            self.refresh_handle(&mut state)
        };
        handle.await
    }

    /// Join the refresh in flight, or start one. Publishing happens under the
    /// caller's lock, before anything is awaited.
    fn refresh_handle(&self, state: &mut SessionState) -> RefreshHandle {
        if let Some(handle) = &state.refresh_in_flight {
            return handle.clone();
        }

        let inner = self.inner.clone();
        let started = state.generation;
        let handle = async move {
            let result = inner.call_refresh().await;
            let (result, applied) = {
                let mut state = inner.lock();
                state.refresh_in_flight = None;
                if state.generation == started {
                    state.generation += 1;
                    state.access_token = result.as_ref().ok().cloned();
                    (result, true)
                } else {
                    // A login, logout or explicit token change landed meanwhile
                    // and owns the session now.
                    debug!("Refresh outcome discarded");
                    let current = state.access_token.clone();
                    (current.ok_or(RefreshFailure::Rejected), false)
                }
            };
            if applied && result.is_err() {
                if let Some(hook) = &inner.config.on_auth_failure {
                    hook();
                }
            }
            result
        }
        .boxed()
        .shared();

        state.refresh_in_flight = Some(handle.clone());
        handle
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse, GatewayError> {
    if response.is_success() {
        Ok(response)
    } else if response.status == StatusCode::UNAUTHORIZED {
        Err(GatewayError::Unauthorized {
            body: response.body,
        })
    } else {
        Err(GatewayError::Status {
            status: response.status,
            body: response.body,
        })
    }
}
