pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod gateway;
pub mod jwt;
pub mod password;
pub mod session;
pub mod store;

use api::create_api_router;
use auth::RefreshCookie;
use axum::Router;
use db::Database;
use jwt::TokenCodec;
use password::PasswordHasher;
use session::AuthService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// HS256 secret for signing tokens
    pub jwt_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Refresh cookie attributes. `max_age` is overridden by `refresh_ttl`.
    pub cookie: RefreshCookie,
    pub hasher: Arc<dyn PasswordHasher>,
}

impl ServerConfig {
    /// Everything but the database and secret at its default.
    pub fn new(db: Database, jwt_secret: Vec<u8>) -> Self {
        Self {
            db,
            jwt_secret,
            access_ttl: jwt::ACCESS_TOKEN_TTL,
            refresh_ttl: jwt::REFRESH_TOKEN_TTL,
            cookie: RefreshCookie::default(),
            hasher: Arc::new(password::Argon2Hasher::new()),
        }
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let tokens = Arc::new(TokenCodec::with_ttls(
        &config.jwt_secret,
        config.access_ttl,
        config.refresh_ttl,
    ));

    let service = Arc::new(AuthService::new(
        Arc::new(config.db.users()),
        Arc::new(config.db.wallets()),
        config.hasher.clone(),
        tokens,
    ));

    let cookie = RefreshCookie {
        max_age: config.refresh_ttl,
        ..config.cookie.clone()
    };

    create_api_router(config.db.clone(), service, Arc::new(cookie))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
