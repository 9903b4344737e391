//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::{REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, RefreshCookie, SameSite};
use crate::db::{DEFAULT_RATING_LEVEL, Database};
use crate::password::{Argon2Hasher, PasswordHasher};
use crate::session::{DEFAULT_FIRST_NAME, DEFAULT_LAST_NAME, MIN_PASSWORD_LENGTH};
use crate::store::NewIdentity;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "walletd", about = "Account and session service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "4000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "walletd.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime (e.g. 900s, 15m, 1h)
    #[arg(long, env = "ACCESS_TOKEN_TTL", default_value = "15m", value_parser = parse_ttl)]
    pub access_token_ttl: Duration,

    /// Refresh token lifetime (e.g. 12h, 7d)
    #[arg(long, env = "REFRESH_TOKEN_TTL", default_value = "7d", value_parser = parse_ttl)]
    pub refresh_token_ttl: Duration,

    /// Name of the refresh cookie
    #[arg(long, env = "COOKIE_NAME_REFRESH", default_value = REFRESH_COOKIE_NAME)]
    pub cookie_name: String,

    /// Path the refresh cookie is scoped to
    #[arg(long, env = "COOKIE_PATH_REFRESH", default_value = REFRESH_COOKIE_PATH)]
    pub cookie_path: String,

    /// Domain attribute of the refresh cookie
    #[arg(long, env = "COOKIE_DOMAIN")]
    pub cookie_domain: Option<String>,

    /// Set the Secure flag on the refresh cookie (should be on behind HTTPS)
    #[arg(long, env = "COOKIE_SECURE")]
    pub cookie_secure: bool,

    /// SameSite attribute of the refresh cookie. `none` implies Secure
    #[arg(long, env = "COOKIE_SAMESITE", value_enum, default_value = "lax")]
    pub cookie_same_site: SameSite,

    /// Create an admin account with this email on startup (password from ADMIN_PASSWORD)
    #[arg(long, value_name = "EMAIL")]
    pub create_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Longest accepted token lifetime: ten years.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Parse a lifetime such as `30s`, `15m`, `12h` or `7d`. A bare number is seconds.
pub fn parse_ttl(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((i, _)) => s.split_at(i),
        None => (s, "s"),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid duration: {}", s))?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(format!("Unknown duration unit in {}: use s, m, h or d", s)),
    };

    if value == 0 {
        return Err("Duration must be greater than zero".to_string());
    }

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .filter(|ttl| *ttl <= MAX_TTL)
        .ok_or_else(|| format!("Duration is too large: {} (at most 3650d)", s))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read a secret from the environment and remove it so child processes and
/// later readers never see it.
fn take_env_secret(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    // SAFETY: We're single-threaded at this point during startup,
    // and no other code is reading this environment variable.
    unsafe { std::env::remove_var(name) };
    Some(value)
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Some(secret) = take_env_secret("JWT_SECRET") {
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Handle the --create-admin flag: create the admin account unless the email is
/// already registered.
pub async fn handle_create_admin(db: &Database, hasher: &dyn PasswordHasher, email: &str) {
    match db.users().get_by_email(email).await {
        Ok(Some(existing)) => {
            println!();
            println!(
                "Account already exists: {} (admin: {})",
                existing.email, existing.is_admin
            );
            println!();
            return;
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }

    let Some(password) = take_env_secret("ADMIN_PASSWORD") else {
        error!("ADMIN_PASSWORD is required with --create-admin");
        std::process::exit(1);
    };
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        error!(
            "ADMIN_PASSWORD is shorter than {} characters",
            MIN_PASSWORD_LENGTH
        );
        std::process::exit(1);
    }

    let password_hash = match hasher.hash(&password).await {
        Ok(hash) => hash,
        Err(e) => {
            error!(error = %e, "Failed to hash admin password");
            std::process::exit(1);
        }
    };

    let admin = NewIdentity {
        email: email.to_string(),
        password_hash,
        first_name: DEFAULT_FIRST_NAME.to_string(),
        last_name: DEFAULT_LAST_NAME.to_string(),
        middle_name: None,
        rating_level: DEFAULT_RATING_LEVEL,
        is_admin: true,
    };

    let created = match db.users().create(&admin).await {
        Ok(created) => created,
        Err(e) => {
            error!(error = %e, "Failed to create admin user");
            std::process::exit(1);
        }
    };

    if let Err(e) = db.wallets().create_for_user(&created.id).await {
        error!(error = %e, "Failed to create admin wallet");
        std::process::exit(1);
    }

    println!();
    println!("Admin user created: {}", created.email);
    println!();
}

/// Refresh cookie attributes from the parsed arguments.
pub fn cookie_from_args(args: &Args) -> RefreshCookie {
    RefreshCookie {
        name: args.cookie_name.clone(),
        path: args.cookie_path.clone(),
        domain: args.cookie_domain.clone(),
        secure: args.cookie_secure,
        same_site: args.cookie_same_site,
        max_age: args.refresh_token_ttl,
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    hasher: Arc<dyn PasswordHasher>,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl: args.access_token_ttl,
        refresh_ttl: args.refresh_token_ttl,
        cookie: cookie_from_args(args),
        hasher,
    }
}

/// The production password hasher.
pub fn default_hasher() -> Arc<dyn PasswordHasher> {
    Arc::new(Argon2Hasher::new())
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
