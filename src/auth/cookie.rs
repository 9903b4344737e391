//! Refresh-token cookie contract.
//!
//! The refresh token travels only as an `HttpOnly` cookie scoped to the refresh
//! path; the access token travels in the `Authorization` header. Setting and
//! clearing must use the same name/domain/path triple or browsers keep the old
//! cookie.

use axum::http::header;
use std::time::Duration;

/// Default refresh cookie name.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Default refresh cookie path (the refresh endpoint).
pub const REFRESH_COOKIE_PATH: &str = "/auth/refresh";

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

/// Attributes of the refresh cookie, shared by every handler that sets or clears it.
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: Duration,
}

impl Default for RefreshCookie {
    fn default() -> Self {
        Self {
            name: REFRESH_COOKIE_NAME.to_string(),
            path: REFRESH_COOKIE_PATH.to_string(),
            domain: None,
            secure: false,
            same_site: SameSite::Lax,
            max_age: crate::jwt::REFRESH_TOKEN_TTL,
        }
    }
}

impl RefreshCookie {
    /// `Set-Cookie` value carrying a refresh token.
    pub fn set(&self, token: &str) -> String {
        self.render(token, self.max_age.as_secs())
    }

    /// `Set-Cookie` value that removes the cookie.
    pub fn clear(&self) -> String {
        self.render("", 0)
    }

    /// Read the refresh token from a request's `Cookie` header.
    pub fn read<'a>(&self, headers: &'a axum::http::HeaderMap) -> Option<&'a str> {
        get_cookie(headers, &self.name).filter(|value| !value.is_empty())
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite={}; Path={}; Max-Age={}",
            self.name,
            value,
            self.same_site.as_str(),
            self.path,
            max_age
        );
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        // Browsers drop SameSite=None cookies that are not Secure.
        if self.secure || self.same_site == SameSite::None {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = value.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}
