//! Access guard and refresh-cookie transport.
//!
//! Access tokens arrive as `Authorization: Bearer` headers and are verified
//! statelessly. Refresh tokens only ever travel in an `HttpOnly` cookie scoped
//! to the refresh endpoint.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, RefreshCookie, SameSite, get_cookie};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminAuth, Auth};
pub use state::HasAuthBackend;
pub use types::AuthContext;
