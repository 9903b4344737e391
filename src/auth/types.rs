//! Authentication context types.

use crate::jwt::AccessClaims;

/// Identity and authorization derived from a verified access token.
///
/// Produced once per request by the `Auth` extractor and handed to handlers by
/// value; nothing downstream can mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub is_admin: bool,
    pub rating_level: i64,
}

impl From<AccessClaims> for AuthContext {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            is_admin: claims.is_admin,
            rating_level: claims.rating_level,
        }
    }
}
