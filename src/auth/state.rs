//! Authentication state trait and macro.

use crate::jwt::TokenCodec;

/// Trait for state types that can verify access tokens.
pub trait HasAuthBackend {
    fn tokens(&self) -> &TokenCodec;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard field.
///
/// The struct must have a `tokens: Arc<TokenCodec>` field.
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub tokens: Arc<TokenCodec>,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn tokens(&self) -> &$crate::jwt::TokenCodec {
                &self.tokens
            }
        }
    };
}
