//! Session validation port for bearer tokens.
//!
//! The payment API trusts whatever identity this port returns. How tokens
//! are issued is outside this service; implementations only check them.
//!
//! # Contract
//!
//! Implementations must:
//! - Validate the token signature
//! - Validate expiry (and issuer, when configured)
//! - Return `AuthError::InvalidToken` for malformed or badly signed tokens
//! - Return `AuthError::TokenExpired` for expired tokens
//! - Return `AuthError::InvalidClaims` when the subject or role is unusable
//! - Return `AuthError::ServiceUnavailable` for transient errors

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates access tokens and extracts user identity.
///
/// HTTP middleware uses this to turn an `Authorization: Bearer` header into
/// an [`AuthenticatedUser`].
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Role, UserId};
    use std::collections::HashMap;
    use std::sync::RwLock;

    struct StaticSessionValidator {
        tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    }

    impl StaticSessionValidator {
        fn with_token(token: &str, user: AuthenticatedUser) -> Self {
            let mut tokens = HashMap::new();
            tokens.insert(token.to_string(), user);
            Self {
                tokens: RwLock::new(tokens),
            }
        }
    }

    #[async_trait]
    impl SessionValidator for StaticSessionValidator {
        async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
            self.tokens
                .read()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or(AuthError::InvalidToken)
        }
    }

    fn payer() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("user-123").unwrap(), "payer@example.com", Role::User)
    }

    #[tokio::test]
    async fn session_validator_returns_user_for_known_token() {
        let validator = StaticSessionValidator::with_token("tok", payer());

        let user = validator.validate("tok").await.unwrap();

        assert_eq!(user.id.as_str(), "user-123");
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn session_validator_rejects_unknown_token() {
        let validator = StaticSessionValidator::with_token("tok", payer());

        let result = validator.validate("other").await;

        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn session_validator_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionValidator>();
    }
}
