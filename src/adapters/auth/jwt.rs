//! HS256 JWT session validator.
//!
//! Tokens are signed with a shared secret and carry the claims below. The
//! service only verifies them; issuing belongs to the identity service,
//! apart from [`JwtSessionValidator::issue`] which local tooling and tests
//! use to mint tokens with the same secret.
//!
//! ```json
//! { "sub": "user-123", "email": "payer@example.com", "role": "user", "exp": 1735689600 }
//! ```

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, Role, Timestamp, UserId};
use crate::ports::SessionValidator;

/// Claims read from a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: String,

    #[serde(default)]
    pub email: String,

    /// `user` or `admin`; absent means `user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Expiry, seconds since the epoch.
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Validates HS256-signed session tokens.
pub struct JwtSessionValidator {
    secret: SecretString,
    issuer: Option<String>,
    leeway_secs: u64,
}

impl JwtSessionValidator {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            issuer: None,
            leeway_secs: 60,
        }
    }

    /// Require the `iss` claim to match.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Clock skew tolerated on `exp`.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Mint a token for `user` valid for `ttl_secs`.
    pub fn issue(&self, user: &AuthenticatedUser, ttl_secs: u64) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: user.id.as_str().to_string(),
            email: user.email.clone(),
            role: Some(user.role.as_str().to_string()),
            exp: Timestamp::now().plus_secs(ttl_secs).as_unix_secs(),
            iss: self.issuer.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AuthError::InvalidClaims(format!("Failed to sign token: {}", e)))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        match &self.issuer {
            Some(issuer) => {
                validation.set_issuer(&[issuer]);
                validation.set_required_spec_claims(&["exp", "sub", "iss"]);
            }
            None => validation.set_required_spec_claims(&["exp", "sub"]),
        }
        validation
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

fn user_from_claims(claims: SessionClaims) -> Result<AuthenticatedUser, AuthError> {
    let id = UserId::new(claims.sub)
        .map_err(|_| AuthError::InvalidClaims("sub must not be empty".to_string()))?;
    let role = match claims.role.as_deref() {
        None => Role::User,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| AuthError::InvalidClaims(format!("unknown role '{}'", raw)))?,
    };
    Ok(AuthenticatedUser::new(id, claims.email, role))
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());

        let data = decode::<SessionClaims>(token, &key, &self.validation()).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer => {
                    tracing::warn!("Invalid issuer in token");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!("Token validation failed: {}", e);
                    AuthError::InvalidToken
                }
            }
        })?;

        user_from_claims(data.claims).map_err(|e| {
            tracing::warn!(error = %e, "Token claims rejected");
            e
        })
    }
}
