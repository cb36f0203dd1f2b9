//! Credential resolution.
//!
//! The coordinator only needs `credential -> username`; how credentials are
//! minted is the account service's business.

pub mod jwt;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credential")]
    Invalid,
}

#[async_trait]
pub trait AuthResolver: Send + Sync {
    /// Username the credential belongs to.
    async fn resolve(&self, credential: &str) -> Result<String, AuthError>;
}

/// Accepts HS256 tokens signed with the shared secret; the username is the
/// `sub` claim.
pub struct JwtAuthResolver {
    secret: String,
}

impl JwtAuthResolver {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl AuthResolver for JwtAuthResolver {
    async fn resolve(&self, credential: &str) -> Result<String, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::Invalid);
        }
        match jwt::verify_token(credential, &self.secret) {
            Ok(claims) => Ok(claims.sub),
            Err(e) => {
                tracing::debug!("credential rejected: {e}");
                Err(AuthError::Invalid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jwt_resolver() {
        let resolver = JwtAuthResolver::new("secret");
        let token = jwt::create_token("alice", "secret", 1).unwrap();
        assert_eq!(resolver.resolve(&token).await.unwrap(), "alice");

        let forged = jwt::create_token("alice", "guess", 1).unwrap();
        assert!(matches!(resolver.resolve(&forged).await, Err(AuthError::Invalid)));
        assert!(matches!(resolver.resolve("").await, Err(AuthError::Invalid)));
    }
}
