//! Operator sign-in against the hosted auth service and session checks.

pub mod http;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired session")]
    InvalidSession,

    #[error("auth service error: {0}")]
    Service(String),
}

/// Tokens issued by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
    pub email: Option<String>,
}

/// Email/password sign-in.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
}
