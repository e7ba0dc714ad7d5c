//! Identity provider seam: account creation, password sign-in and
//! bearer-token resolution are delegated to an external service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// An authenticated subject.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Session returned to the client after a successful login.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider refused the request (duplicate email, weak password...).
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    /// Transport failure or unexpected response.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a subject for the given email and password.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError>;

    /// Exchange email and password for a session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    /// Resolve a bearer token to the subject it was issued for.
    async fn resolve_token(&self, token: &str) -> Result<AuthUser, IdentityError>;

    /// Whether the provider is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}
