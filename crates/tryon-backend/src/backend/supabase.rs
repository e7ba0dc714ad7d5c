//! Supabase-backed identity provider and account store.

use crate::account::{Account, NewAccount};
use crate::identity::{AuthSession, AuthUser, IdentityError, IdentityProvider};
use crate::store::{AccountStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use supabase_client::{Filter, Session, SupabaseClient, SupabaseError, User};
use tracing::{debug, warn};

/// Table holding one row per account.
pub const ACCOUNTS_TABLE: &str = "users";

const ACCOUNT_COLUMNS: &str = "id,name,email,credits";

#[derive(Debug, Deserialize)]
struct CreditsRow {
    credits: i64,
}

#[derive(Debug, Serialize)]
struct CreditsPatch {
    credits: i64,
}

/// Adapts [`SupabaseClient`] to the identity and store seams.
#[derive(Clone)]
pub struct SupabaseBackend {
    client: SupabaseClient,
    table: String,
}

impl SupabaseBackend {
    pub fn new(client: SupabaseClient) -> Self {
        Self::with_table(client, ACCOUNTS_TABLE)
    }

    pub fn with_table(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

impl From<Session> for AuthSession {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.access_token,
            token_type: session.token_type,
            expires_in: session.expires_in,
            expires_at: session.expires_at,
            refresh_token: session.refresh_token,
            user: session.user.into(),
        }
    }
}

impl From<SupabaseError> for StoreError {
    fn from(e: SupabaseError) -> Self {
        match e {
            SupabaseError::Postgrest { message, .. } => StoreError::Rejected(message),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

fn identity_unavailable(e: SupabaseError) -> IdentityError {
    warn!(error = %e, "Auth service call failed");
    IdentityError::Unavailable(e.to_string())
}

#[async_trait]
impl IdentityProvider for SupabaseBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        match self.client.sign_up(email, password).await {
            Ok(user) => Ok(user.into()),
            Err(SupabaseError::Auth { message, .. }) => Err(IdentityError::Rejected(message)),
            Err(e) => Err(identity_unavailable(e)),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        match self.client.sign_in_with_password(email, password).await {
            Ok(session) => Ok(session.into()),
            Err(SupabaseError::Auth { message, .. }) => {
                Err(IdentityError::InvalidCredentials(message))
            }
            Err(e) => Err(identity_unavailable(e)),
        }
    }

    async fn resolve_token(&self, token: &str) -> Result<AuthUser, IdentityError> {
        match self.client.get_user(token).await {
            Ok(user) if user.id.is_empty() => Err(IdentityError::InvalidToken),
            Ok(user) => Ok(user.into()),
            // GoTrue answers malformed tokens with 4xx as well
            Err(SupabaseError::InvalidToken) => Err(IdentityError::InvalidToken),
            Err(SupabaseError::Auth { status, .. }) if (400..500).contains(&status) => {
                Err(IdentityError::InvalidToken)
            }
            Err(e) => Err(identity_unavailable(e)),
        }
    }

    async fn health_check(&self) -> bool {
        self.client.health_check().await
    }
}

#[async_trait]
impl AccountStore for SupabaseBackend {
    async fn insert(&self, account: NewAccount) -> Result<(), StoreError> {
        self.client.insert(&self.table, &[account]).await?;
        Ok(())
    }

    async fn credits(&self, id: &str) -> Result<Option<i64>, StoreError> {
        let rows: Vec<CreditsRow> = self
            .client
            .select(&self.table, "credits", &[Filter::eq("id", id)])
            .await?;

        Ok(rows.into_iter().next().map(|r| r.credits))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let rows: Vec<Account> = self
            .client
            .select(&self.table, ACCOUNT_COLUMNS, &[Filter::eq("email", email)])
            .await?;

        if rows.len() > 1 {
            warn!(email, matches = rows.len(), "Multiple accounts share an email, using the first");
        }

        Ok(rows.into_iter().next())
    }

    async fn compare_and_set_credits(
        &self,
        id: &str,
        expected: i64,
        new: i64,
    ) -> Result<bool, StoreError> {
        let rows: Vec<CreditsRow> = self
            .client
            .update(
                &self.table,
                &CreditsPatch { credits: new },
                &[Filter::eq("id", id), Filter::eq("credits", expected)],
            )
            .await?;

        debug!(account_id = %id, expected, new, matched = rows.len(), "Conditional credit update");
        Ok(!rows.is_empty())
    }
}
