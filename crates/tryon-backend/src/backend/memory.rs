//! In-process identity provider and account store.
//!
//! Used for local development (`BACKEND=memory`) and tests. Passwords are
//! kept as SHA-256 hashes; access tokens are random hex strings valid for
//! one hour.

use crate::account::{Account, NewAccount};
use crate::identity::{AuthSession, AuthUser, IdentityError, IdentityProvider};
use crate::store::{AccountStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

const MIN_PASSWORD_LEN: usize = 6;
const TOKEN_BYTES: usize = 32;
const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct MemoryUser {
    user: AuthUser,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct IssuedToken {
    user_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Auth users keyed by email
    users: HashMap<String, MemoryUser>,
    /// Live access tokens
    tokens: HashMap<String, IssuedToken>,
    /// Account rows keyed by id
    accounts: HashMap<String, Account>,
}

/// In-memory implementation of both collaborator seams.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an account row by id.
    pub async fn account(&self, id: &str) -> Option<Account> {
        self.state.read().await.accounts.get(id).cloned()
    }

    /// Overwrite an account's balance, bypassing the compare-and-set path.
    pub async fn set_credits(&self, id: &str, credits: i64) -> bool {
        match self.state.write().await.accounts.get_mut(id) {
            Some(account) => {
                account.credits = credits;
                true
            }
            None => false,
        }
    }

    /// Number of account rows.
    pub async fn account_count(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    /// Issue a fresh access token for a user id, without a password check.
    pub async fn issue_token(&self, user_id: &str) -> String {
        let (token, _) = self.state.write().await.issue_token(user_id);
        token
    }
}

impl MemoryState {
    /// Store a new token for `user_id`, dropping any that have expired.
    fn issue_token(&mut self, user_id: &str) -> (String, DateTime<Utc>) {
        let now = Utc::now();
        self.tokens.retain(|_, issued| issued.expires_at > now);

        let token = random_token();
        let expires_at = now + Duration::seconds(TOKEN_TTL_SECS);
        self.tokens.insert(
            token.clone(),
            IssuedToken {
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        (token, expires_at)
    }
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(IdentityError::Rejected(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }

        let email = normalize_email(email);
        let mut state = self.state.write().await;

        if state.users.contains_key(&email) {
            return Err(IdentityError::Rejected("User already registered".into()));
        }

        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.clone()),
            created_at: Some(Utc::now()),
        };

        state.users.insert(
            email,
            MemoryUser {
                user: user.clone(),
                password_hash: hash_password(password),
            },
        );

        debug!(user_id = %user.id, "Created in-memory auth user");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        let email = normalize_email(email);
        let mut state = self.state.write().await;

        let user = match state.users.get(&email) {
            Some(u) if u.password_hash == hash_password(password) => u.user.clone(),
            _ => {
                return Err(IdentityError::InvalidCredentials(
                    "Invalid login credentials".into(),
                ))
            }
        };

        let (access_token, expires_at) = state.issue_token(&user.id);

        Ok(AuthSession {
            access_token,
            token_type: "bearer".into(),
            expires_in: TOKEN_TTL_SECS,
            expires_at: Some(expires_at.timestamp()),
            refresh_token: random_token(),
            user,
        })
    }

    async fn resolve_token(&self, token: &str) -> Result<AuthUser, IdentityError> {
        let state = self.state.read().await;
        let issued = state
            .tokens
            .get(token)
            .filter(|issued| issued.expires_at > Utc::now())
            .ok_or(IdentityError::InvalidToken)?;

        state
            .users
            .values()
            .find(|u| u.user.id == issued.user_id)
            .map(|u| u.user.clone())
            .ok_or(IdentityError::InvalidToken)
    }
}

#[async_trait]
impl AccountStore for MemoryBackend {
    async fn insert(&self, account: NewAccount) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::Rejected(
                "duplicate key value violates unique constraint \"users_pkey\"".into(),
            ));
        }

        state.accounts.insert(account.id.clone(), account.into());
        Ok(())
    }

    async fn credits(&self, id: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.state.read().await.accounts.get(id).map(|a| a.credits))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email.as_deref() == Some(email.as_str()))
            .cloned())
    }

    async fn compare_and_set_credits(
        &self,
        id: &str,
        expected: i64,
        new: i64,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.accounts.get_mut(id) {
            Some(account) if account.credits == expected => {
                account.credits = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
