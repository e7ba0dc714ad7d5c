//! Account table seam.

use crate::account::{Account, NewAccount};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the operation (constraint violation, bad filter...).
    #[error("{0}")]
    Rejected(String),

    #[error("Account store unavailable: {0}")]
    Unavailable(String),
}

/// Point lookups, inserts and conditional updates on account rows.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert(&self, account: NewAccount) -> Result<(), StoreError>;

    /// Current balance, or `None` when no row exists for `id`.
    async fn credits(&self, id: &str) -> Result<Option<i64>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Set the balance to `new` only if it still equals `expected`.
    ///
    /// Returns `false` when no row matched, i.e. the balance changed since
    /// it was read or the row is gone.
    async fn compare_and_set_credits(
        &self,
        id: &str,
        expected: i64,
        new: i64,
    ) -> Result<bool, StoreError>;
}
