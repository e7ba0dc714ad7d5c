//! Metered action gate.

use super::CreditError;
use crate::account::AccountId;
use crate::identity::{IdentityError, IdentityProvider};
use crate::store::AccountStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Credits charged per try-on.
pub const DEFAULT_UNIT_COST: i64 = 1;

/// A successful charge.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Charge {
    pub account_id: AccountId,
    pub cost: i64,
    pub remaining: i64,
}

/// Authenticates a bearer and charges their balance.
#[derive(Clone)]
pub struct CreditGate {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn AccountStore>,
}

impl CreditGate {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn AccountStore>) -> Self {
        Self { identity, store }
    }

    /// Resolve `token`, then debit `unit_cost` credits if the balance covers it.
    ///
    /// Performs one balance read and, on success only, one conditional
    /// write that applies only if the balance is still the value read.
    #[instrument(skip(self, token))]
    pub async fn authorize_and_charge(
        &self,
        token: &str,
        unit_cost: i64,
    ) -> Result<Charge, CreditError> {
        if unit_cost <= 0 {
            return Err(CreditError::InvalidCost(unit_cost));
        }
        if token.is_empty() {
            return Err(CreditError::Unauthenticated);
        }

        let user = match self.identity.resolve_token(token).await {
            Ok(user) if !user.id.is_empty() => user,
            Ok(_) | Err(IdentityError::InvalidToken) => return Err(CreditError::Unauthenticated),
            Err(IdentityError::Unavailable(message)) => {
                return Err(CreditError::Unavailable(message))
            }
            Err(e) => {
                debug!(error = %e, "Token resolution refused");
                return Err(CreditError::Unauthenticated);
            }
        };

        let available = self
            .store
            .credits(&user.id)
            .await
            .map_err(CreditError::from_store)?
            .ok_or_else(|| CreditError::AccountNotFound(user.id.clone()))?;

        if available < unit_cost {
            debug!(account_id = %user.id, available, unit_cost, "Insufficient credits");
            return Err(CreditError::InsufficientCredit {
                required: unit_cost,
                available,
            });
        }

        let remaining = available - unit_cost;
        let applied = self
            .store
            .compare_and_set_credits(&user.id, available, remaining)
            .await
            .map_err(CreditError::from_store)?;

        if !applied {
            warn!(account_id = %user.id, "Balance changed between read and write");
            return Err(CreditError::BalanceChanged(user.id));
        }

        info!(account_id = %user.id, remaining, "Credits charged");

        Ok(Charge {
            account_id: user.id,
            cost: unit_cost,
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Account, NewAccount};
    use crate::backend::MemoryBackend;
    use crate::store::StoreError;
    use async_trait::async_trait;

    async fn setup(credits: i64) -> (Arc<MemoryBackend>, CreditGate, String, String) {
        let backend = Arc::new(MemoryBackend::new());
        let user = backend.sign_up("a@x.com", "pw123456").await.unwrap();
        backend
            .insert(NewAccount::new(&*user.id, "A", user.email.clone()).with_credits(credits))
            .await
            .unwrap();
        let token = backend.issue_token(&user.id).await;
        let gate = CreditGate::new(backend.clone(), backend.clone());
        (backend, gate, user.id, token)
    }

    #[tokio::test]
    async fn test_charge_decrements_by_one() {
        let (backend, gate, id, token) = setup(5).await;

        let charge = gate
            .authorize_and_charge(&token, DEFAULT_UNIT_COST)
            .await
            .unwrap();

        assert_eq!(charge.remaining, 4);
        assert_eq!(charge.account_id, id);
        assert_eq!(backend.account(&id).await.unwrap().credits, 4);
    }

    #[tokio::test]
    async fn test_exact_balance_then_insufficient() {
        let (backend, gate, id, token) = setup(1).await;

        let charge = gate.authorize_and_charge(&token, 1).await.unwrap();
        assert_eq!(charge.remaining, 0);

        for _ in 0..3 {
            let result = gate.authorize_and_charge(&token, 1).await;
            assert!(matches!(
                result,
                Err(CreditError::InsufficientCredit {
                    required: 1,
                    available: 0
                })
            ));
        }
        assert_eq!(backend.account(&id).await.unwrap().credits, 0);
    }

    #[tokio::test]
    async fn test_cost_larger_than_one() {
        let (backend, gate, id, token) = setup(3).await;

        assert!(matches!(
            gate.authorize_and_charge(&token, 4).await,
            Err(CreditError::InsufficientCredit { .. })
        ));
        assert_eq!(gate.authorize_and_charge(&token, 3).await.unwrap().remaining, 0);
        assert_eq!(backend.account(&id).await.unwrap().credits, 0);
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let (backend, gate, id, _) = setup(5).await;

        assert!(matches!(
            gate.authorize_and_charge("expired", 1).await,
            Err(CreditError::Unauthenticated)
        ));
        assert!(matches!(
            gate.authorize_and_charge("", 1).await,
            Err(CreditError::Unauthenticated)
        ));
        assert_eq!(backend.account(&id).await.unwrap().credits, 5);
    }

    #[tokio::test]
    async fn test_account_missing() {
        let backend = Arc::new(MemoryBackend::new());
        let user = backend.sign_up("a@x.com", "pw123456").await.unwrap();
        let token = backend.issue_token(&user.id).await;
        let gate = CreditGate::new(backend.clone(), backend.clone());

        let result = gate.authorize_and_charge(&token, 1).await;
        assert!(matches!(result, Err(CreditError::AccountNotFound(id)) if id == user.id));
    }

    #[tokio::test]
    async fn test_non_positive_cost_rejected() {
        let (_, gate, _, token) = setup(5).await;
        assert!(matches!(
            gate.authorize_and_charge(&token, 0).await,
            Err(CreditError::InvalidCost(0))
        ));
    }

    /// Store whose balance moves between the read and the conditional write.
    struct RacingStore {
        inner: MemoryBackend,
    }

    #[async_trait]
    impl AccountStore for RacingStore {
        async fn insert(&self, account: NewAccount) -> Result<(), StoreError> {
            self.inner.insert(account).await
        }

        async fn credits(&self, id: &str) -> Result<Option<i64>, StoreError> {
            let read = self.inner.credits(id).await?;
            if let Some(credits) = read {
                // a concurrent charge lands right after our read
                self.inner.set_credits(id, credits - 1).await;
            }
            Ok(read)
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
            self.inner.find_by_email(email).await
        }

        async fn compare_and_set_credits(
            &self,
            id: &str,
            expected: i64,
            new: i64,
        ) -> Result<bool, StoreError> {
            self.inner.compare_and_set_credits(id, expected, new).await
        }
    }

    /// Store that refuses every conditional write.
    struct RejectingStore {
        inner: MemoryBackend,
    }

    #[async_trait]
    impl AccountStore for RejectingStore {
        async fn insert(&self, account: NewAccount) -> Result<(), StoreError> {
            self.inner.insert(account).await
        }

        async fn credits(&self, id: &str) -> Result<Option<i64>, StoreError> {
            self.inner.credits(id).await
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
            self.inner.find_by_email(email).await
        }

        async fn compare_and_set_credits(
            &self,
            _id: &str,
            _expected: i64,
            _new: i64,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Rejected("permission denied for table users".into()))
        }
    }

    #[tokio::test]
    async fn test_rejected_write_is_persistence_error() {
        let identity = Arc::new(MemoryBackend::new());
        let user = identity.sign_up("a@x.com", "pw123456").await.unwrap();
        let token = identity.issue_token(&user.id).await;

        let store = Arc::new(RejectingStore {
            inner: MemoryBackend::new(),
        });
        store
            .insert(NewAccount::new(&*user.id, "A", None).with_credits(5))
            .await
            .unwrap();

        let gate = CreditGate::new(identity, store.clone());
        let result = gate.authorize_and_charge(&token, 1).await;

        assert!(
            matches!(result, Err(CreditError::Persistence(message)) if message == "permission denied for table users")
        );
        assert_eq!(store.inner.account(&user.id).await.unwrap().credits, 5);
    }

    #[tokio::test]
    async fn test_concurrent_change_is_detected() {
        let identity = Arc::new(MemoryBackend::new());
        let user = identity.sign_up("a@x.com", "pw123456").await.unwrap();
        let token = identity.issue_token(&user.id).await;

        let store = Arc::new(RacingStore {
            inner: MemoryBackend::new(),
        });
        store
            .insert(NewAccount::new(&*user.id, "A", None).with_credits(2))
            .await
            .unwrap();

        let gate = CreditGate::new(identity, store.clone());
        let result = gate.authorize_and_charge(&token, 1).await;

        assert!(matches!(result, Err(CreditError::BalanceChanged(_))));
        // only the concurrent decrement applied
        assert_eq!(store.inner.account(&user.id).await.unwrap().credits, 1);
    }
}
