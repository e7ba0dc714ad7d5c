//! Manual balance adjustment by email.

use super::CreditError;
use crate::account::AccountId;
use crate::store::AccountStore;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Result of an applied adjustment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Adjustment {
    pub account_id: AccountId,
    pub amount: i64,
    pub credits: i64,
}

/// Add `amount` (which may be negative) to the balance of the account
/// registered under `email`. No floor or ceiling is applied.
#[instrument(skip(store))]
pub async fn adjust_credits(
    store: &dyn AccountStore,
    email: &str,
    amount: i64,
) -> Result<Adjustment, CreditError> {
    if amount == 0 {
        return Err(CreditError::ZeroAmount);
    }

    let account = store
        .find_by_email(email)
        .await
        .map_err(CreditError::from_store)?
        .ok_or_else(|| CreditError::AccountNotFound(email.to_string()))?;

    let credits = account
        .credits
        .checked_add(amount)
        .ok_or(CreditError::AmountOutOfRange {
            credits: account.credits,
            amount,
        })?;

    let applied = store
        .compare_and_set_credits(&account.id, account.credits, credits)
        .await
        .map_err(CreditError::from_store)?;

    if !applied {
        warn!(account_id = %account.id, "Balance changed between read and write");
        return Err(CreditError::BalanceChanged(account.id));
    }

    info!(account_id = %account.id, amount, credits, "Credits adjusted");

    Ok(Adjustment {
        account_id: account.id,
        amount,
        credits,
    })
}
