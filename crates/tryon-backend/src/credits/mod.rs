//! Credit accounting: the metered action gate, provisioning of new
//! accounts and manual balance adjustments.

mod adjust;
mod gate;
mod provision;

pub use adjust::{adjust_credits, Adjustment};
pub use gate::{Charge, CreditGate, DEFAULT_UNIT_COST};
pub use provision::provision_account;

use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("Invalid or expired token")]
    Unauthenticated,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientCredit { required: i64, available: i64 },

    #[error("Balance of {0} changed concurrently")]
    BalanceChanged(String),

    #[error("Invalid unit cost: {0}")]
    InvalidCost(i64),

    #[error("Credit amount must be non-zero")]
    ZeroAmount,

    #[error("Adding {amount} to a balance of {credits} is out of range")]
    AmountOutOfRange { credits: i64, amount: i64 },

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    Provisioning(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

impl CreditError {
    /// Classify a failed balance read or conditional write.
    fn from_store(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(message) => CreditError::Persistence(message),
            StoreError::Unavailable(message) => CreditError::Unavailable(message),
        }
    }
}
