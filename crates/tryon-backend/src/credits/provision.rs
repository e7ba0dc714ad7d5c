//! Account row creation after signup.

use super::CreditError;
use crate::account::NewAccount;
use crate::identity::AuthUser;
use crate::store::{AccountStore, StoreError};
use tracing::{info, warn};

/// Insert the account row for a freshly created auth subject.
///
/// The auth subject is not rolled back when the insert fails; the caller
/// is left with an identity that has no account row.
pub async fn provision_account(
    store: &dyn AccountStore,
    user: &AuthUser,
    name: &str,
    email: &str,
    initial_credits: i64,
) -> Result<NewAccount, CreditError> {
    let email = user
        .email
        .clone()
        .unwrap_or_else(|| email.trim().to_lowercase());
    let account = NewAccount::new(&*user.id, name, Some(email)).with_credits(initial_credits);

    match store.insert(account.clone()).await {
        Ok(()) => {
            info!(account_id = %account.id, credits = account.credits, "Account provisioned");
            Ok(account)
        }
        Err(e) => {
            warn!(
                account_id = %user.id,
                error = %e,
                "Account insert failed, auth user left without account row"
            );
            Err(match e {
                StoreError::Rejected(message) => CreditError::Provisioning(message),
                StoreError::Unavailable(message) => CreditError::Unavailable(message),
            })
        }
    }
}
