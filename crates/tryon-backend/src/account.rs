//! Account records keyed by the auth subject id.

use serde::{Deserialize, Serialize};

/// Opaque subject id issued by the identity provider.
pub type AccountId = String;

/// Credits granted to a freshly provisioned account.
pub const INITIAL_CREDITS: i64 = 100;

/// An account row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Signed: a negative top-up is accepted and can push this below zero.
    pub credits: i64,
}

impl Account {
    /// Check if the account can pay `cost` credits.
    pub fn can_afford(&self, cost: i64) -> bool {
        self.credits >= cost
    }
}

/// Row inserted on signup.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewAccount {
    pub id: AccountId,
    pub name: String,
    pub email: Option<String>,
    pub credits: i64,
}

impl NewAccount {
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email,
            credits: INITIAL_CREDITS,
        }
    }

    /// Override the starting balance.
    pub fn with_credits(mut self, credits: i64) -> Self {
        self.credits = credits;
        self
    }
}

impl From<NewAccount> for Account {
    fn from(new: NewAccount) -> Self {
        Self {
            id: new.id,
            name: new.name,
            email: new.email,
            credits: new.credits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_defaults_to_initial_credits() {
        let account = NewAccount::new("u-1", "A", Some("a@x.com".into()));
        assert_eq!(account.credits, INITIAL_CREDITS);
        assert_eq!(account.with_credits(5).credits, 5);
    }

    #[test]
    fn test_can_afford() {
        let account: Account = NewAccount::new("u-1", "A", None).with_credits(1).into();
        assert!(account.can_afford(1));
        assert!(!account.can_afford(2));
    }
}
