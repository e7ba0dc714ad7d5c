//! Try-on backend - credit-metered actions on top of Supabase.
//!
//! Signup, login and token resolution are delegated to Supabase auth;
//! account balances live in a Supabase table. The service itself only:
//! - provisions an account row with starting credits on signup
//! - charges one credit per try-on, refusing when the balance is short
//! - applies manual credit adjustments by email

pub mod account;
pub mod api;
pub mod backend;
pub mod config;
pub mod credits;
pub mod error;
pub mod identity;
pub mod store;

pub use account::{Account, NewAccount, INITIAL_CREDITS};
pub use config::Config;
pub use credits::{CreditError, CreditGate};
pub use error::ApiError;
pub use identity::{IdentityError, IdentityProvider};
pub use store::{AccountStore, StoreError};
