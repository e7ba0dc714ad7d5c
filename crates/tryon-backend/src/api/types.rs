//! API request and response types.
//!
//! Request fields are all optional at the serde level so that missing
//! fields produce a field-specific 400 instead of a generic body error.

use crate::error::ApiError;
use crate::identity::{AuthSession, AuthUser};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to create an account.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Validated signup fields.
#[derive(Debug)]
pub struct Signup {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Response after signup.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: AuthUser,
}

/// Request to sign in.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated login fields.
#[derive(Debug)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Response after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub session: AuthSession,
}

/// Request to run a metered try-on.
#[derive(Debug, Default, Deserialize)]
pub struct TryOnRequest {
    pub token: Option<String>,
}

/// Response after a charged try-on.
#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub message: String,
    pub remaining_credits: i64,
}

/// Request to adjust an account balance.
#[derive(Debug, Default, Deserialize)]
pub struct AddCreditsRequest {
    pub email: Option<String>,
    /// Kept untyped so a non-integer gets a precise message
    #[serde(rename = "creditsToAdd")]
    pub credits_to_add: Option<Value>,
}

/// Validated adjustment fields.
#[derive(Debug)]
pub struct AddCredits {
    pub email: String,
    pub amount: i64,
}

/// Response after an adjustment.
#[derive(Debug, Serialize)]
pub struct AddCreditsResponse {
    pub message: String,
    pub credits_added: i64,
    pub credits: i64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub upstream_healthy: bool,
}

/// Collects names of missing or blank string fields.
#[derive(Default)]
struct Missing(Vec<&'static str>);

impl Missing {
    fn take(&mut self, name: &'static str, value: Option<String>) -> String {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => {
                self.0.push(name);
                String::new()
            }
        }
    }

    fn check(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(format!(
                "Missing required field(s): {}",
                self.0.join(", ")
            )))
        }
    }
}

impl SignupRequest {
    pub fn validate(self) -> Result<Signup, ApiError> {
        let mut missing = Missing::default();
        let email = missing.take("email", self.email);
        let password = missing.take("password", self.password);
        let name = missing.take("name", self.name);
        missing.check()?;

        Ok(Signup {
            email: email.trim().to_string(),
            password,
            name: name.trim().to_string(),
        })
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<Login, ApiError> {
        let mut missing = Missing::default();
        let email = missing.take("email", self.email);
        let password = missing.take("password", self.password);
        missing.check()?;

        Ok(Login {
            email: email.trim().to_string(),
            password,
        })
    }
}

impl TryOnRequest {
    pub fn validate(self) -> Result<String, ApiError> {
        let mut missing = Missing::default();
        let token = missing.take("token", self.token);
        missing.check()?;
        Ok(token.trim().to_string())
    }
}

impl AddCreditsRequest {
    pub fn validate(self) -> Result<AddCredits, ApiError> {
        let mut missing = Missing::default();
        let email = missing.take("email", self.email);
        let amount = match self.credits_to_add {
            None | Some(Value::Null) => {
                missing.0.push("creditsToAdd");
                None
            }
            Some(value) => Some(value),
        };
        missing.check()?;

        let amount = amount
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(|| ApiError::Validation("creditsToAdd must be an integer".into()))?;

        if amount == 0 {
            return Err(ApiError::Validation("creditsToAdd must be non-zero".into()));
        }

        // auth service stores emails lowercased
        Ok(AddCredits {
            email: email.trim().to_lowercase(),
            amount,
        })
    }
}
