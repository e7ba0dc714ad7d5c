//! Request and response types for the GoTrue and PostgREST APIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Email/password credentials for signup and password sign-in.
#[derive(Debug, Serialize)]
pub(crate) struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// An auth user as returned by GoTrue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: Value,
}

/// A session issued by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: User,
}

/// Signup returns a session when email confirmation is disabled and a bare
/// user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(Box<Session>),
    User(User),
}

impl SignUpResponse {
    pub fn into_user(self) -> User {
        match self {
            SignUpResponse::Session(session) => session.user,
            SignUpResponse::User(user) => user,
        }
    }
}

/// GoTrue error body. Different GoTrue versions use different field names.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthErrorBody {
    pub msg: Option<String>,
    pub error_description: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl AuthErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
    }
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PostgrestErrorBody {
    pub message: Option<String>,
    pub code: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

/// An equality row filter, rendered as `column=eq.value` in the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// Query pair understood by PostgREST.
    pub fn to_query(&self) -> (String, String) {
        (
            self.column.clone(),
            format!("eq.{}", self.value),
        )
    }
}
