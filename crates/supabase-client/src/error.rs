//! Supabase client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Auth error: {status} - {message}")]
    Auth { status: u16, message: String },

    #[error("Invalid or expired access token")]
    InvalidToken,

    #[error("PostgREST error: {status} - {message}")]
    Postgrest {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SupabaseError {
    /// Message reported by the remote service, without the status prefix.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            SupabaseError::Auth { message, .. } | SupabaseError::Postgrest { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }
}
