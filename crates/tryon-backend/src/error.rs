//! HTTP-facing error type.

use crate::credits::CreditError;
use crate::identity::IdentityError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    /// The hosted service rejected the call.
    #[error("{0}")]
    Upstream(String),

    #[error("Insufficient credits")]
    InsufficientCredit,

    #[error("{0}")]
    Conflict(String),

    /// Detail is logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_REQUEST,
            ApiError::InsufficientCredit => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Request failed with internal error");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<CreditError> for ApiError {
    fn from(e: CreditError) -> Self {
        match e {
            CreditError::Unauthenticated => ApiError::Unauthenticated("Invalid token".into()),
            CreditError::AccountNotFound(_) => ApiError::NotFound("User not found".into()),
            CreditError::InsufficientCredit { .. } => ApiError::InsufficientCredit,
            CreditError::BalanceChanged(_) => {
                ApiError::Conflict("Credit balance changed concurrently, try again".into())
            }
            CreditError::ZeroAmount | CreditError::AmountOutOfRange { .. } => {
                ApiError::Validation(e.to_string())
            }
            CreditError::Persistence(message) | CreditError::Provisioning(message) => {
                ApiError::Upstream(message)
            }
            CreditError::InvalidCost(_) | CreditError::Unavailable(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Rejected(message) => ApiError::Upstream(message),
            IdentityError::InvalidCredentials(message) => ApiError::Unauthenticated(message),
            IdentityError::InvalidToken => ApiError::Unauthenticated("Invalid token".into()),
            IdentityError::Unavailable(message) => ApiError::Internal(message),
        }
    }
}
