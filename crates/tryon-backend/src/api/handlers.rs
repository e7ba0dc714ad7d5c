//! HTTP request handlers.

use super::types::{
    AddCreditsRequest, AddCreditsResponse, HealthResponse, LoginRequest, LoginResponse,
    SignupRequest, SignupResponse, TryOnRequest, TryOnResponse,
};
use super::AppState;
use crate::credits::{adjust_credits, provision_account};
use crate::error::ApiError;
use crate::identity::IdentityError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::info;

/// Liveness marker.
pub async fn root() -> &'static str {
    "Backend is running!"
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let upstream_healthy = state.identity.health_check().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        upstream_healthy,
    })
}

/// Create an auth subject and its account row.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let Json(request) = payload?;
    let signup = request.validate()?;
    info!(email = %signup.email, "Signup request received");

    let user = state
        .identity
        .sign_up(&signup.email, &signup.password)
        .await?;

    provision_account(
        state.store.as_ref(),
        &user,
        &signup.name,
        &signup.email,
        state.credits.initial,
    )
    .await?;

    info!(user_id = %user.id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".to_string(),
            user,
        }),
    ))
}

/// Exchange email and password for a session.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let login = request.validate()?;

    let session = state
        .identity
        .sign_in(&login.email, &login.password)
        .await
        .map_err(|e| match e {
            // Any refusal at sign-in is a credentials problem for the caller
            IdentityError::Rejected(message) => ApiError::Unauthenticated(message),
            other => other.into(),
        })?;

    info!(user_id = %session.user.id, "Login successful");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        session,
    }))
}

/// Charge one try-on against the bearer's balance.
pub async fn tryon(
    State(state): State<AppState>,
    payload: Result<Json<TryOnRequest>, JsonRejection>,
) -> Result<Json<TryOnResponse>, ApiError> {
    let Json(request) = payload?;
    let token = request.validate()?;

    let charge = state
        .gate
        .authorize_and_charge(&token, state.credits.tryon_cost)
        .await?;

    Ok(Json(TryOnResponse {
        message: "Try-on successful. Credit deducted.".to_string(),
        remaining_credits: charge.remaining,
    }))
}

/// Manually adjust the balance of the account registered under an email.
pub async fn add_credits(
    State(state): State<AppState>,
    payload: Result<Json<AddCreditsRequest>, JsonRejection>,
) -> Result<Json<AddCreditsResponse>, ApiError> {
    let Json(request) = payload?;
    let request = request.validate()?;
    info!(email = %request.email, amount = request.amount, "Credit adjustment requested");

    let adjustment = adjust_credits(state.store.as_ref(), &request.email, request.amount).await?;

    Ok(Json(AddCreditsResponse {
        message: format!("{} credits added successfully.", adjustment.amount),
        credits_added: adjustment.amount,
        credits: adjustment.credits,
    }))
}
