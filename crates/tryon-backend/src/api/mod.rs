//! HTTP API.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::logging_middleware;
pub use types::*;

use crate::config::CreditsConfig;
use crate::credits::CreditGate;
use crate::identity::IdentityProvider;
use crate::store::AccountStore;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Auth collaborator
    pub identity: Arc<dyn IdentityProvider>,
    /// Account table collaborator
    pub store: Arc<dyn AccountStore>,
    /// Try-on credit gate over the same collaborators
    pub gate: CreditGate,
    pub credits: CreditsConfig,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn AccountStore>,
        credits: CreditsConfig,
    ) -> Self {
        Self {
            gate: CreditGate::new(identity.clone(), store.clone()),
            identity,
            store,
            credits,
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/signup", post(handlers::signup))
        .route("/api/login", post(handlers::login))
        .route("/api/tryon", post(handlers::tryon))
        .route("/api/add-credits", post(handlers::add_credits))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
