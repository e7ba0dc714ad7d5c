//! Try-on backend - Entry point.

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use supabase_client::SupabaseClient;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tryon_backend::{
    api::{create_router, AppState},
    backend::{MemoryBackend, SupabaseBackend},
    config::{BackendKind, Config, LogConfig, LogFormat},
    AccountStore, IdentityProvider,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config.log);

    info!("Starting try-on backend");

    let (identity, store) = build_backend(&config)?;

    if identity.health_check().await {
        info!(backend = %config.backend, "Backend healthy");
    } else {
        warn!(backend = %config.backend, "Backend health check failed - will retry on requests");
    }

    let state = AppState::new(identity, store, config.credits.clone());
    let app = create_router(state);

    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address: {}", config.server.listen_addr))?,
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server is running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let (pretty, json) = match log.format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

fn build_backend(config: &Config) -> Result<(Arc<dyn IdentityProvider>, Arc<dyn AccountStore>)> {
    match config.backend {
        BackendKind::Supabase => {
            let (url, key) = config.supabase.credentials()?;
            let client = SupabaseClient::new(url, key.expose_secret(), config.supabase.timeout)
                .context("Failed to create Supabase client")?;
            info!(url = %client.base_url(), "Using Supabase backend");

            let backend = Arc::new(SupabaseBackend::new(client));
            let identity: Arc<dyn IdentityProvider> = backend.clone();
            let store: Arc<dyn AccountStore> = backend;
            Ok((identity, store))
        }
        BackendKind::Memory => {
            warn!("Using in-memory backend, all accounts are lost on restart");
            let backend = Arc::new(MemoryBackend::new());
            let identity: Arc<dyn IdentityProvider> = backend.clone();
            let store: Arc<dyn AccountStore> = backend;
            Ok((identity, store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
