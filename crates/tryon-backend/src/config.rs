//! Configuration loaded from environment variables.

use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use crate::account::INITIAL_CREDITS;
use crate::credits::DEFAULT_UNIT_COST;

/// Flat variable names understood in addition to the `SECTION__KEY` form.
const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("SUPABASE_URL", "supabase.url"),
    ("SUPABASE_SERVICE_KEY", "supabase.service_key"),
];

/// Backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Which collaborator implementation to use
    #[serde(default)]
    pub backend: BackendKind,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Supabase project configuration
    #[serde(default)]
    pub supabase: SupabaseConfig,

    /// Credit accounting configuration
    #[serde(default)]
    pub credits: CreditsConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Supabase,
    /// In-process auth and accounts, lost on restart
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Supabase => write!(f, "supabase"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,

    /// Service role key
    pub service_key: Option<SecretString>,

    /// Request timeout; the HTTP client default applies when unset
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditsConfig {
    /// Balance of a freshly provisioned account
    #[serde(default = "default_initial_credits")]
    pub initial: i64,

    /// Credits charged per try-on
    #[serde(default = "default_tryon_cost")]
    pub tryon_cost: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_credits(),
            tryon_cost: default_tryon_cost(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_initial_credits() -> i64 {
    INITIAL_CREDITS
}

fn default_tryon_cost() -> i64 {
    DEFAULT_UNIT_COST
}

fn default_log_level() -> String {
    "info".into()
}

impl SupabaseConfig {
    /// URL and service key, both of which the Supabase backend requires.
    pub fn credentials(&self) -> Result<(&str, &SecretString)> {
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow!("SUPABASE_URL (or SUPABASE__URL) is not set"))?;
        let key = self
            .service_key
            .as_ref()
            .ok_or_else(|| anyhow!("SUPABASE_SERVICE_KEY (or SUPABASE__SERVICE_KEY) is not set"))?;
        Ok((url, key))
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Build configuration from an explicit set of variables.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let vars: config::Map<String, String> = vars.into_iter().collect();

        let mut builder = config::Config::builder().add_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(false)
                .source(Some(vars.clone())),
        );

        for (var, key) in LEGACY_OVERRIDES {
            builder = builder
                .set_override_option(*key, vars.get(*var).cloned())
                .with_context(|| format!("Failed to apply {}", var))?;
        }

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if config.credits.tryon_cost <= 0 {
            return Err(anyhow!("CREDITS__TRYON_COST must be positive"));
        }

        Ok(config)
    }
}
