//! Backend configuration loaded from environment variables.
//!
//! The binary loads `.env` first (via `dotenvy`), so values can live in a
//! file during development.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Delay between a successful check-in and the redirect home.
pub const DEFAULT_HOME_DELAY: Duration = Duration::from_millis(1500);

/// Backend client configuration.
#[derive(Clone)]
pub struct BackendConfig {
    /// Backend project identifier.
    /// Env: `SOLACE_PROJECT_ID` (required)
    pub project_id: String,

    /// Backend API key.
    /// Env: `SOLACE_API_KEY` (required)
    pub api_key: String,

    /// Path of the local document store.
    /// Env: `SOLACE_DB_PATH`
    /// Default: `solace.db`
    pub db_path: PathBuf,

    /// How long the check-in success message stays before going home.
    /// Env: `SOLACE_HOME_DELAY_MS`
    /// Default: 1500
    pub home_delay: Duration,
}

impl BackendConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ClientError::MissingConfig(key))
        };

        let project_id = required("SOLACE_PROJECT_ID")?;
        let api_key = required("SOLACE_API_KEY")?;

        let db_path = lookup("SOLACE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("solace.db"));

        let mut home_delay = DEFAULT_HOME_DELAY;
        if let Some(val) = lookup("SOLACE_HOME_DELAY_MS") {
            match val.parse::<u64>() {
                Ok(ms) => home_delay = Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid SOLACE_HOME_DELAY_MS, using default");
                }
            }
        }

        Ok(Self {
            project_id,
            api_key,
            db_path,
            home_delay,
        })
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("project_id", &self.project_id)
            .field("api_key", &"<redacted>")
            .field("db_path", &self.db_path)
            .field("home_delay", &self.home_delay)
            .finish()
    }
}
