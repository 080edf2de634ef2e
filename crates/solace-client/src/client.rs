//! Process-wide backend client.
//!
//! [`initialize`] runs once at startup; [`client`] fails fast if it has not.
//! There is no lazy creation on first use.

use std::sync::{OnceLock, PoisonError, RwLock};

use tracing::info;

use solace_gateway::LocalBackend;

use crate::config::BackendConfig;
use crate::error::{ClientError, Result};
use crate::session::Session;

static CLIENT: OnceLock<BackendClient> = OnceLock::new();

/// Open the backend described by `config` and install it as the process-wide
/// client. A second call fails with [`ClientError::AlreadyInitialized`].
pub fn initialize(config: BackendConfig) -> Result<&'static BackendClient> {
    if CLIENT.get().is_some() {
        return Err(ClientError::AlreadyInitialized);
    }

    let backend = LocalBackend::open(&config.db_path)?;
    info!(project = %config.project_id, path = %config.db_path.display(), "backend client initialized");

    CLIENT
        .set(BackendClient::new(config, backend))
        .map_err(|_| ClientError::AlreadyInitialized)?;
    client()
}

/// The process-wide client. Errors if [`initialize`] has not run.
pub fn client() -> Result<&'static BackendClient> {
    CLIENT.get().ok_or(ClientError::NotInitialized)
}

pub struct BackendClient {
    config: BackendConfig,
    backend: LocalBackend,
    session: RwLock<Option<Session>>,
}

impl BackendClient {
    pub fn new(config: BackendConfig, backend: LocalBackend) -> Self {
        Self {
            config,
            backend,
            session: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn backend(&self) -> &LocalBackend {
        &self.backend
    }

    pub fn sign_in(&self, session: Session) {
        info!(user = %session.user_id, "signed in");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn sign_out(&self) {
        if let Some(session) = self.session.write().unwrap_or_else(PoisonError::into_inner).take() {
            info!(user = %session.user_id, "signed out");
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current_user(&self) -> Result<Session> {
        self.session().ok_or(ClientError::NotSignedIn)
    }
}
