//! Service container for dependency injection
//!
//! Wires settings, storage and host fields into sessions and services.

use std::sync::Arc;

use tracing::debug;

use crate::application::services::{PromptSession, TransferService};
use crate::config::Settings;
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{
    FileStore, FileSystem, HostFields, KeyValueStore, RealFileSystem,
};

/// Container holding the I/O collaborators shared by every service.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Durable storage for the composition
    pub store: Arc<dyn KeyValueStore>,

    /// The host's prompt fields
    pub fields: Arc<dyn HostFields>,
}

impl ServiceContainer {
    /// Real filesystem plus a file-backed store under `settings.store_dir`.
    pub fn new(settings: Settings, fields: Arc<dyn HostFields>) -> InfraResult<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        fs.create_dir_all(&settings.store_dir).map_err(|e| {
            InfraError::io(
                format!("create store directory {}", settings.store_dir.display()),
                e,
            )
        })?;
        debug!("store directory: {}", settings.store_dir.display());
        let store = Arc::new(FileStore::new(fs.clone(), settings.store_dir.clone()));
        Ok(Self::with_deps(settings, fs, store, fields))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn KeyValueStore>,
        fields: Arc<dyn HostFields>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            store,
            fields,
        }
    }

    /// Restore or seed the composition and push it to the host once.
    pub fn start_session(&self) -> PromptSession {
        PromptSession::start(
            self.store.clone(),
            self.fields.clone(),
            self.fs.clone(),
            self.settings.clone(),
        )
    }

    pub fn transfer(&self) -> TransferService {
        TransferService::new(self.fs.clone(), self.settings.clone())
    }
}
