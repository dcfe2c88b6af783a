//! File-backed platform for host deployments.
//!
//! Wraps the simulated platform and writes its State Store to a JSON file after every
//! mutating primitive, so roles and the sync flag survive a daemon restart. A reset
//! request persists the store and signals the daemon to shut down.

use std::fs;
use std::path::{Path, PathBuf};

use fwupdate_engine::{
    error::Result as EngineResult, Error, PlatformAdapter, SimulatedPlatform, StateStore,
    TransferHandle, UpdateState,
};
use tokio::sync::watch;

use crate::config::Config;
use crate::error::Result;

/// Simulated platform persisted to a JSON file.
#[derive(Debug)]
pub struct FilePlatform {
    inner: SimulatedPlatform,
    path: PathBuf,
    reset_tx: watch::Sender<bool>,
}

impl FilePlatform {
    /// Load the state file, or create one seeded from `config`.
    pub fn open(config: &Config, reset_tx: watch::Sender<bool>) -> Result<Self> {
        let path = config.state_path.clone();

        let store = if path.exists() {
            let json = fs::read_to_string(&path)?;
            let store = StateStore::from_json(&json)?;
            if store.dual_system != config.dual_system {
                tracing::warn!(
                    stored = store.dual_system,
                    configured = config.dual_system,
                    "DUAL_SYSTEM ignored, state file wins"
                );
            }
            tracing::info!(path = %path.display(), boot_count = store.boot_count, "Loaded platform state");
            store
        } else {
            let store = if config.dual_system {
                StateStore::dual_system()
            } else {
                StateStore::single_system()
            };
            tracing::info!(path = %path.display(), "Creating fresh platform state");
            store.with_versions(
                config.firmware_version.clone(),
                config.bootloader_version.clone(),
            )
        };

        let platform = Self {
            inner: SimulatedPlatform::new(store),
            path,
            reset_tx,
        };
        platform.persist()?;
        Ok(platform)
    }

    /// The current persisted record.
    pub fn store(&self) -> &StateStore {
        self.inner.store()
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> EngineResult<()> {
        let json = self.inner.store().to_json_pretty()?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| Error::Fault(format!("state write {}: {}", self.path.display(), e)))
    }

    /// Run a mutating primitive and persist its effect.
    ///
    /// Memory never runs ahead of the file: if the write fails, the store is rolled
    /// back to what is on disk and the primitive reports a fault.
    fn persisted<T>(
        &mut self,
        op: impl FnOnce(&mut SimulatedPlatform) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let before = self.inner.store().clone();
        let result = op(&mut self.inner);

        if let Err(e) = self.persist() {
            tracing::error!(error = %e, "failed to persist platform state, rolling back");
            *self.inner.store_mut() = before;
            return match result {
                Ok(_) => Err(e),
                Err(op_err) => Err(op_err),
            };
        }
        result
    }
}

impl PlatformAdapter for FilePlatform {
    fn check_sync(&mut self) -> EngineResult<bool> {
        self.inner.check_sync()
    }

    fn sync(&mut self) -> EngineResult<()> {
        self.persisted(|p| p.sync())
    }

    fn swap(&mut self, force_sync: bool) -> EngineResult<()> {
        self.persisted(|p| p.swap(force_sync))
    }

    fn get_sync_state(&mut self) -> EngineResult<bool> {
        self.inner.get_sync_state()
    }

    fn set_state(&mut self, state: UpdateState) -> EngineResult<()> {
        self.persisted(|p| p.set_state(state))
    }

    fn nvup_apply(&mut self) -> EngineResult<()> {
        self.persisted(|p| p.nvup_apply())
    }

    fn reset(&mut self) {
        self.inner.reset();
        if let Err(e) = self.persist() {
            tracing::error!(error = %e, "failed to persist state before reset");
        }
        tracing::warn!("Device reset requested");
        self.reset_tx.send_replace(true);
    }

    fn download(&mut self, handle: &TransferHandle) -> EngineResult<()> {
        self.persisted(|p| p.download(handle))
    }

    fn firmware_version(&mut self, capacity: usize) -> EngineResult<String> {
        self.inner.firmware_version(capacity)
    }

    fn bootloader_version(&mut self, capacity: usize) -> EngineResult<String> {
        self.inner.bootloader_version(capacity)
    }
}
