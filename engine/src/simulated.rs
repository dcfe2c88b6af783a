//! In-memory platform adapter.
//!
//! `SimulatedPlatform` implements every platform primitive against a [`StateStore`],
//! records each call in order, and can be told to fail individual primitives. Tests use
//! the call log to check sequencing; the host daemon uses it as its backend.

use crate::{
    adapter::PlatformAdapter,
    download::TransferHandle,
    error::{Error, Result},
    state::StateStore,
    version, UpdateState,
};
use std::collections::HashSet;
use std::fs::File;
use std::io;

/// Platform primitives, for call accounting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    CheckSync,
    Sync,
    Swap,
    GetSyncState,
    SetState,
    NvupApply,
    Reset,
    Download,
    FirmwareVersion,
    BootloaderVersion,
}

/// Simulated platform over an in-memory State Store.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    store: StateStore,
    calls: Vec<Primitive>,
    swap_requests: Vec<bool>,
    failing: HashSet<Primitive>,
    partition_writes: u64,
    reset_requested: bool,
}

impl SimulatedPlatform {
    /// Create a platform backed by `store`.
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            calls: Vec::new(),
            swap_requests: Vec::new(),
            failing: HashSet::new(),
            partition_writes: 0,
            reset_requested: false,
        }
    }

    /// The persisted record.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Mutable persisted record, for seeding test fixtures.
    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    /// Consume the platform, keeping only what survives a reset.
    pub fn into_store(self) -> StateStore {
        self.store
    }

    /// Make `primitive` fail with a fault until healed.
    pub fn fail(&mut self, primitive: Primitive) {
        self.failing.insert(primitive);
    }

    /// Stop failing `primitive`.
    pub fn heal(&mut self, primitive: Primitive) {
        self.failing.remove(&primitive);
    }

    /// Number of times `primitive` was invoked.
    pub fn calls(&self, primitive: Primitive) -> usize {
        self.calls.iter().filter(|p| **p == primitive).count()
    }

    /// Every invocation, in order.
    pub fn call_log(&self) -> &[Primitive] {
        &self.calls
    }

    /// The `force_sync` argument of each swap request, in order.
    pub fn swap_requests(&self) -> &[bool] {
        &self.swap_requests
    }

    /// Partition-set writes performed by download and sync.
    pub fn partition_writes(&self) -> u64 {
        self.partition_writes
    }

    /// Whether a reset was requested since the last boot.
    pub fn reset_requested(&self) -> bool {
        self.reset_requested
    }

    /// Bring the device back up after a reset.
    pub fn reboot(&mut self) {
        self.reset_requested = false;
    }

    fn record(&mut self, primitive: Primitive) {
        self.calls.push(primitive);
    }

    fn inject(&self, primitive: Primitive) -> Result<()> {
        if self.failing.contains(&primitive) {
            return Err(Error::Fault(format!("injected {:?} failure", primitive)));
        }
        Ok(())
    }

    fn require_dual_system(&self, what: &str) -> Result<()> {
        if !self.store.dual_system {
            return Err(Error::Unsupported(format!(
                "{} needs dual-system hardware",
                what
            )));
        }
        Ok(())
    }

    fn copy_active_to_update(&mut self) {
        if self.store.contents_match() {
            return;
        }
        let roles = self.store.roles();
        let image = self.store.partition(roles.active()).clone();
        *self.store.partition_mut(roles.update()) = image;
        self.partition_writes += 1;
    }

    fn read_image(handle: &TransferHandle) -> Result<u64> {
        let path = format!("/proc/self/fd/{}", handle.raw());
        let mut file = File::open(&path).map_err(|e| {
            Error::Fault(format!("cannot open transfer handle {}: {}", handle.raw(), e))
        })?;
        let bytes = io::copy(&mut file, &mut io::sink())
            .map_err(|e| Error::Fault(format!("image read failed: {}", e)))?;
        if bytes == 0 {
            return Err(Error::Fault("transfer handle yielded no data".to_string()));
        }
        Ok(bytes)
    }
}

impl PlatformAdapter for SimulatedPlatform {
    fn check_sync(&mut self) -> Result<bool> {
        self.record(Primitive::CheckSync);
        self.require_dual_system("sync check")?;
        self.inject(Primitive::CheckSync)?;
        Ok(self.store.synced && self.store.update_state == UpdateState::Normal)
    }

    fn sync(&mut self) -> Result<()> {
        self.record(Primitive::Sync);
        self.require_dual_system("sync")?;
        self.store.update_state = UpdateState::Syncing;
        // A failed sync leaves the platform in update mode.
        self.inject(Primitive::Sync)?;
        self.copy_active_to_update();
        self.store.synced = true;
        self.store.update_state = UpdateState::Normal;
        Ok(())
    }

    fn swap(&mut self, force_sync: bool) -> Result<()> {
        self.record(Primitive::Swap);
        self.swap_requests.push(force_sync);
        self.require_dual_system("swap")?;
        self.inject(Primitive::Swap)?;
        self.store.swap_roles();
        if force_sync {
            self.copy_active_to_update();
            self.store.synced = true;
        }
        Ok(())
    }

    fn get_sync_state(&mut self) -> Result<bool> {
        self.record(Primitive::GetSyncState);
        self.require_dual_system("sync state")?;
        self.inject(Primitive::GetSyncState)?;
        Ok(self.store.synced)
    }

    fn set_state(&mut self, state: UpdateState) -> Result<()> {
        self.record(Primitive::SetState);
        self.require_dual_system("update state")?;
        self.inject(Primitive::SetState)?;
        self.store.update_state = state;
        Ok(())
    }

    fn nvup_apply(&mut self) -> Result<()> {
        self.record(Primitive::NvupApply);
        self.inject(Primitive::NvupApply)?;
        let target = self.store.roles().active();
        let drained: Vec<_> = self.store.pending_nvup.drain(..).collect();
        for mut package in drained {
            package.applied_to = Some(target);
            self.store.applied_nvup.push(package);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.record(Primitive::Reset);
        self.store.boot_count += 1;
        self.reset_requested = true;
    }

    fn download(&mut self, handle: &TransferHandle) -> Result<()> {
        self.record(Primitive::Download);
        self.inject(Primitive::Download)?;
        let image_bytes = Self::read_image(handle)?;

        let revision = self.store.allocate_revision();
        let update = self.store.roles().update();
        *self.store.partition_mut(update) = crate::state::Partition {
            revision,
            image_bytes,
            firmware_version: None,
        };
        self.partition_writes += 1;
        self.store.synced = false;
        Ok(())
    }

    fn firmware_version(&mut self, capacity: usize) -> Result<String> {
        self.record(Primitive::FirmwareVersion);
        self.inject(Primitive::FirmwareVersion)?;
        let active = self.store.roles().active();
        match &self.store.partition(active).firmware_version {
            Some(v) => version::fit(v, capacity),
            None => Err(Error::NotFound("firmware version not available".to_string())),
        }
    }

    fn bootloader_version(&mut self, capacity: usize) -> Result<String> {
        self.record(Primitive::BootloaderVersion);
        self.inject(Primitive::BootloaderVersion)?;
        match &self.store.bootloader_version {
            Some(v) => version::fit(v, capacity),
            None => Err(Error::NotFound("bootloader version not available".to_string())),
        }
    }
}
