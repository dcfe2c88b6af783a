//! Platform adapter capability.
//!
//! The adapter owns flash I/O, the persisted State Store, NVUP packages and the
//! reboot primitive. The engine only sequences calls into it.

use crate::{download::TransferHandle, error::Result, UpdateState};

/// Primitives the controller consumes from the platform.
///
/// Every method is a blocking call against persistent state. Implementations are
/// used from one update transaction at a time.
pub trait PlatformAdapter {
    /// Report whether the UPDATE system is in sync with the ACTIVE system.
    fn check_sync(&mut self) -> Result<bool>;

    /// Make the UPDATE system content match the ACTIVE system.
    fn sync(&mut self) -> Result<()>;

    /// Commit a role swap. With `force_sync` the platform also syncs.
    fn swap(&mut self, force_sync: bool) -> Result<()>;

    /// Read the persisted sync flag.
    fn get_sync_state(&mut self) -> Result<bool>;

    /// Force the update-mode state.
    fn set_state(&mut self, state: UpdateState) -> Result<()>;

    /// Apply every pending NVUP package.
    fn nvup_apply(&mut self) -> Result<()>;

    /// Reboot the device.
    ///
    /// Hardware implementations never return. Simulated ones record the request and
    /// return so the caller can observe it.
    fn reset(&mut self);

    /// Write the image read from `handle` into the UPDATE system.
    fn download(&mut self, handle: &TransferHandle) -> Result<()>;

    /// Firmware version string, at most `capacity - 1` bytes.
    fn firmware_version(&mut self, capacity: usize) -> Result<String>;

    /// Bootloader version string, at most `capacity - 1` bytes.
    fn bootloader_version(&mut self, capacity: usize) -> Result<String>;
}

impl<A: PlatformAdapter + ?Sized> PlatformAdapter for Box<A> {
    fn check_sync(&mut self) -> Result<bool> {
        (**self).check_sync()
    }

    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }

    fn swap(&mut self, force_sync: bool) -> Result<()> {
        (**self).swap(force_sync)
    }

    fn get_sync_state(&mut self) -> Result<bool> {
        (**self).get_sync_state()
    }

    fn set_state(&mut self, state: UpdateState) -> Result<()> {
        (**self).set_state(state)
    }

    fn nvup_apply(&mut self) -> Result<()> {
        (**self).nvup_apply()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn download(&mut self, handle: &TransferHandle) -> Result<()> {
        (**self).download(handle)
    }

    fn firmware_version(&mut self, capacity: usize) -> Result<String> {
        (**self).firmware_version(capacity)
    }

    fn bootloader_version(&mut self, capacity: usize) -> Result<String> {
        (**self).bootloader_version(capacity)
    }
}
