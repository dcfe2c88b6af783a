//! Service entry points.
//!
//! These are the procedures a transport exposes to callers. A service can only be
//! obtained through [`FwUpdateService::start`], which runs startup reconciliation
//! first, so no caller operation is ever dispatched before it completes.
//!
//! Every call takes the caller's [`ClientSession`]. Calls from a session that was
//! already killed are refused.

use crate::{
    adapter::PlatformAdapter,
    controller::{BootSession, DualSystemController, ReconcileReport, Resetting},
    download::{RawHandle, TransferHandle},
    error::{Error, LocalStatus, Result},
    session::ClientSession,
    version::VersionKind,
};

/// Firmware update service over a platform adapter.
#[derive(Debug)]
pub struct FwUpdateService<A> {
    controller: DualSystemController<A>,
    startup: ReconcileReport,
}

impl<A: PlatformAdapter> FwUpdateService<A> {
    /// Start the service: reconcile, then accept calls.
    pub fn start(adapter: A, boot: BootSession) -> Self {
        let mut controller = DualSystemController::new(adapter, boot);
        let startup = controller.reconcile_at_startup();
        if startup.is_clean() {
            tracing::info!(?startup, "startup reconciliation complete");
        } else {
            tracing::error!(?startup, "startup reconciliation degraded");
        }
        Self {
            controller,
            startup,
        }
    }

    /// What startup reconciliation did.
    pub fn startup_report(&self) -> &ReconcileReport {
        &self.startup
    }

    /// The underlying controller.
    pub fn controller(&self) -> &DualSystemController<A> {
        &self.controller
    }

    /// The platform adapter.
    pub fn adapter(&self) -> &A {
        self.controller.adapter()
    }

    /// Mutable platform adapter.
    pub fn adapter_mut(&mut self) -> &mut A {
        self.controller.adapter_mut()
    }

    /// Whether a committed swap has requested a reset.
    pub fn is_resetting(&self) -> bool {
        self.controller.resetting().is_some()
    }

    fn admit(session: &ClientSession) -> Result<()> {
        match session.kill_reason() {
            Some(reason) => Err(Error::ClientKilled {
                reason: reason.to_string(),
                reported: LocalStatus::Fault,
            }),
            None => Ok(()),
        }
    }

    /// Download the image behind descriptor `fd` into the UPDATE system.
    pub fn download(&mut self, session: &mut ClientSession, fd: RawHandle) -> Result<()> {
        self.download_handle(session, &TransferHandle::from_raw(fd))
    }

    /// Download the image behind `handle` into the UPDATE system.
    pub fn download_handle(
        &mut self,
        session: &mut ClientSession,
        handle: &TransferHandle,
    ) -> Result<()> {
        Self::admit(session)?;
        let result = self.controller.download(session, handle);
        tracing::debug!(session = session.id(), ?result, "download");
        result
    }

    /// Firmware version of the ACTIVE system.
    ///
    /// `capacity` is the caller's buffer size; `None` means no buffer.
    pub fn get_firmware_version(
        &mut self,
        session: &mut ClientSession,
        capacity: Option<usize>,
    ) -> Result<String> {
        Self::admit(session)?;
        self.controller
            .version(session, VersionKind::Firmware, capacity)
    }

    /// Bootloader version.
    pub fn get_bootloader_version(
        &mut self,
        session: &mut ClientSession,
        capacity: Option<usize>,
    ) -> Result<String> {
        Self::admit(session)?;
        self.controller
            .version(session, VersionKind::Bootloader, capacity)
    }

    /// Whether ACTIVE and UPDATE are synchronized.
    #[deprecated(note = "dual-system sync state is kept for legacy callers")]
    pub fn dual_sys_sync_state(&mut self, session: &mut ClientSession) -> Result<bool> {
        Self::admit(session)?;
        let result = self.controller.sync_state();
        tracing::debug!(session = session.id(), ?result, "dual sys sync state");
        result
    }

    /// Swap ACTIVE and UPDATE, then reset.
    #[deprecated(note = "dual-system swap is kept for legacy callers")]
    pub fn dual_sys_swap(&mut self, session: &mut ClientSession) -> Result<Resetting> {
        Self::admit(session)?;
        let result = self.controller.swap();
        tracing::debug!(session = session.id(), ?result, "dual sys swap");
        result
    }

    /// Make UPDATE match ACTIVE.
    #[deprecated(note = "dual-system sync is kept for legacy callers")]
    pub fn dual_sys_sync(&mut self, session: &mut ClientSession) -> Result<()> {
        Self::admit(session)?;
        let result = self.controller.sync();
        tracing::debug!(session = session.id(), ?result, "dual sys sync");
        result
    }

    /// Swap ACTIVE and UPDATE with a forced sync, then reset.
    #[deprecated(note = "dual-system swap is kept for legacy callers")]
    pub fn dual_sys_swap_and_sync(&mut self, session: &mut ClientSession) -> Result<Resetting> {
        Self::admit(session)?;
        let result = self.controller.swap_and_sync();
        tracing::debug!(session = session.id(), ?result, "dual sys swap and sync");
        result
    }
}
