//! Dual-system controller.
//!
//! Each operation is a short transaction against the platform's persisted state.
//! There is no "current state" field here; the only process-lifetime state is the
//! [`BootSession`] handed in at construction and whether a reset has been requested.
//!
//! # Swap sequence
//!
//! ```text
//! swap(force_sync) --ok--> nvup_apply (best effort) --> reset --> Resetting
//!        |
//!        +--err--> error returned, nothing else runs
//! ```
//!
//! Once the platform accepts the swap the reset is unconditional. [`Resetting`] can
//! only be built on that path and carries nothing to continue with.
//!
//! # Startup reconciliation
//!
//! Runs at most once per [`BootSession`]. If the platform reports the systems out of
//! sync it runs the same sync as [`DualSystemController::sync`]. Unlike the
//! caller-driven sync, a failure here forces the platform back to
//! [`UpdateState::Normal`], since no caller is connected yet to retry.

use crate::{
    adapter::PlatformAdapter,
    download::{self, TransferHandle},
    error::{Error, Result},
    session::ClientSession,
    version::{self, VersionKind},
    SwapKind, UpdateState,
};
use serde::{Deserialize, Serialize};

/// Process-lifetime record of whether startup reconciliation has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootSession {
    reconciled: bool,
}

impl BootSession {
    /// A fresh process that has not reconciled yet.
    pub fn new() -> Self {
        Self { reconciled: false }
    }

    /// A process that has already reconciled.
    pub fn reconciled() -> Self {
        Self { reconciled: true }
    }

    /// Whether reconciliation has run.
    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }
}

/// What startup reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileReport {
    /// Reconciliation had already run for this boot
    AlreadyRun,
    /// Platform has no dual-system support
    Unsupported,
    /// Sync check failed; nothing was attempted
    CheckFailed { error: String },
    /// Systems were already in sync
    InSync,
    /// Systems were out of sync and a sync succeeded
    Synced,
    /// Sync failed and the platform was forced back to normal mode
    FellBackToNormal { sync_error: String },
    /// Sync failed and so did the fallback
    FallbackFailed {
        sync_error: String,
        fallback_error: String,
    },
}

impl ReconcileReport {
    /// Whether the device ended up in a known-good state.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            ReconcileReport::AlreadyRun
                | ReconcileReport::Unsupported
                | ReconcileReport::InSync
                | ReconcileReport::Synced
        )
    }
}

/// A committed swap whose reset has been requested.
///
/// Only a successful commit produces this. Nothing may run against the platform
/// after it is returned.
#[must_use = "a committed swap ends in a device reset"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resetting {
    kind: SwapKind,
    nvup_applied: bool,
}

impl Resetting {
    /// Which swap was committed.
    pub fn kind(&self) -> SwapKind {
        self.kind
    }

    /// Whether pending NVUP packages applied cleanly before the reset.
    pub fn nvup_applied(&self) -> bool {
        self.nvup_applied
    }
}

/// Orchestrates sync and swap operations over a platform adapter.
#[derive(Debug)]
pub struct DualSystemController<A> {
    adapter: A,
    boot: BootSession,
    resetting: Option<Resetting>,
}

impl<A: PlatformAdapter> DualSystemController<A> {
    /// Create a controller over `adapter` for the given boot.
    pub fn new(adapter: A, boot: BootSession) -> Self {
        Self {
            adapter,
            boot,
            resetting: None,
        }
    }

    /// The platform adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Mutable platform adapter.
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// Consume the controller and return the adapter.
    pub fn into_adapter(self) -> A {
        self.adapter
    }

    /// The boot session.
    pub fn boot(&self) -> BootSession {
        self.boot
    }

    /// The committed swap, if a reset has been requested.
    pub fn resetting(&self) -> Option<Resetting> {
        self.resetting
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.resetting {
            Some(_) => Err(Error::ResetInProgress),
            None => Ok(()),
        }
    }

    /// Bring UPDATE and ACTIVE back in sync if a previous boot left them apart.
    ///
    /// Never fails: problems are logged and reported.
    pub fn reconcile_at_startup(&mut self) -> ReconcileReport {
        if self.boot.reconciled {
            return ReconcileReport::AlreadyRun;
        }
        self.boot.reconciled = true;

        let in_sync = match self.adapter.check_sync() {
            Ok(in_sync) => in_sync,
            Err(Error::Unsupported(_)) => {
                tracing::debug!("startup sync check unsupported on this platform");
                return ReconcileReport::Unsupported;
            }
            Err(e) => {
                tracing::error!(error = %e, "startup sync check failed");
                return ReconcileReport::CheckFailed {
                    error: e.to_string(),
                };
            }
        };
        tracing::debug!(in_sync, "startup sync check");

        if in_sync {
            return ReconcileReport::InSync;
        }

        let sync_error = match self.run_sync() {
            Ok(()) => return ReconcileReport::Synced,
            Err(e) => e,
        };
        tracing::error!(error = %sync_error, "startup sync failed, forcing normal mode");

        match self.adapter.set_state(UpdateState::Normal) {
            Ok(()) => ReconcileReport::FellBackToNormal {
                sync_error: sync_error.to_string(),
            },
            Err(fallback_error) => {
                tracing::error!(error = %fallback_error, "normal mode fallback failed");
                ReconcileReport::FallbackFailed {
                    sync_error: sync_error.to_string(),
                    fallback_error: fallback_error.to_string(),
                }
            }
        }
    }

    /// Make the UPDATE system match the ACTIVE system.
    ///
    /// A failure is returned as-is; the caller is expected to retry.
    pub fn sync(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.run_sync()
    }

    fn run_sync(&mut self) -> Result<()> {
        let result = self.adapter.sync();
        tracing::debug!(ok = result.is_ok(), "platform sync");
        result
    }

    /// Swap roles, letting the platform decide whether to sync, then reset.
    pub fn swap(&mut self) -> Result<Resetting> {
        self.commit(SwapKind::Swap)
    }

    /// Swap roles with a forced sync, then reset.
    pub fn swap_and_sync(&mut self) -> Result<Resetting> {
        self.commit(SwapKind::SwapAndSync)
    }

    /// Commit a swap of the given kind.
    pub fn commit(&mut self, kind: SwapKind) -> Result<Resetting> {
        self.ensure_ready()?;

        let force_sync = kind.forces_sync();
        if let Err(e) = self.adapter.swap(force_sync) {
            tracing::debug!(force_sync, error = %e, "platform swap rejected");
            return Err(e);
        }

        // Roles already changed; packages must land before the reset regardless.
        let nvup_applied = match self.adapter.nvup_apply() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "nvup apply failed, resetting anyway");
                false
            }
        };

        let resetting = Resetting { kind, nvup_applied };
        self.resetting = Some(resetting);
        tracing::info!(?kind, "swap committed, resetting device");
        self.adapter.reset();
        Ok(resetting)
    }

    /// Read the persisted sync flag.
    pub fn sync_state(&mut self) -> Result<bool> {
        self.ensure_ready()?;
        let result = self.adapter.get_sync_state();
        tracing::debug!(?result, "platform sync state");
        result
    }

    /// Download an image through the gatekeeper.
    pub fn download(&mut self, session: &mut ClientSession, handle: &TransferHandle) -> Result<()> {
        self.ensure_ready()?;
        download::download(&mut self.adapter, session, handle)
    }

    /// Read a version string.
    pub fn version(
        &mut self,
        session: &mut ClientSession,
        kind: VersionKind,
        capacity: Option<usize>,
    ) -> Result<String> {
        self.ensure_ready()?;
        version::query_version(&mut self.adapter, session, kind, capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Primitive, SimulatedPlatform, StateStore};

    fn controller(store: StateStore) -> DualSystemController<SimulatedPlatform> {
        DualSystemController::new(SimulatedPlatform::new(store), BootSession::new())
    }

    #[test]
    fn reconciliation_runs_once() {
        let mut ctl = controller(StateStore::dual_system());

        assert_eq!(ctl.reconcile_at_startup(), ReconcileReport::Synced);
        assert_eq!(ctl.reconcile_at_startup(), ReconcileReport::AlreadyRun);
        assert_eq!(ctl.adapter().calls(Primitive::CheckSync), 1);
        assert_eq!(ctl.adapter().calls(Primitive::Sync), 1);
        assert!(ctl.boot().is_reconciled());
    }

    #[test]
    fn reconciliation_skips_in_sync_device() {
        let mut store = StateStore::dual_system();
        store.synced = true;
        let mut ctl = controller(store);

        assert_eq!(ctl.reconcile_at_startup(), ReconcileReport::InSync);
        assert_eq!(ctl.adapter().calls(Primitive::Sync), 0);
    }

    #[test]
    fn reconciliation_never_swaps() {
        let mut ctl = controller(StateStore::dual_system());
        ctl.adapter_mut().fail(Primitive::Sync);

        let _ = ctl.reconcile_at_startup();

        assert_eq!(ctl.adapter().calls(Primitive::Swap), 0);
        assert_eq!(ctl.adapter().calls(Primitive::Reset), 0);
    }

    #[test]
    fn reconciliation_reports_fallback_failure() {
        let mut ctl = controller(StateStore::dual_system());
        ctl.adapter_mut().fail(Primitive::Sync);
        ctl.adapter_mut().fail(Primitive::SetState);

        let report = ctl.reconcile_at_startup();

        assert!(matches!(report, ReconcileReport::FallbackFailed { .. }));
        assert!(!report.is_clean());
    }

    #[test]
    fn reconciliation_check_failure_does_nothing() {
        let mut ctl = controller(StateStore::dual_system());
        ctl.adapter_mut().fail(Primitive::CheckSync);

        let report = ctl.reconcile_at_startup();

        assert!(matches!(report, ReconcileReport::CheckFailed { .. }));
        assert_eq!(ctl.adapter().calls(Primitive::Sync), 0);
        assert_eq!(ctl.adapter().calls(Primitive::SetState), 0);
    }

    #[test]
    fn already_reconciled_boot_skips_check() {
        let mut ctl = DualSystemController::new(
            SimulatedPlatform::new(StateStore::dual_system()),
            BootSession::reconciled(),
        );
        assert_eq!(ctl.reconcile_at_startup(), ReconcileReport::AlreadyRun);
        assert!(ctl.adapter().call_log().is_empty());
    }

    #[test]
    fn swap_and_sync_forces_sync_flag() {
        let mut ctl = controller(StateStore::dual_system());

        let resetting = ctl.swap_and_sync().unwrap();

        assert_eq!(resetting.kind(), SwapKind::SwapAndSync);
        assert!(resetting.nvup_applied());
        assert_eq!(ctl.adapter().swap_requests(), &[true]);
        assert!(ctl.adapter().store().synced);
    }

    #[test]
    fn nvup_failure_does_not_block_reset() {
        let mut ctl = controller(StateStore::dual_system());
        ctl.adapter_mut().fail(Primitive::NvupApply);

        let resetting = ctl.swap().unwrap();

        assert!(!resetting.nvup_applied());
        assert_eq!(ctl.adapter().calls(Primitive::Reset), 1);
    }

    #[test]
    fn failed_swap_does_not_reset() {
        let mut ctl = controller(StateStore::dual_system());
        ctl.adapter_mut().fail(Primitive::Swap);
        let roles = ctl.adapter().store().roles();

        assert!(matches!(ctl.swap(), Err(Error::Fault(_))));

        assert_eq!(ctl.adapter().calls(Primitive::NvupApply), 0);
        assert_eq!(ctl.adapter().calls(Primitive::Reset), 0);
        assert_eq!(ctl.adapter().store().roles(), roles);
        assert!(ctl.resetting().is_none());
    }

    #[test]
    fn operations_refused_after_commit() {
        let mut ctl = controller(StateStore::dual_system());
        let _ = ctl.swap().unwrap();
        let calls_before = ctl.adapter().call_log().len();

        assert_eq!(ctl.sync(), Err(Error::ResetInProgress));
        assert_eq!(ctl.sync_state(), Err(Error::ResetInProgress));
        assert_eq!(ctl.swap(), Err(Error::ResetInProgress));
        assert_eq!(ctl.adapter().call_log().len(), calls_before);
    }

    #[test]
    fn report_serialization() {
        let report = ReconcileReport::FellBackToNormal {
            sync_error: "fault: flash".into(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"result":"fell_back_to_normal","sync_error":"fault: flash"}"#
        );
    }
}
