//! # Firmware Update Engine
//!
//! Dual-system firmware update control for devices with two redundant partition sets.
//!
//! One set is ACTIVE (booted), the other is UPDATE (staged for the next boot). This
//! crate keeps the two in a known relationship across image downloads, swaps and
//! resets. All flash I/O, persisted state and the reboot primitive belong to a
//! [`PlatformAdapter`]; the engine decides what to call and in which order.
//!
//! ## Design Principles
//!
//! - **No transport**: callers reach the engine through [`FwUpdateService`]; how their
//!   requests arrive is someone else's concern
//! - **One transaction at a time**: every operation takes `&mut self`
//! - **No hidden state**: the only process-lifetime state is the [`BootSession`]
//!   passed in at construction
//! - **Irrevocable swaps**: a committed swap always applies NVUP packages and resets,
//!   and yields a [`Resetting`] token instead of a normal return value
//!
//! ## Core Concepts
//!
//! ### Roles
//!
//! [`RoleAssignment`] records which [`SystemId`] is ACTIVE. The UPDATE set is always
//! the other one.
//!
//! ### Operations
//!
//! - [`DualSystemController::sync`] - make UPDATE match ACTIVE
//! - [`DualSystemController::swap`] - exchange roles and reset
//! - [`DualSystemController::swap_and_sync`] - exchange roles, force a sync, reset
//! - [`DualSystemController::reconcile_at_startup`] - once per boot, sync if needed and
//!   fall back to normal mode when that fails
//!
//! ### Outcomes
//!
//! Every call resolves to one [`Outcome`]. Caller bugs (negative descriptor, null
//! buffer) kill the caller's [`ClientSession`] instead of returning quietly.
//!
//! ## Quick Start
//!
//! ```rust
//! use fwupdate_engine::{
//!     BootSession, ClientSession, FwUpdateService, ReconcileReport, SimulatedPlatform,
//!     StateStore,
//! };
//!
//! // A fresh device whose UPDATE system has never been synced
//! let platform = SimulatedPlatform::new(StateStore::dual_system());
//!
//! // Starting the service reconciles before any call is accepted
//! let mut service = FwUpdateService::start(platform, BootSession::new());
//! assert_eq!(service.startup_report(), &ReconcileReport::Synced);
//!
//! // A negative descriptor is a caller bug
//! let mut session = ClientSession::new("client-1");
//! assert!(service.download(&mut session, -1).is_err());
//! assert!(session.is_killed());
//! ```

pub mod adapter;
pub mod controller;
pub mod download;
pub mod error;
pub mod service;
pub mod session;
pub mod simulated;
pub mod state;
pub mod system;
pub mod version;

// Re-export main types at crate root
pub use adapter::PlatformAdapter;
pub use controller::{BootSession, DualSystemController, ReconcileReport, Resetting};
pub use download::{RawHandle, TransferHandle};
pub use error::{Error, LocalStatus, Outcome};
pub use service::FwUpdateService;
pub use session::ClientSession;
pub use simulated::{Primitive, SimulatedPlatform};
pub use state::{NvupPackage, Partition, StateStore, STATE_FORMAT_VERSION};
pub use system::{RoleAssignment, SwapKind, SystemId, SystemRole, UpdateState};
pub use version::VersionKind;
