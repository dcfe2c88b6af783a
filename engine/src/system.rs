//! Dual-system data model.
//!
//! A device carries two physical partition sets. At any time one of them holds the
//! ACTIVE role and the other the UPDATE role. [`RoleAssignment`] stores only which set
//! is ACTIVE and derives the UPDATE set, so the two roles can never collide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A physical firmware partition set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemId {
    First,
    Second,
}

impl SystemId {
    /// The other partition set.
    pub fn other(self) -> Self {
        match self {
            SystemId::First => SystemId::Second,
            SystemId::Second => SystemId::First,
        }
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemId::First => write!(f, "system-1"),
            SystemId::Second => write!(f, "system-2"),
        }
    }
}

/// Role a partition set plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemRole {
    /// Currently booted and running
    Active,
    /// Staged to become active after a swap
    Update,
}

/// Which physical set holds which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    active: SystemId,
}

impl RoleAssignment {
    /// Create an assignment with `active` as the ACTIVE set.
    pub fn new(active: SystemId) -> Self {
        Self { active }
    }

    /// The ACTIVE set.
    pub fn active(&self) -> SystemId {
        self.active
    }

    /// The UPDATE set.
    pub fn update(&self) -> SystemId {
        self.active.other()
    }

    /// The set holding `role`.
    pub fn holder(&self, role: SystemRole) -> SystemId {
        match role {
            SystemRole::Active => self.active(),
            SystemRole::Update => self.update(),
        }
    }

    /// The role held by `system`.
    pub fn role_of(&self, system: SystemId) -> SystemRole {
        if system == self.active {
            SystemRole::Active
        } else {
            SystemRole::Update
        }
    }

    /// Exchange the roles.
    pub fn swap(&mut self) {
        self.active = self.active.other();
    }

    /// Return the swapped assignment.
    pub fn swapped(self) -> Self {
        Self {
            active: self.active.other(),
        }
    }
}

impl Default for RoleAssignment {
    fn default() -> Self {
        Self::new(SystemId::First)
    }
}

/// Update-mode state held by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// No update activity in progress
    #[default]
    Normal,
    /// A sync was started and has not completed
    Syncing,
}

/// Swap variants. The only difference is whether the platform must sync as part of
/// the swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapKind {
    /// Exchange roles; the platform decides whether to sync
    Swap,
    /// Exchange roles and force a sync
    SwapAndSync,
}

impl SwapKind {
    /// Value of the platform's `force_sync` flag for this swap.
    pub fn forces_sync(self) -> bool {
        matches!(self, SwapKind::SwapAndSync)
    }
}
