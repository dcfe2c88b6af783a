//! Persisted State Store.
//!
//! This is the record a platform keeps across resets: which set is ACTIVE, whether the
//! UPDATE set is in sync, the update-mode state, partition descriptors and the NVUP
//! queue. It serializes to JSON with a format version for forward compatibility.

use crate::{
    error::{Error, Result},
    RoleAssignment, SystemId, UpdateState,
};
use serde::{Deserialize, Serialize};

/// Version of the state format.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Descriptor of one partition set's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    /// Content revision. Two sets with the same revision hold identical content.
    pub revision: u64,
    /// Size of the last written image
    pub image_bytes: u64,
    /// Version string, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
}

/// A staged non-volatile update package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvupPackage {
    pub name: String,
    /// Set once applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_to: Option<SystemId>,
}

impl NvupPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            applied_to: None,
        }
    }
}

/// The persisted platform record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateStore {
    /// State format version
    pub format_version: u32,
    /// Whether the hardware has two partition sets
    pub dual_system: bool,
    roles: RoleAssignment,
    /// UPDATE content is known identical to ACTIVE content
    pub synced: bool,
    pub update_state: UpdateState,
    first: Partition,
    second: Partition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootloader_version: Option<String>,
    #[serde(default)]
    pub pending_nvup: Vec<NvupPackage>,
    #[serde(default)]
    pub applied_nvup: Vec<NvupPackage>,
    pub boot_count: u64,
    next_revision: u64,
}

impl StateStore {
    /// A factory-fresh dual-system device: the ACTIVE set holds the factory image, the
    /// UPDATE set is blank and not in sync.
    pub fn dual_system() -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            dual_system: true,
            roles: RoleAssignment::default(),
            synced: false,
            update_state: UpdateState::Normal,
            first: Partition {
                revision: 1,
                ..Partition::default()
            },
            second: Partition::default(),
            bootloader_version: None,
            pending_nvup: Vec::new(),
            applied_nvup: Vec::new(),
            boot_count: 0,
            next_revision: 2,
        }
    }

    /// A device with a single partition set.
    pub fn single_system() -> Self {
        Self {
            dual_system: false,
            ..Self::dual_system()
        }
    }

    /// Seed version strings for the ACTIVE set and the bootloader.
    pub fn with_versions(mut self, firmware: Option<String>, bootloader: Option<String>) -> Self {
        let active = self.roles.active();
        self.partition_mut(active).firmware_version = firmware;
        self.bootloader_version = bootloader;
        self
    }

    /// Current role assignment.
    pub fn roles(&self) -> RoleAssignment {
        self.roles
    }

    /// Exchange ACTIVE and UPDATE.
    pub fn swap_roles(&mut self) {
        self.roles.swap();
    }

    /// Descriptor of a partition set.
    pub fn partition(&self, id: SystemId) -> &Partition {
        match id {
            SystemId::First => &self.first,
            SystemId::Second => &self.second,
        }
    }

    /// Mutable descriptor of a partition set.
    pub fn partition_mut(&mut self, id: SystemId) -> &mut Partition {
        match id {
            SystemId::First => &mut self.first,
            SystemId::Second => &mut self.second,
        }
    }

    /// Set the version string of a partition set.
    pub fn set_firmware_version(&mut self, id: SystemId, version: Option<String>) {
        self.partition_mut(id).firmware_version = version;
    }

    /// Whether both sets currently hold the same content.
    pub fn contents_match(&self) -> bool {
        self.first.revision == self.second.revision
    }

    /// Allocate a fresh content revision.
    pub fn allocate_revision(&mut self) -> u64 {
        let revision = self.next_revision;
        self.next_revision += 1;
        revision
    }

    /// Stage an NVUP package.
    pub fn stage_nvup(&mut self, package: NvupPackage) {
        self.pending_nvup.push(package);
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Fault(format!("state encode: {}", e)))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Fault(format!("state encode: {}", e)))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let store: Self = serde_json::from_str(json)
            .map_err(|e| Error::Fault(format!("state decode: {}", e)))?;

        if store.format_version > STATE_FORMAT_VERSION {
            return Err(Error::Fault(format!(
                "unsupported state format version: {} (max supported: {})",
                store.format_version, STATE_FORMAT_VERSION
            )));
        }

        Ok(store)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::dual_system()
    }
}
