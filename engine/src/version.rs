//! Firmware and bootloader version queries.

use crate::{
    adapter::PlatformAdapter,
    error::{Error, LocalStatus, Result},
    session::ClientSession,
};
use serde::{Deserialize, Serialize};

/// Which version string to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Firmware,
    Bootloader,
}

/// Read a version string into a caller buffer of `capacity` bytes.
///
/// `None` stands for a null destination buffer, which is a caller bug and kills the
/// session. A zero capacity is an ordinary argument error.
pub fn query_version<A: PlatformAdapter + ?Sized>(
    adapter: &mut A,
    session: &mut ClientSession,
    kind: VersionKind,
    capacity: Option<usize>,
) -> Result<String> {
    let Some(capacity) = capacity else {
        let reason = "version buffer is null";
        session.kill(reason);
        return Err(Error::ClientKilled {
            reason: reason.to_string(),
            reported: LocalStatus::Fault,
        });
    };

    if capacity == 0 {
        tracing::error!(?kind, "parameter error: zero-length version buffer");
        return Err(Error::BadParameter(
            "version buffer capacity is zero".to_string(),
        ));
    }

    match kind {
        VersionKind::Firmware => adapter.firmware_version(capacity),
        VersionKind::Bootloader => adapter.bootloader_version(capacity),
    }
}

/// Fit `version` into a buffer of `capacity` bytes including the terminator.
pub(crate) fn fit(version: &str, capacity: usize) -> Result<String> {
    if version.len() >= capacity {
        return Err(Error::Fault(format!(
            "version needs {} bytes, buffer holds {}",
            version.len() + 1,
            capacity
        )));
    }
    Ok(version.to_string())
}
