//! Download gatekeeper.
//!
//! Validates the transfer handle before handing it to the platform. An invalid handle
//! is a caller bug: the caller's session is killed and nothing is written.

use crate::{
    adapter::PlatformAdapter,
    error::{Error, LocalStatus, Result},
    session::ClientSession,
};

/// Raw descriptor number as passed over the wire.
pub type RawHandle = i32;

/// An open descriptor positioned at the start of a firmware image.
///
/// The handle does not own the descriptor; whoever opened it keeps it alive for the
/// duration of the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferHandle {
    fd: RawHandle,
}

impl TransferHandle {
    /// Wrap a raw descriptor number. No validation happens here.
    pub fn from_raw(fd: RawHandle) -> Self {
        Self { fd }
    }

    /// The raw descriptor number.
    pub fn raw(&self) -> RawHandle {
        self.fd
    }

    /// Whether the descriptor number can refer to an open file.
    pub fn is_valid(&self) -> bool {
        self.fd >= 0
    }
}

#[cfg(unix)]
impl From<&std::fs::File> for TransferHandle {
    fn from(file: &std::fs::File) -> Self {
        use std::os::fd::AsRawFd;
        Self::from_raw(file.as_raw_fd())
    }
}

/// Download an image into the UPDATE system.
///
/// On success the UPDATE content has changed, so the platform's sync flag is false.
pub fn download<A: PlatformAdapter + ?Sized>(
    adapter: &mut A,
    session: &mut ClientSession,
    handle: &TransferHandle,
) -> Result<()> {
    if !handle.is_valid() {
        let reason = "'fd' is negative";
        session.kill(reason);
        return Err(Error::ClientKilled {
            reason: reason.to_string(),
            reported: LocalStatus::BadParameter,
        });
    }

    let result = adapter.download(handle);
    tracing::debug!(fd = handle.raw(), ok = result.is_ok(), "platform download");
    result
}
