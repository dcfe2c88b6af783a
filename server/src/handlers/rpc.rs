//! Request dispatch into the firmware update service.
//!
//! Engine calls are blocking and may touch the state file, so they run on the blocking
//! pool. The service lock serializes callers; a reset may be requested while it is held.

use std::fs::File;
use std::sync::{Arc, Mutex};

use fwupdate_engine::{
    ClientSession, Error, FwUpdateService, PlatformAdapter, Resetting, TransferHandle,
    VersionKind,
};

use crate::websocket::{ClientMessage, ServerMessage};

/// Service shared across sessions.
pub type SharedService<A> = Arc<Mutex<FwUpdateService<A>>>;

/// Run one request on the blocking pool.
///
/// Returns the session back, possibly killed, along with the reply.
pub async fn dispatch<A>(
    service: SharedService<A>,
    session: ClientSession,
    request: ClientMessage,
) -> (ClientSession, ServerMessage)
where
    A: PlatformAdapter + Send + 'static,
{
    let fallback = session.clone();
    let request_id = request.request_id();

    let joined = tokio::task::spawn_blocking(move || {
        let mut session = session;
        let reply = match service.lock() {
            Ok(mut guard) => execute(&mut guard, &mut session, request),
            Err(_) => {
                tracing::error!("service lock poisoned");
                ServerMessage::failed(
                    &Error::Fault("service unavailable".to_string()),
                    request.request_id(),
                )
            }
        };
        (session, reply)
    })
    .await;

    match joined {
        Ok(done) => done,
        Err(e) => {
            tracing::error!(error = %e, "request task failed");
            (
                fallback,
                ServerMessage::failed(&Error::Fault("request aborted".to_string()), request_id),
            )
        }
    }
}

/// Execute one request against the service.
#[allow(deprecated)]
pub fn execute<A: PlatformAdapter>(
    service: &mut FwUpdateService<A>,
    session: &mut ClientSession,
    request: ClientMessage,
) -> ServerMessage {
    match request {
        ClientMessage::Download { path, request_id } => {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(session = session.id(), path = %path, error = %e, "cannot open image");
                    return ServerMessage::failed(
                        &Error::BadParameter(format!("cannot open {}: {}", path, e)),
                        request_id,
                    );
                }
            };
            // The descriptor stays open until the download returns.
            let handle = TransferHandle::from(&file);
            done(service.download_handle(session, &handle), request_id)
        }

        ClientMessage::GetFirmwareVersion {
            capacity,
            request_id,
        } => version(
            service.get_firmware_version(session, capacity),
            VersionKind::Firmware,
            request_id,
        ),

        ClientMessage::GetBootloaderVersion {
            capacity,
            request_id,
        } => version(
            service.get_bootloader_version(session, capacity),
            VersionKind::Bootloader,
            request_id,
        ),

        ClientMessage::DualSysSyncState { request_id } => {
            match service.dual_sys_sync_state(session) {
                Ok(is_sync) => ServerMessage::SyncState {
                    is_sync,
                    request_id,
                },
                Err(e) => ServerMessage::failed(&e, request_id),
            }
        }

        ClientMessage::DualSysSwap { request_id } => {
            resetting(service.dual_sys_swap(session), request_id)
        }

        ClientMessage::DualSysSync { request_id } => {
            done(service.dual_sys_sync(session), request_id)
        }

        ClientMessage::DualSysSwapAndSync { request_id } => {
            resetting(service.dual_sys_swap_and_sync(session), request_id)
        }

        ClientMessage::Ping => ServerMessage::Pong,
    }
}

fn done(result: fwupdate_engine::error::Result<()>, request_id: Option<String>) -> ServerMessage {
    match result {
        Ok(()) => ServerMessage::Done { request_id },
        Err(e) => ServerMessage::failed(&e, request_id),
    }
}

fn version(
    result: fwupdate_engine::error::Result<String>,
    kind: VersionKind,
    request_id: Option<String>,
) -> ServerMessage {
    match result {
        Ok(version) => ServerMessage::Version {
            kind,
            version,
            request_id,
        },
        Err(e) => ServerMessage::failed(&e, request_id),
    }
}

fn resetting(
    result: fwupdate_engine::error::Result<Resetting>,
    request_id: Option<String>,
) -> ServerMessage {
    match result {
        Ok(resetting) => ServerMessage::Resetting {
            kind: resetting.kind(),
            nvup_applied: resetting.nvup_applied(),
            request_id,
        },
        Err(e) => ServerMessage::failed(&e, request_id),
    }
}
