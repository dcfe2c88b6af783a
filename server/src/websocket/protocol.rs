//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded, tagged by `type`, and use snake_case for field names.

use fwupdate_engine::{Error, Outcome, SwapKind, VersionKind};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Download the image at `path` into the UPDATE system.
    ///
    /// The daemon opens `path` itself, so the handle it passes on is always valid; an
    /// unopenable path is a bad parameter and never kills the session. The negative
    /// handle rule applies to in-process callers of the engine.
    Download {
        /// Image file readable by the daemon
        path: String,
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Read the ACTIVE firmware version.
    GetFirmwareVersion {
        /// Caller buffer size; absent means no buffer
        #[serde(default)]
        capacity: Option<usize>,
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Read the bootloader version.
    GetBootloaderVersion {
        #[serde(default)]
        capacity: Option<usize>,
        #[serde(default)]
        request_id: Option<String>,
    },

    DualSysSyncState {
        #[serde(default)]
        request_id: Option<String>,
    },

    DualSysSwap {
        #[serde(default)]
        request_id: Option<String>,
    },

    DualSysSync {
        #[serde(default)]
        request_id: Option<String>,
    },

    DualSysSwapAndSync {
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

impl ClientMessage {
    /// Request ID for correlating the response.
    pub fn request_id(&self) -> Option<String> {
        match self {
            ClientMessage::Download { request_id, .. }
            | ClientMessage::GetFirmwareVersion { request_id, .. }
            | ClientMessage::GetBootloaderVersion { request_id, .. }
            | ClientMessage::DualSysSyncState { request_id }
            | ClientMessage::DualSysSwap { request_id }
            | ClientMessage::DualSysSync { request_id }
            | ClientMessage::DualSysSwapAndSync { request_id } => request_id.clone(),
            ClientMessage::Ping => None,
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Operation completed with no value.
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// A version string.
    Version {
        kind: VersionKind,
        version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Dual-system sync flag.
    SyncState {
        is_sync: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// The requested swap was committed and the device is resetting.
    Resetting {
        kind: SwapKind,
        nvup_applied: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Sent to every session when the device goes down for a reset.
    DeviceResetting,

    /// Operation failed.
    Failed {
        outcome: Outcome,
        /// Numeric status code
        status: i32,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to ping.
    Pong,

    /// Malformed request.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// The session is being terminated for a contract violation.
    Killed { outcome: Outcome, reason: String },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }

    /// Create a failure reply from an engine error.
    pub fn failed(error: &Error, request_id: Option<String>) -> Self {
        ServerMessage::Failed {
            outcome: error.outcome(),
            status: error.status_code(),
            message: error.to_string(),
            request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialization() {
        let json = r#"{"type": "get_firmware_version", "capacity": 64, "request_id": "r1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::GetFirmwareVersion {
                capacity,
                request_id,
            } => {
                assert_eq!(capacity, Some(64));
                assert_eq!(request_id, Some("r1".to_string()));
            }
            _ => panic!("Expected GetFirmwareVersion message"),
        }

        let json = r#"{"type": "dual_sys_swap_and_sync"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::DualSysSwapAndSync { request_id: None }
        ));

        let json = r#"{"type": "ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_missing_capacity_is_null_buffer() {
        let json = r#"{"type": "get_bootloader_version"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::GetBootloaderVersion { capacity: None, .. }
        ));
    }

    #[test]
    fn test_request_id_extraction() {
        let json = r#"{"type": "download", "path": "/tmp/fw.cwe", "request_id": "d-1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.request_id(), Some("d-1".to_string()));
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Pong;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);

        let msg = ServerMessage::failed(
            &Error::Unsupported("swap".into()),
            Some("req-1".to_string()),
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"failed""#));
        assert!(json.contains(r#""outcome":"unsupported""#));
        assert!(json.contains(r#""status":-18"#));
        assert!(json.contains(r#""request_id":"req-1""#));

        let msg = ServerMessage::Resetting {
            kind: SwapKind::SwapAndSync,
            nvup_applied: true,
            request_id: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"resetting","kind":"swap_and_sync","nvup_applied":true}"#
        );
    }
}
