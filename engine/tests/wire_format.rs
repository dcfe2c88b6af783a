//! Serialized forms of outcomes, reports and the State Store.

use fwupdate_engine::{
    error::status, Error, LocalStatus, Outcome, ReconcileReport, StateStore, SwapKind, SystemId,
    STATE_FORMAT_VERSION,
};
use serde_json::json;

#[cfg(test)]
mod reply_tests {
    use super::*;

    #[test]
    fn test_outcome_names() {
        assert_eq!(json!(Outcome::FatalClientError), json!("fatal_client_error"));
        assert_eq!(json!(Outcome::TransientFailure), json!("transient_failure"));
        assert_eq!(json!(Outcome::InvalidArgument), json!("invalid_argument"));
    }

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(status::OK, 0);
        assert_eq!(Error::NotFound("fw".into()).status_code(), -1);
        assert_eq!(Error::Fault("flash".into()).status_code(), -6);
        assert_eq!(Error::BadParameter("capacity".into()).status_code(), -15);
        assert_eq!(
            Error::ClientKilled {
                reason: "'fd' is negative".into(),
                reported: LocalStatus::BadParameter,
            }
            .status_code(),
            -15
        );
        assert_eq!(
            Error::ClientKilled {
                reason: "version buffer is null".into(),
                reported: LocalStatus::Fault,
            }
            .status_code(),
            -6
        );
        assert_eq!(Error::Unsupported("swap".into()).status_code(), -18);
    }

    #[test]
    fn test_startup_report_is_tagged() {
        let report = ReconcileReport::FallbackFailed {
            sync_error: "fault: flash".into(),
            fallback_error: "fault: nv".into(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["result"], "fallback_failed");
        assert_eq!(value["fallback_error"], "fault: nv");

        assert_eq!(
            serde_json::to_value(ReconcileReport::InSync).unwrap(),
            json!({"result": "in_sync"})
        );
    }

    #[test]
    fn test_swap_kind_names() {
        assert_eq!(json!(SwapKind::Swap), json!("swap"));
        assert_eq!(json!(SwapKind::SwapAndSync), json!("swap_and_sync"));
    }
}

#[cfg(test)]
mod state_file_tests {
    use super::*;

    #[test]
    fn test_state_file_keys() {
        let store = StateStore::dual_system();
        let value: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();

        assert_eq!(value["formatVersion"], STATE_FORMAT_VERSION);
        assert_eq!(value["dualSystem"], true);
        assert_eq!(value["synced"], false);
        assert_eq!(value["updateState"], "normal");
        assert_eq!(value["bootCount"], 0);
    }

    #[test]
    fn test_state_file_reload_keeps_roles() {
        let mut store = StateStore::dual_system();
        store.swap_roles();

        let reloaded = StateStore::from_json(&store.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reloaded.roles().active(), SystemId::Second);
        assert_eq!(reloaded, store);
    }

    #[test]
    fn test_newer_state_file_is_refused() {
        let store = StateStore::dual_system();
        let mut value: serde_json::Value =
            serde_json::from_str(&store.to_json().unwrap()).unwrap();
        value["formatVersion"] = json!(STATE_FORMAT_VERSION + 1);

        let err = StateStore::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, Error::Fault(_)));
    }
}
