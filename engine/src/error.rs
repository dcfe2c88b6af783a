//! Error types and outcome mapping for the firmware update engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All possible errors from the firmware update engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Caller errors
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// The caller broke the call contract and its session was terminated. `reported`
    /// is the code a local caller still observes.
    #[error("client killed: {reason}")]
    ClientKilled { reason: String, reported: LocalStatus },

    // Platform errors
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("fault: {0}")]
    Fault(String),

    // Lifecycle errors
    #[error("device reset in progress")]
    ResetInProgress,
}

impl Error {
    /// The outcome class this error resolves to.
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::BadParameter(_) => Outcome::InvalidArgument,
            Error::ClientKilled { reported, .. } => reported.outcome(),
            Error::NotFound(_) => Outcome::NotFound,
            Error::Unsupported(_) => Outcome::Unsupported,
            Error::Fault(_) | Error::ResetInProgress => Outcome::TransientFailure,
        }
    }

    /// Legacy numeric status code for integer-branching callers.
    ///
    /// For a killed client this is only what a local caller would observe; the session
    /// termination is the real signal.
    pub fn status_code(&self) -> i32 {
        match self {
            Error::BadParameter(_) => status::BAD_PARAMETER,
            Error::ClientKilled { reported, .. } => reported.status_code(),
            Error::NotFound(_) => status::NOT_FOUND,
            Error::Unsupported(_) => status::UNSUPPORTED,
            Error::Fault(_) | Error::ResetInProgress => status::FAULT,
        }
    }
}

/// Code reported to a local caller whose session was killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalStatus {
    /// Download with an invalid handle
    BadParameter,
    /// Version query with a null buffer, or a call on a dead session
    Fault,
}

impl LocalStatus {
    /// Outcome class of this code.
    pub fn outcome(self) -> Outcome {
        match self {
            LocalStatus::BadParameter => Outcome::InvalidArgument,
            LocalStatus::Fault => Outcome::TransientFailure,
        }
    }

    /// Numeric value of this code.
    pub fn status_code(self) -> i32 {
        match self {
            LocalStatus::BadParameter => status::BAD_PARAMETER,
            LocalStatus::Fault => status::FAULT,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric status codes.
pub mod status {
    pub const OK: i32 = 0;
    pub const NOT_FOUND: i32 = -1;
    pub const FAULT: i32 = -6;
    pub const BAD_PARAMETER: i32 = -15;
    pub const UNSUPPORTED: i32 = -18;
}

/// The single outcome every operation resolves to.
///
/// `FatalClientError` is never the return value of a call. It is the outcome a killed
/// session observes, delivered by the transport alongside the local code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    InvalidArgument,
    FatalClientError,
    NotFound,
    Unsupported,
    TransientFailure,
}

impl Outcome {
    /// Resolve a result into its outcome.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => e.outcome(),
        }
    }

    /// Whether callers should treat this outcome as an error.
    ///
    /// `Unsupported` is a legitimate terminal outcome on single-system hardware.
    pub fn is_error(self) -> bool {
        !matches!(self, Outcome::Success | Outcome::Unsupported)
    }
}

/// Numeric status code of a result.
pub fn status_of<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => status::OK,
        Err(e) => e.status_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::BadParameter("'fd' is negative".into());
        assert_eq!(err.to_string(), "bad parameter: 'fd' is negative");

        let err = Error::ClientKilled {
            reason: "buffer is null".into(),
            reported: LocalStatus::Fault,
        };
        assert_eq!(err.to_string(), "client killed: buffer is null");

        assert_eq!(
            Error::ResetInProgress.to_string(),
            "device reset in progress"
        );
    }

    #[test]
    fn outcome_mapping() {
        assert_eq!(Outcome::of::<()>(&Ok(())), Outcome::Success);
        assert_eq!(
            Error::BadParameter("x".into()).outcome(),
            Outcome::InvalidArgument
        );
        assert_eq!(
            Error::ClientKilled {
                reason: "x".into(),
                reported: LocalStatus::BadParameter,
            }
            .outcome(),
            Outcome::InvalidArgument
        );
        assert_eq!(
            Error::ClientKilled {
                reason: "x".into(),
                reported: LocalStatus::Fault,
            }
            .outcome(),
            Outcome::TransientFailure
        );
        assert_eq!(Error::NotFound("x".into()).outcome(), Outcome::NotFound);
        assert_eq!(Error::Unsupported("x".into()).outcome(), Outcome::Unsupported);
        assert_eq!(Error::Fault("x".into()).outcome(), Outcome::TransientFailure);
    }

    #[test]
    fn unsupported_is_not_an_error_outcome() {
        assert!(!Outcome::Unsupported.is_error());
        assert!(!Outcome::Success.is_error());
        assert!(Outcome::TransientFailure.is_error());
        assert!(Outcome::FatalClientError.is_error());
    }

    #[test]
    fn status_codes() {
        assert_eq!(status_of::<()>(&Ok(())), status::OK);
        assert_eq!(
            status_of::<()>(&Err(Error::ClientKilled {
                reason: "x".into(),
                reported: LocalStatus::BadParameter,
            })),
            status::BAD_PARAMETER
        );
        assert_eq!(
            status_of::<()>(&Err(Error::ClientKilled {
                reason: "x".into(),
                reported: LocalStatus::Fault,
            })),
            status::FAULT
        );
        assert_eq!(
            status_of::<()>(&Err(Error::Unsupported("x".into()))),
            status::UNSUPPORTED
        );
        assert_eq!(status_of::<()>(&Err(Error::ResetInProgress)), status::FAULT);
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&Outcome::FatalClientError).unwrap();
        assert_eq!(json, r#""fatal_client_error""#);
    }
}
