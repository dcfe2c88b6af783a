//! Caller sessions.
//!
//! A contract violation by a caller terminates that caller's session only. The
//! transport reads [`ClientSession::is_killed`] after each call and drops the
//! connection.

/// One connected caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    id: String,
    killed: Option<String>,
}

impl ClientSession {
    /// Create a live session.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            killed: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Terminate the session for a caller bug.
    pub fn kill(&mut self, reason: &str) {
        tracing::error!(session = %self.id, reason, "killing client session");
        if self.killed.is_none() {
            self.killed = Some(reason.to_string());
        }
    }

    /// Whether the session has been terminated.
    pub fn is_killed(&self) -> bool {
        self.killed.is_some()
    }

    /// Why the session was terminated.
    pub fn kill_reason(&self) -> Option<&str> {
        self.killed.as_deref()
    }
}
