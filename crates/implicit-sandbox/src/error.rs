//! Error types for the sandbox
//!
//! Script failures a user can act on are not errors here: they come back as
//! `SandboxResult::Err`. These variants cover outcomes with no record to show.

use crate::context::ContextId;
use implicit_diagnostics::ErrorRecord;

/// Sandbox errors
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The failure carried no recoverable source position
    #[error("unclassified sandbox failure: {message}")]
    Unclassified { message: String },

    /// No response within the configured timeout
    #[error("execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The context's worker went away before answering
    #[error("execution context {0} stopped responding")]
    ContextLost(ContextId),

    /// Context creation failed
    #[error("execution context creation failed: {0}")]
    Spawn(String),

    /// Pool was shut down
    #[error("sandbox pool is shut down")]
    Closed,
}

impl SandboxError {
    /// Record to show the user, for errors caused by the submitted code
    #[must_use]
    pub fn user_record(&self) -> Option<ErrorRecord> {
        match self {
            Self::Timeout { .. } => Some(ErrorRecord::unpositioned(self.to_string())),
            _ => None,
        }
    }

    /// Whether the error points at the pool rather than the submitted code
    #[inline]
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::ContextLost(_) | Self::Spawn(_) | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_shown_without_position() {
        let record = SandboxError::Timeout { timeout_ms: 50 }.user_record().unwrap();
        assert_eq!(record, ErrorRecord::unpositioned("execution timed out after 50ms"));
    }

    #[test]
    fn infrastructure_errors() {
        assert!(SandboxError::Closed.is_infrastructure());
        assert!(SandboxError::Spawn("no threads".into()).is_infrastructure());
        assert!(!SandboxError::Timeout { timeout_ms: 1 }.is_infrastructure());
        assert!(SandboxError::Unclassified { message: "x".into() }
            .user_record()
            .is_none());
    }
}
