//! Error types for modem operations.
//!
//! Every AT operation the terminal issues reports failure through
//! [`ModemError`]. None of these errors are fatal to the process; callers
//! log them and carry on with best-effort connectivity.

use crate::traits::ModemOp;

/// Result type alias for modem operations.
pub type Result<T> = std::result::Result<T, ModemError>;

/// Errors that can occur while driving the modem.
#[derive(Debug, thiserror::Error)]
pub enum ModemError {
    /// The modem answered the command with an error reply.
    #[error("{op} failed: {message}")]
    CommandFailed { op: ModemOp, message: String },

    /// The command did not complete within the configured bound.
    #[error("{op} timed out after {duration_ms}ms")]
    Timeout { op: ModemOp, duration_ms: u64 },

    /// The modem channel stayed locked by another unit for too long.
    #[error("Modem busy: lock not acquired within {duration_ms}ms")]
    Busy { duration_ms: u64 },

    /// The reply could not be parsed into the expected fields.
    #[error("Invalid response to {op}: {message}")]
    InvalidResponse { op: ModemOp, message: String },

    /// The packet-data context was deactivated by the network.
    ///
    /// There is no automatic recovery for this state; it needs operator or
    /// higher-layer intervention.
    #[error("Packet-data session deactivated, no recovery action defined")]
    SessionDeactivated,
}

impl ModemError {
    /// Create a new command failed error.
    pub fn command_failed(op: ModemOp, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            op,
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(op: ModemOp, duration_ms: u64) -> Self {
        Self::Timeout { op, duration_ms }
    }

    /// Create a new invalid response error.
    pub fn invalid_response(op: ModemOp, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            op,
            message: message.into(),
        }
    }

    /// Whether the error came from the unresolved deactivated-session state.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::SessionDeactivated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_error() {
        let error = ModemError::command_failed(ModemOp::StartSession, "ERROR");
        assert!(matches!(error, ModemError::CommandFailed { .. }));
        assert_eq!(error.to_string(), "start-session failed: ERROR");
    }

    #[test]
    fn test_timeout_error() {
        let error = ModemError::timeout(ModemOp::HttpGet, 5000);
        assert_eq!(error.to_string(), "http-get timed out after 5000ms");
    }

    #[test]
    fn test_session_deactivated_is_unresolved() {
        assert!(ModemError::SessionDeactivated.is_unresolved());
        assert!(!ModemError::Busy { duration_ms: 10 }.is_unresolved());
    }
}
