//! Centralized error types for the wslink weather-station driver.
//!
//! The taxonomy separates faults by how the service loop recovers from them:
//! transport faults are retried with backoff, codec faults discard the frame
//! and continue, protocol timeouts trigger receiver re-arm, and the remaining
//! variants are surfaced synchronously to facade callers.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(rust_2018_idioms)]

use thiserror::Error;

/// Error severity classification, used when deciding what to log and at
/// which level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Informational; normal recovery path.
    Info,
    /// Degraded operation, recovery in progress.
    Warning,
    /// Operation failed; caller intervention may be required.
    Error,
    /// Driver cannot continue without external action.
    Critical,
}

/// Top-level driver error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// USB I/O failure. Retried up to the configured budget before the
    /// driver reports itself degraded.
    #[error("transport fault: {0}")]
    Transport(String),

    /// Malformed frame: bad length, bad checksum, unknown response type or
    /// out-of-range nibble. The frame is discarded and the loop continues.
    #[error("codec fault: {0}")]
    Codec(String),

    /// No frame arrived within the state's window.
    #[error("protocol timeout after {window_ms}ms")]
    ProtocolTimeout {
        /// Length of the expired window in milliseconds.
        window_ms: u64,
    },

    /// The operation requires a paired console.
    #[error("transceiver is not paired to a console")]
    Unpaired,

    /// Shutdown was requested while the operation was in flight.
    #[error("operation cancelled by shutdown")]
    Cancelled,

    /// Caller-supplied configuration failed range checks before any write.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl DriverError {
    /// Severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DriverError::Transport(_) => ErrorSeverity::Error,
            DriverError::Codec(_) => ErrorSeverity::Warning,
            DriverError::ProtocolTimeout { .. } => ErrorSeverity::Warning,
            DriverError::Unpaired => ErrorSeverity::Error,
            DriverError::Cancelled => ErrorSeverity::Info,
            DriverError::InvalidConfig(_) => ErrorSeverity::Error,
        }
    }

    /// Whether retrying the same operation can succeed without caller
    /// intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::Transport(_) | DriverError::ProtocolTimeout { .. }
        )
    }

    /// Whether the service loop recovers from this error locally, without
    /// surfacing it to facade callers.
    pub fn is_recovered_locally(&self) -> bool {
        matches!(
            self,
            DriverError::Codec(_) | DriverError::ProtocolTimeout { .. }
        )
    }
}

/// A specialized `Result` for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        assert_eq!(
            DriverError::Transport("ep0 stall".into()).severity(),
            ErrorSeverity::Error
        );
        assert_eq!(
            DriverError::Codec("bad checksum".into()).severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(DriverError::Cancelled.severity(), ErrorSeverity::Info);
    }

    #[test]
    fn test_retryable() {
        assert!(DriverError::Transport("busy".into()).is_retryable());
        assert!(DriverError::ProtocolTimeout { window_ms: 10_000 }.is_retryable());
        assert!(!DriverError::Unpaired.is_retryable());
        assert!(!DriverError::InvalidConfig("contrast 9".into()).is_retryable());
    }

    #[test]
    fn test_local_recovery() {
        assert!(DriverError::Codec("short frame".into()).is_recovered_locally());
        assert!(!DriverError::Transport("io".into()).is_recovered_locally());
    }

    #[test]
    fn test_display() {
        let err = DriverError::ProtocolTimeout { window_ms: 10_000 };
        assert!(err.to_string().contains("10000"));
    }
}
