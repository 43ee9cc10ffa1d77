//! CLI error type with the documented exit codes.

use wslink_errors::DriverError;

/// Exit codes: 1 configuration error, 2 transceiver not found, 3 pairing
/// failed, 4 timeout.
#[derive(Debug)]
pub enum CliError {
    /// Bad configuration file or option values.
    Config(String),
    /// No transceiver answered on the USB bus.
    TransceiverNotFound(String),
    /// The console did not pair within the window.
    PairingFailed(String),
    /// An operation did not complete in time.
    Timeout(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::TransceiverNotFound(_) => 2,
            CliError::PairingFailed(_) => 3,
            CliError::Timeout(_) => 4,
        }
    }

    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Config(_) => "config",
            CliError::TransceiverNotFound(_) => "transceiver-not-found",
            CliError::PairingFailed(_) => "pairing-failed",
            CliError::Timeout(_) => "timeout",
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration error: {msg}"),
            CliError::TransceiverNotFound(msg) => write!(f, "transceiver not found: {msg}"),
            CliError::PairingFailed(msg) => write!(f, "pairing failed: {msg}"),
            CliError::Timeout(msg) => write!(f, "timed out: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<DriverError> for CliError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::InvalidConfig(msg) => CliError::Config(msg),
            DriverError::Transport(msg) => CliError::TransceiverNotFound(msg),
            DriverError::ProtocolTimeout { window_ms } => {
                CliError::Timeout(format!("no response within {window_ms}ms"))
            }
            DriverError::Unpaired => {
                CliError::PairingFailed("transceiver is not paired; run `wsctl pair`".into())
            }
            other => CliError::Timeout(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 1);
        assert_eq!(CliError::TransceiverNotFound("x".into()).exit_code(), 2);
        assert_eq!(CliError::PairingFailed("x".into()).exit_code(), 3);
        assert_eq!(CliError::Timeout("x".into()).exit_code(), 4);
    }

    #[test]
    fn test_driver_error_mapping() {
        assert_eq!(
            CliError::from(DriverError::Unpaired).exit_code(),
            3
        );
        assert_eq!(
            CliError::from(DriverError::InvalidConfig("bad".into())).exit_code(),
            1
        );
    }
}
