//! CLI error type and exit codes.

use std::fmt;

/// Stable process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (including non-ok envelopes: they are data, not errors).
    #[allow(dead_code)]
    Ok = 0,
    /// Internal failure.
    Internal = 1,
    /// Invalid user input.
    InvalidInput = 2,
    /// I/O failure.
    Io = 3,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// CLI-level error.
#[derive(Debug)]
pub enum CliError {
    /// Invalid user input (bad arguments, malformed request JSON).
    InvalidInput(String),
    /// Filesystem failure.
    Io(std::io::Error),
    /// Serialization failure.
    Serialization(serde_json::Error),
    /// Failure surfaced from the core.
    Core(satori_shared::ErrorEnvelope),
}

impl CliError {
    /// Exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Io(_) => ExitCode::Io,
            Self::Serialization(_) | Self::Core(_) => ExitCode::Internal,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(formatter, "invalid input: {message}"),
            Self::Io(error) => write!(formatter, "io error: {error}"),
            Self::Serialization(error) => write!(formatter, "serialization error: {error}"),
            Self::Core(error) => write!(formatter, "{error}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}

impl From<satori_shared::ErrorEnvelope> for CliError {
    fn from(error: satori_shared::ErrorEnvelope) -> Self {
        if error.code == satori_shared::ErrorCode::invalid_input()
            || error.code.namespace() == "api"
            || error.code.namespace() == "config"
        {
            Self::InvalidInput(error.message)
        } else {
            Self::Core(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_shared::{ErrorCode, ErrorEnvelope};

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ExitCode::Ok.as_u8(), 0);
        assert_eq!(ExitCode::Internal.as_u8(), 1);
        assert_eq!(ExitCode::InvalidInput.as_u8(), 2);
        assert_eq!(ExitCode::Io.as_u8(), 3);
    }

    #[test]
    fn api_validation_errors_map_to_invalid_input() {
        let envelope = ErrorEnvelope::expected(ErrorCode::new("api", "invalid_request"), "bad");
        let error = CliError::from(envelope);
        assert_eq!(error.exit_code(), ExitCode::InvalidInput);
    }

    #[test]
    fn transport_errors_map_to_internal() {
        let envelope = ErrorEnvelope::unexpected(
            ErrorCode::transport(),
            "down",
            satori_shared::ErrorClass::Retriable,
        );
        let error = CliError::from(envelope);
        assert_eq!(error.exit_code(), ExitCode::Internal);
    }
}
