//! Error types for the AWS CLI provider.

use thiserror::Error;

use crate::runner::RunnerError;

/// Errors raised by the AWS CLI provider.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AwsError {
    /// Raised when the provider settings are incomplete.
    #[error("missing {field}")]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when the profile's credentials cannot be resolved.
    #[error("could not load credentials for profile {profile}: {message}")]
    Credentials {
        /// Profile that was requested.
        profile: String,
        /// Underlying failure.
        message: String,
    },
    /// Raised when `aws` returns a non-zero exit status.
    #[error("{program} {operation} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `aws`).
        program: String,
        /// CLI operation that failed (for example `create-snapshot`).
        operation: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when JSON output from the CLI cannot be parsed.
    #[error("failed to parse {operation} output: {message}")]
    Parse {
        /// CLI operation whose output was being parsed.
        operation: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a filter or tag payload cannot be encoded.
    #[error("failed to encode {operation} arguments: {message}")]
    Encode {
        /// CLI operation being prepared.
        operation: String,
        /// Serializer error message.
        message: String,
    },
    /// Raised when command execution fails.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}
