//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable
//! help text.

use miette::Diagnostic;
use thiserror::Error;

use thermomaven_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Missing credentials")]
    #[diagnostic(
        code(thermomaven::no_credentials),
        help(
            "Provide --email and --password, or set THERMOMAVEN_EMAIL and\n\
             THERMOMAVEN_PASSWORD in the environment."
        )
    )]
    NoCredentials,

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(thermomaven::auth_failed),
        help("Check the account email and password. These are the vendor app credentials.")
    )]
    AuthFailed { message: String },

    #[error("Cloud unreachable: {reason}")]
    #[diagnostic(
        code(thermomaven::cloud_unreachable),
        help("Check your network connection and try again.")
    )]
    CloudUnreachable { reason: String },

    #[error("Device not found: {identifier}")]
    #[diagnostic(
        code(thermomaven::device_not_found),
        help("Run `thermomaven devices` to list known device ids.")
    )]
    DeviceNotFound { identifier: String },

    #[error("Push channel unavailable")]
    #[diagnostic(
        code(thermomaven::push_down),
        help(
            "Probe commands go over MQTT and need the push channel up.\n\
             Wait a few seconds after connecting, or check the connection with -v."
        )
    )]
    PushDown,

    #[error("{message}")]
    #[diagnostic(code(thermomaven::invalid_argument))]
    Validation { message: String },

    #[error(transparent)]
    #[diagnostic(code(thermomaven::core))]
    Core(CoreError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoCredentials | Self::Validation { .. } => exit_code::USAGE,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::CloudUnreachable { .. } | Self::PushDown => exit_code::CONNECTION,
            Self::Core(_) => exit_code::GENERAL,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::CloudUnreachable { reason } => Self::CloudUnreachable { reason },
            CoreError::DeviceNotFound { identifier } => Self::DeviceNotFound { identifier },
            CoreError::PushChannelDown => Self::PushDown,
            CoreError::InvalidProbe { .. } => Self::Validation {
                message: err.to_string(),
            },
            other => Self::Core(other),
        }
    }
}
