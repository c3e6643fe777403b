//! CLI error types with miette diagnostics.
//!
//! Maps config and core failures into user-facing errors with help text
//! and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use upway_config::ConfigError;
use upway_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("{key} is not set")]
    #[diagnostic(
        code(upway::missing_setting),
        help(
            "Set it in the environment, e.g. {key}=...,\n\
             or as `{lower} = \"...\"` in the config file (--config or UPWAY_CONFIG)."
        )
    )]
    MissingSetting { key: String, lower: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(upway::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(upway::config))]
    Config(ConfigError),

    // ── Portal ───────────────────────────────────────────────────────

    #[error("myUpway login failed: {message}")]
    #[diagnostic(
        code(upway::auth_failed),
        help(
            "Check MYUPWAY_USERNAME, MYUPWAY_PASSWORD and MYUPWAY_SYSTEM_ID.\n\
             The system id is the number in the portal URL after /System/."
        )
    )]
    AuthFailed { message: String },

    #[error("Could not reach the myUpway portal: {reason}")]
    #[diagnostic(
        code(upway::connection_failed),
        help("Check network access to the portal (MYUPWAY_BASE_URL).")
    )]
    ConnectionFailed { reason: String },

    // ── Runtime ──────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(upway::bridge))]
    Bridge(CoreError),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingSetting { .. } | Self::Validation { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Bridge(_) => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError ───────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { key } => CliError::MissingSetting {
                lower: key.to_lowercase(),
                key,
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

// ── CoreError → CliError ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LoginFailed { message } => CliError::AuthFailed { message },
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Config { message } => CliError::Validation {
                field: "portal".into(),
                reason: message,
            },
            other => CliError::Bridge(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let missing: CliError = ConfigError::Missing {
            key: "MQTT_HOST".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::USAGE);

        let auth: CliError = CoreError::LoginFailed {
            message: "bad password".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let offline: CliError = CoreError::ConnectionFailed {
            reason: "dns".into(),
        }
        .into();
        assert_eq!(offline.exit_code(), exit_code::CONNECTION);

        let malformed: CliError = CoreError::MalformedResponse {
            message: "x".into(),
        }
        .into();
        assert_eq!(malformed.exit_code(), exit_code::GENERAL);
    }
}
