// ── Core error types ──
//
// Cycle-level errors from upway-core. Consumers never see reqwest errors
// or raw JSON failures directly; the `From<upway_api::Error>` impl folds
// transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Portal errors ────────────────────────────────────────────────
    #[error("Portal login failed: {message}")]
    LoginFailed { message: String },

    #[error("Portal session could not be recovered: {reason}")]
    ReauthExhausted { reason: String },

    #[error("Malformed value response: {message}")]
    MalformedResponse { message: String },

    #[error("Cannot reach portal: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Portal error: {message}")]
    Portal { message: String },

    // ── Publish errors ───────────────────────────────────────────────
    #[error("Failed to enqueue publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Failed to encode discovery payload: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Setup errors ─────────────────────────────────────────────────
    #[error("Invalid sensor catalog: {message}")]
    Catalog { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Errors that mean the bridge cannot get going at all.
    ///
    /// A rejected login at startup is fatal; the same failure inside a
    /// recurring cycle is only logged.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. } | Self::Catalog { .. } | Self::Config { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<upway_api::Error> for CoreError {
    fn from(err: upway_api::Error) -> Self {
        match err {
            upway_api::Error::LoginFailed { message } => CoreError::LoginFailed { message },
            upway_api::Error::ReauthExhausted { reason } => CoreError::ReauthExhausted { reason },
            upway_api::Error::MalformedResponse {
                status,
                message,
                body: _,
            } => CoreError::MalformedResponse {
                message: format!("HTTP {status}: {message}"),
            },
            upway_api::Error::Transport(ref e) => {
                if e.is_timeout() || e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Portal {
                        message: e.to_string(),
                    }
                }
            }
            upway_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid portal URL: {e}"),
            },
            upway_api::Error::ClientBuild(msg) => CoreError::Config {
                message: format!("HTTP client: {msg}"),
            },
        }
    }
}
