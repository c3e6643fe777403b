use thiserror::Error;

/// Top-level error type for the `upway-api` crate.
///
/// Covers every failure mode of talking to the portal: login, session
/// recovery, transport, and response decoding. `upway-core` maps these
/// into cycle-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The login form was rejected: the portal redirected somewhere other
    /// than the requested return URL, or did not redirect at all.
    #[error("Login failed: {message}")]
    LoginFailed { message: String },

    /// The session expired and could not be recovered with a single
    /// re-authentication and resend.
    #[error("Session could not be recovered after re-authentication: {reason}")]
    ReauthExhausted { reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Data ────────────────────────────────────────────────────────
    /// The value-fetch body did not have the expected JSON shape.
    #[error("Malformed response (HTTP {status}): {message}")]
    MalformedResponse {
        status: u16,
        message: String,
        body: String,
    },
}
