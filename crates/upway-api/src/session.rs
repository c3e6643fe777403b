// Authenticated portal session
//
// Owns the cookie-bearing HTTP client and the "are we logged in" belief.
// There is no expiry timestamp: staleness is discovered from responses,
// and `execute_authenticated` recovers from it with one login + resend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, warn};
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::expiry::{is_session_expired, location};
use crate::retry::retry_once_after_reauth;
use crate::transport::TransportConfig;

/// One authenticated HTTP identity against the portal.
///
/// Polling cycles never overlap, so the session is used strictly
/// sequentially; the belief flag is atomic only so the type stays `Sync`.
pub struct PortalSession {
    http: reqwest::Client,
    base_url: Url,
    system_id: String,
    credentials: Credentials,
    /// Cookie jar reference for inspecting the session cookie.
    cookie_jar: Option<Arc<Jar>>,
    pub(crate) authenticated: AtomicBool,
}

impl PortalSession {
    /// Create a new session from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (portal auth is cookie-based). `base_url` is the portal
    /// root, e.g. `https://myupway.com/`.
    pub fn new(
        base_url: Url,
        system_id: impl Into<String>,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let cookie_jar = config.cookie_jar.clone();
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            system_id: system_id.into(),
            credentials,
            cookie_jar,
            authenticated: AtomicBool::new(false),
        })
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The portal base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The heat-pump system id (`hpid`).
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether the last login succeeded and no expiry has been seen since.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Whether the jar currently holds any cookie for the portal.
    pub fn has_session_cookie(&self) -> bool {
        self.cookie_jar
            .as_ref()
            .and_then(|jar| jar.cookies(&self.base_url))
            .is_some()
    }

    /// Classify a response as the portal's session-expired signal.
    pub fn is_expired_response(response: &reqwest::Response) -> bool {
        is_session_expired(response.status(), location(response.headers()))
    }

    /// Send a request under the session, recovering from expiry once.
    ///
    /// `build` is called to produce the request and called again for the
    /// resend, so it must be side-effect free. Redirects are never followed;
    /// any response that is not the expiry signal is returned verbatim.
    pub async fn execute_authenticated<F>(&self, build: F) -> Result<reqwest::Response, Error>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let build = &build;
        let http = &self.http;

        retry_once_after_reauth(
            move || async move { build(http).send().await.map_err(Error::Transport) },
            |resp: &reqwest::Response| {
                let expired = Self::is_expired_response(resp);
                if expired {
                    self.authenticated.store(false, Ordering::Release);
                    debug!(url = %resp.url(), "portal redirected to login, session expired");
                }
                expired
            },
            move || async move {
                let result = self.authenticate().await;
                if let Err(ref e) = result {
                    warn!(error = %e, "re-authentication failed");
                }
                result
            },
        )
        .await
    }
}
