// Portal authentication
//
// Cookie-based form login. The login endpoint answers with a redirect:
// to the requested return URL when the credentials were accepted, anywhere
// else (usually back to `/LogIn`) when they were not. On success the
// session cookie lands in the client's jar and rides along on every
// subsequent request.

use std::sync::atomic::Ordering;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::Error;
use crate::expiry::location;
use crate::session::PortalSession;

/// Path of the portal's login form.
pub const LOGIN_PATH: &str = "/LogIn";

/// Portal account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account e-mail address.
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// The page the portal only sends a browser to after a successful login.
pub fn return_url(system_id: &str) -> String {
    format!("/system/{system_id}/Status/Overview")
}

impl PortalSession {
    /// Log in with the configured credentials.
    ///
    /// `POST /LogIn` with `Email`, `Password`, `ReturnUrl`. Succeeds only if
    /// the response redirects to exactly the return URL; any other target,
    /// or no redirect at all, is [`Error::LoginFailed`]. Not retried here.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let url = self.base_url().join(LOGIN_PATH)?;
        let expected = return_url(self.system_id());

        debug!("logging in at {}", url);

        let form = [
            ("Email", self.credentials().username.as_str()),
            ("Password", self.credentials().password.expose_secret()),
            ("ReturnUrl", expected.as_str()),
        ];

        let resp = self
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let target = location(resp.headers());

        if target == Some(expected.as_str()) {
            self.authenticated.store(true, Ordering::Release);
            debug!("login successful");
            return Ok(());
        }

        self.authenticated.store(false, Ordering::Release);
        let message = match target {
            Some(other) => format!("redirected to {other} instead of {expected}"),
            None => format!("no redirect in login response (HTTP {status})"),
        };
        Err(Error::LoginFailed { message })
    }
}
