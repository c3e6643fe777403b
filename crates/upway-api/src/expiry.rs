// Session-expiry classification
//
// The portal never answers an expired session with 401. It redirects to the
// login page instead, so the only evidence is a redirect whose target path
// is `/LogIn`. Kept free of any request/response types so it can be tested
// from bare status codes and header strings.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};

use crate::auth::LOGIN_PATH;

/// Extract the raw `Location` header of a response, if it is valid ASCII.
pub fn location(headers: &HeaderMap) -> Option<&str> {
    headers.get(LOCATION).and_then(|v| v.to_str().ok())
}

/// Reduce a redirect target to its path.
///
/// Drops the query string and fragment, and the scheme/authority of an
/// absolute target: `https://myupway.com/LogIn?ReturnUrl=%2F` -> `/LogIn`.
pub fn redirect_path(target: &str) -> &str {
    let without_query = target.split(['?', '#']).next().unwrap_or(target);
    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => without_query,
    }
}

/// Returns `true` when a response is the portal's "log in again" signal:
/// a redirect whose target path is exactly the login path.
pub fn is_session_expired(status: StatusCode, location: Option<&str>) -> bool {
    status.is_redirection() && location.is_some_and(|target| redirect_path(target) == LOGIN_PATH)
}
