// Retry-once-after-reauth combinator
//
// Wraps any request-producing operation. If the first result is classified
// as "session expired", re-authenticate once and resend once. Never loops.

use std::future::Future;

use tracing::debug;

use crate::error::Error;

/// Run `send`, re-authenticating and resending exactly once if `expired`
/// flags the result.
///
/// - first result not expired: returned as-is, `reauth` is never called
/// - expired, `reauth` fails: [`Error::ReauthExhausted`]
/// - expired, resend expired again: [`Error::ReauthExhausted`]
/// - expired, resend not expired: the resend's result
///
/// Errors from `send` itself (transport failures) propagate unchanged.
pub async fn retry_once_after_reauth<T, S, SFut, E, A, AFut>(
    mut send: S,
    expired: E,
    mut reauth: A,
) -> Result<T, Error>
where
    S: FnMut() -> SFut,
    SFut: Future<Output = Result<T, Error>>,
    E: Fn(&T) -> bool,
    A: FnMut() -> AFut,
    AFut: Future<Output = Result<(), Error>>,
{
    let first = send().await?;
    if !expired(&first) {
        return Ok(first);
    }

    debug!("session expired, re-authenticating before resend");
    reauth().await.map_err(|e| Error::ReauthExhausted {
        reason: e.to_string(),
    })?;

    let second = send().await?;
    if expired(&second) {
        return Err(Error::ReauthExhausted {
            reason: "portal still redirects to login after re-authentication".into(),
        });
    }
    Ok(second)
}
