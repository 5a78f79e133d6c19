//! The cookie-backed session store.
//!
//! A session is a minimal projection of the logged-in account, serialized as
//! JSON into a single private (signed and encrypted) cookie. Establishing,
//! reading and clearing the session map onto [set_session_cookie],
//! [session_from_cookies] and [invalidate_session_cookie].

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    account::{Account, AccountId, derive_display_name},
};

pub(crate) const COOKIE_SESSION: &str = "session";

/// The default duration for which the session cookie is valid.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::days(7);

/// The active account context held by the client between requests.
///
/// Holds just enough of the account to render the protected pages without
/// another lookup. The stored credential is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The ID of the logged-in account.
    pub account_id: AccountId,
    /// The email of the logged-in account.
    pub email: String,
    /// The account holder's first name.
    pub fname: Option<String>,
    /// The account holder's last name.
    pub lname: Option<String>,
    /// A URL to the account's activation card image.
    pub card_url: Option<String>,
}

impl Session {
    /// The session projection for `account`.
    pub fn for_account(account: &Account) -> Self {
        Self {
            account_id: account.id,
            email: account.email.clone(),
            fname: account.fname.clone(),
            lname: account.lname.clone(),
            card_url: account.card_url.clone(),
        }
    }

    /// The name to greet the account holder with.
    pub fn display_name(&self) -> String {
        derive_display_name(self.fname.as_deref(), self.lname.as_deref(), &self.email)
    }
}

/// Add a session cookie to the cookie jar, indicating that a user is logged
/// in and authenticated.
///
/// Sets the expiry of the cookie to `duration` from the current time. You
/// can use [DEFAULT_SESSION_DURATION] for the default duration.
///
/// Returns the cookie jar with the cookie added.
///
/// # Errors
///
/// Returns an [Error::JSONSerializationError] if the session could not be
/// serialized.
pub fn set_session_cookie(
    jar: PrivateCookieJar,
    session: &Session,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let payload = serde_json::to_string(session)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;
    let expiry = OffsetDateTime::now_utc() + duration;

    Ok(jar.add(
        Cookie::build((COOKIE_SESSION, payload))
            .expires(expiry)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Read the session out of the cookie jar.
///
/// # Errors
///
/// Returns an [Error::CookieMissing] if the session cookie is absent or its
/// contents could not be decoded into a [Session].
pub fn session_from_cookies(jar: &PrivateCookieJar) -> Result<Session, Error> {
    let cookie = jar.get(COOKIE_SESSION).ok_or(Error::CookieMissing)?;

    serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::CookieMissing)
}

/// Set the session cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}
