//! Defines functions for storing the session access token in cookies.

use axum_extra::extract::{
    CookieJar, PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

/// The private cookie holding the session's access token.
pub(crate) const COOKIE_ACCESS_TOKEN: &str = "sb-access-token";

/// Other cookie names that may hold session state and are cleared on sign out.
pub(crate) const STALE_SESSION_COOKIES: [&str; 3] =
    ["sb-refresh-token", "supabase-auth-token", "auth-token"];

/// A short-lived flag telling client side scripts to drop any cached session.
pub(crate) const COOKIE_CLEAR_CLIENT_AUTH: &str = "clear-client-auth";

/// How long the [COOKIE_CLEAR_CLIENT_AUTH] flag lives for.
const CLEAR_CLIENT_AUTH_DURATION: Duration = Duration::seconds(5);

/// Add the access token cookie to the cookie jar, expiring at `expires_at`.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    access_token: &str,
    expires_at: OffsetDateTime,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_ACCESS_TOKEN, access_token.to_owned()))
            .path("/")
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(true),
    )
}

/// Get the access token from the cookie jar, if there is one.
pub(crate) fn get_access_token(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(COOKIE_ACCESS_TOKEN)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .filter(|token| !token.is_empty())
}

/// Expire every session cookie and set the client side clean up flag.
///
/// The cookies are overwritten with empty, already expired values so that the
/// browser drops them even if this request did not send them.
pub(crate) fn clear_session_cookies(
    private_jar: PrivateCookieJar,
    jar: CookieJar,
) -> (PrivateCookieJar, CookieJar) {
    let private_jar = private_jar.add(expired_cookie(COOKIE_ACCESS_TOKEN));

    let jar = STALE_SESSION_COOKIES
        .iter()
        .fold(jar, |jar, name| jar.add(expired_cookie(*name)));

    let jar = jar.add(
        Cookie::build((COOKIE_CLEAR_CLIENT_AUTH, "true"))
            .path("/")
            .max_age(CLEAR_CLIENT_AUTH_DURATION)
            .http_only(false)
            .secure(false),
    );

    (private_jar, jar)
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .expires(OffsetDateTime::UNIX_EPOCH)
        .max_age(Duration::ZERO)
        .http_only(true)
        .build()
}
