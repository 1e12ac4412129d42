//! Signing out ends the session and clears every session cookie.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{CookieJar, PrivateCookieJar};

use crate::{
    auth::{
        AuthSession, AuthState,
        cookie::{clear_session_cookies, get_access_token},
    },
    endpoints,
};

/// Sign the user out and redirect to the auth page.
///
/// Errors from the auth provider are logged by the session holder and never
/// shown to the user. The session cookies are cleared either way.
pub async fn post_sign_out(
    State(state): State<AuthState>,
    private_jar: PrivateCookieJar,
    jar: CookieJar,
) -> Response {
    let session = AuthSession::initialize(state.auth.clone(), get_access_token(&private_jar)).await;
    session.sign_out();

    let (private_jar, jar) = clear_session_cookies(private_jar, jar);

    (private_jar, jar, Redirect::to(endpoints::AUTH_VIEW)).into_response()
}
