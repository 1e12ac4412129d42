//! Authentication middleware that loads the session from the access token cookie.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;

use crate::{
    AppState,
    auth::{AuthSession, SqliteAuth, cookie::get_access_token},
    endpoints,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The auth provider used to look up sessions.
    pub auth: Arc<SqliteAuth>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            auth: state.auth.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::<Key>::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to auth page.");
            return get_redirect(endpoints::AUTH_VIEW);
        }
    };

    let Some(access_token) = get_access_token(&jar) else {
        return get_redirect(endpoints::AUTH_VIEW);
    };

    let session = AuthSession::initialize(state.auth.clone(), Some(access_token)).await;
    let Some(user) = session.user() else {
        tracing::debug!("Session expired or unknown. Redirecting to auth page.");
        return get_redirect(endpoints::AUTH_VIEW);
    };

    parts.extensions.insert(user.id);
    parts.extensions.insert(Arc::new(session));

    next.run(Request::from_parts(parts, body)).await
}

/// Middleware function that checks for a valid session cookie.
/// The user ID and the session holder are placed into the request and then the
/// request is executed normally if the session is valid, otherwise a redirect
/// to the auth page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>`
/// to receive the user ID, or `Extension(session): Extension<Arc<AppSession>>` for the session.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Like [auth_guard], but redirects with the `HX-Redirect` header so that
/// HTMX requests navigate the whole page to the auth page.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
