//! Password recovery: requesting a recovery link, following it and choosing a new password.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    auth::{
        AuthBackend, AuthSession, AuthState,
        cookie::{get_access_token, set_session_cookie},
        password::ValidatedPassword,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, auth_card, base, form_error, loading_spinner,
        password_input, text_input,
    },
};

/// Shown after a recovery link is requested, whether or not the email is registered.
pub const RESET_LINK_SENT_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

fn reset_password_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::RESET_PASSWORD)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", email, true))
            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Send reset link"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Remembered it? "
                a href=(endpoints::AUTH_VIEW) class=(LINK_STYLE) { "Back to log in" }
            }
        }
    }
}

/// Display the page for requesting a password recovery link.
pub async fn get_reset_password_page() -> Response {
    let content = auth_card("Reset your password", &reset_password_form("", None));

    base("Reset Password", &[], &content).into_response()
}

/// The data entered in the reset password form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    /// The address to send the recovery link to.
    pub email: String,
}

/// Start password recovery for the submitted email.
///
/// The response is the same for registered and unknown addresses.
pub async fn post_reset_password(
    State(state): State<AuthState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let email = form.email.trim();

    if email.is_empty() {
        return reset_password_form(email, Some("Email is required")).into_response();
    }

    let session = AuthSession::initialize(state.auth.clone(), None).await;
    if let Err(error) = session.reset_password(email, endpoints::RECOVER) {
        tracing::error!("Could not start password recovery: {error}");
    }

    html! {
        p class="text-sm text-green-700 dark:text-green-400" { (RESET_LINK_SENT_MESSAGE) }
    }
    .into_response()
}

/// The query string of a password recovery link.
#[derive(Debug, Deserialize)]
pub struct RecoverQuery {
    /// The single use recovery token.
    pub token: Option<String>,
}

/// Follow a password recovery link.
///
/// A valid token signs the user in and leads to the update password page.
/// Anything else leads back to the reset password page.
pub async fn get_recover(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(query): Query<RecoverQuery>,
) -> Response {
    let Some(token) = query.token.filter(|token| !token.is_empty()) else {
        return Redirect::to(endpoints::RESET_PASSWORD).into_response();
    };

    match state.auth.exchange_recovery_token(&token) {
        Ok(session) => (
            set_session_cookie(jar, &session.access_token, session.expires_at),
            Redirect::to(endpoints::UPDATE_PASSWORD),
        )
            .into_response(),
        Err(error) => {
            tracing::info!("Rejected password recovery link: {error}");
            Redirect::to(endpoints::RESET_PASSWORD).into_response()
        }
    }
}

fn update_password_form(error_message: Option<&str>) -> Markup {
    let min_length = ValidatedPassword::MIN_LENGTH as u8;

    html! {
        form
            hx-post=(endpoints::UPDATE_PASSWORD)
            hx-swap="outerHTML"
            hx-target-error="this"
            hx-indicator="#indicator"
            class="space-y-4 md:space-y-6"
        {
            (password_input("password", "New password", min_length))
            (password_input("passwordConfirm", "Confirm new password", min_length))
            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Update password"
            }
        }
    }
}

/// Display the page for choosing a new password.
///
/// Only reachable with a session, usually one created by a recovery link.
pub async fn get_update_password_page(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> Response {
    let session = AuthSession::initialize(state.auth.clone(), get_access_token(&jar)).await;

    if !session.is_authenticated() {
        return Redirect::to(endpoints::RESET_PASSWORD).into_response();
    }

    let content = auth_card("Choose a new password", &update_password_form(None));

    base("Update Password", &[], &content).into_response()
}

/// The data entered in the update password form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePasswordForm {
    /// The new password.
    pub password: String,
    /// The new password typed a second time.
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,
}

fn validate_update_password(form: &UpdatePasswordForm) -> Result<(), Error> {
    if form.password.is_empty() || form.password_confirm.is_empty() {
        return Err(Error::validation("password", "All fields are required"));
    }

    if form.password != form.password_confirm {
        return Err(Error::validation("passwordConfirm", "Passwords do not match"));
    }

    ValidatedPassword::new(&form.password)?;

    Ok(())
}

/// Change the signed in user's password and redirect to the root page.
pub async fn post_update_password(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Form(form): Form<UpdatePasswordForm>,
) -> Response {
    let session = AuthSession::initialize(state.auth.clone(), get_access_token(&jar)).await;

    if !session.is_authenticated() {
        return (
            HxRedirect(endpoints::RESET_PASSWORD.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response();
    }

    if let Err(error) = validate_update_password(&form) {
        return update_password_form(Some(&error.to_string())).into_response();
    }

    match session.update_password(&form.password) {
        Ok(()) => (
            HxRedirect(endpoints::ROOT.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not update password: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                update_password_form(Some(&error.to_string())),
            )
                .into_response()
        }
    }
}
