//! The sign-up form and its handler.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error,
    auth::{
        AuthSession, AuthState,
        cookie::set_session_cookie,
        log_in::INTERNAL_ERROR_MESSAGE,
        password::ValidatedPassword,
    },
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, form_error, loading_spinner, password_input, text_input},
};

pub(super) fn sign_up_form(email: &str, full_name: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::SIGN_UP)
            hx-swap="outerHTML"
            hx-indicator="#sign-up-indicator"
            class="space-y-4 md:space-y-6"
        {
            (text_input("full_name", "Full name", "text", full_name, false))
            (text_input("email", "Email", "email", email, true))
            (password_input("password", "Password", ValidatedPassword::MIN_LENGTH as u8))
            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="sign-up-indicator"
                {
                    (loading_spinner())
                }
                "Sign up"
            }
        }
    }
}

/// Check the sign-up fields before they reach the auth provider.
fn validate_sign_up(email: &str, password: &str) -> Result<(), Error> {
    if email.is_empty() || password.trim().is_empty() {
        return Err(Error::validation(
            "email",
            "Email and password are required",
        ));
    }

    if !email.contains('@') {
        return Err(Error::validation(
            "email",
            "Please enter a valid email address",
        ));
    }

    ValidatedPassword::new(password)?;

    Ok(())
}

/// The data entered in the sign-up form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignUpForm {
    /// The address to register.
    pub email: String,
    /// The new password.
    pub password: String,
    /// The user's full name, may be empty.
    pub full_name: String,
}

/// Handler for sign-up requests via the POST method.
///
/// A successful sign-up signs the new user in and redirects to the overview
/// page. Validation and provider errors re-render the form with the email and
/// full name preserved.
pub async fn post_sign_up(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Form(form): Form<SignUpForm>,
) -> Response {
    let email = form.email.trim();
    let full_name = form.full_name.trim();

    if let Err(error) = validate_sign_up(email, &form.password) {
        return sign_up_form(email, full_name, Some(&error.to_string())).into_response();
    }

    let session = AuthSession::initialize(state.auth.clone(), None).await;

    match session.sign_up(email, &form.password, full_name) {
        Ok(session) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::OVERVIEW_VIEW.to_owned()),
            set_session_cookie(jar, &session.access_token, session.expires_at),
        )
            .into_response(),
        Err(error @ (Error::DuplicateEmail | Error::Validation { .. })) => {
            sign_up_form(email, full_name, Some(&error.to_string())).into_response()
        }
        Err(error) => {
            tracing::error!("Unhandled error while signing up: {error}");
            sign_up_form(email, full_name, Some(INTERNAL_ERROR_MESSAGE)).into_response()
        }
    }
}

#[cfg(test)]
mod sign_up_tests {
    use axum::{Form, extract::State, http::StatusCode};
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        auth::AuthBackend,
        endpoints,
        test_utils::{
            TEST_PASSWORD, assert_form_error_message, assert_form_input_with_value,
            assert_hx_redirect, assert_valid_html, get_test_auth_state, must_get_form,
            parse_html_fragment,
        },
    };

    use super::{SignUpForm, post_sign_up, validate_sign_up};

    #[tokio::test]
    async fn sign_up_creates_user_and_redirects() {
        let state = get_test_auth_state();
        let auth = state.auth.clone();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_sign_up(
            State(state),
            jar,
            Form(SignUpForm {
                email: "jo@example.com".to_owned(),
                password: TEST_PASSWORD.to_owned(),
                full_name: "Jo Bloggs".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::OVERVIEW_VIEW);
        assert!(
            auth.sign_in_with_password("jo@example.com", TEST_PASSWORD)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn sign_up_with_short_password_keeps_fields() {
        let state = get_test_auth_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_sign_up(
            State(state),
            jar,
            Form(SignUpForm {
                email: "jo@example.com".to_owned(),
                password: "12345".to_owned(),
                full_name: "Jo Bloggs".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_input_with_value(&form, "email", "email", "jo@example.com");
        assert_form_error_message(&form, "Password must be at least 6 characters long");
    }

    #[tokio::test]
    async fn sign_up_with_registered_email_shows_provider_message() {
        let state = get_test_auth_state();
        state
            .auth
            .sign_up("jo@example.com", TEST_PASSWORD, "")
            .unwrap();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_sign_up(
            State(state),
            jar,
            Form(SignUpForm {
                email: "jo@example.com".to_owned(),
                password: TEST_PASSWORD.to_owned(),
                full_name: String::new(),
            }),
        )
        .await;

        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(
            &form,
            "A user with this email address has already been registered",
        );
    }

    #[test]
    fn sign_up_validation_messages() {
        let message = |email, password| {
            validate_sign_up(email, password)
                .map_err(|error| error.to_string())
                .err()
        };

        assert_eq!(
            message("", TEST_PASSWORD).as_deref(),
            Some("Email and password are required")
        );
        assert_eq!(
            message("jo.example.com", TEST_PASSWORD).as_deref(),
            Some("Please enter a valid email address")
        );
        assert_eq!(
            message("jo@example.com", "12345").as_deref(),
            Some("Password must be at least 6 characters long")
        );
        assert_eq!(message("jo@example.com", TEST_PASSWORD), None);
    }
}
