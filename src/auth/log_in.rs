//! The auth page with the log-in and sign-up forms, and the log-in handler.

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
    auth::{AuthSession, AuthState, cookie::set_session_cookie, sign_up::sign_up_form},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, auth_card, base, form_error, loading_spinner,
        password_input, text_input,
    },
};

pub(super) const INTERNAL_ERROR_MESSAGE: &str =
    "An internal error occurred. Please try again later.";

fn log_in_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN)
            hx-swap="outerHTML"
            hx-indicator="#log-in-indicator"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", email, true))
            (password_input("password", "Password", 0))
            (form_error(error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="log-in-indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Forgot your password? "
                a href=(endpoints::RESET_PASSWORD) class=(LINK_STYLE) { "Reset it here" }
            }
        }
    }
}

/// Display the auth page with the log-in and sign-up forms.
pub async fn get_auth_page() -> Response {
    let content = html! {
        div class="flex flex-col lg:flex-row lg:items-start justify-center"
        {
            (auth_card("Log in to your account", &log_in_form("", None)))
            (auth_card("Create an account", &sign_up_form("", "", None)))
        }
    };

    base("Log In", &[], &content).into_response()
}

/// The data entered in the log-in form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogInForm {
    /// The address the user registered with.
    pub email: String,
    /// The plain text password. It is only compared against the stored hash.
    pub password: String,
}

/// Handler for log-in requests via the POST method.
///
/// On success the session cookie is set and the client is redirected to the
/// overview page. Otherwise the form is returned with an error message and
/// the email preserved.
pub async fn post_log_in(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Form(form): Form<LogInForm>,
) -> Response {
    let email = form.email.trim();

    if email.is_empty() || form.password.trim().is_empty() {
        return log_in_form(email, Some("Email and password are required")).into_response();
    }

    let session = AuthSession::initialize(state.auth.clone(), None).await;

    match session.sign_in(email, &form.password) {
        Ok(session) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::OVERVIEW_VIEW.to_owned()),
            set_session_cookie(jar, &session.access_token, session.expires_at),
        )
            .into_response(),
        Err(error @ Error::InvalidCredentials) => {
            log_in_form(email, Some(&error.to_string())).into_response()
        }
        Err(error) => {
            tracing::error!("Unhandled error while signing in: {error}");
            log_in_form(email, Some(INTERNAL_ERROR_MESSAGE)).into_response()
        }
    }
}

#[cfg(test)]
mod log_in_tests {
    use axum::{Form, extract::State, http::StatusCode};
    use axum_extra::extract::PrivateCookieJar;
    use scraper::Selector;

    use crate::{
        auth::{AuthBackend, cookie::COOKIE_ACCESS_TOKEN},
        endpoints,
        test_utils::{
            TEST_PASSWORD, assert_form_error_message, assert_form_input,
            assert_form_input_with_value, assert_form_submit_button, assert_hx_endpoint,
            assert_hx_redirect, assert_valid_html, get_test_auth_state, must_get_form,
            parse_html_document, parse_html_fragment,
        },
    };

    use super::{LogInForm, get_auth_page, post_log_in};

    #[tokio::test]
    async fn auth_page_has_log_in_and_sign_up_forms() {
        let response = get_auth_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let forms = document
            .select(&Selector::parse("form").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(forms.len(), 2, "want 2 forms, got {}", forms.len());

        assert_hx_endpoint(&forms[0], endpoints::LOG_IN, "hx-post");
        assert_form_input(&forms[0], "email", "email");
        assert_form_input(&forms[0], "password", "password");
        assert_form_submit_button(&forms[0]);

        assert_hx_endpoint(&forms[1], endpoints::SIGN_UP, "hx-post");
        assert_form_input(&forms[1], "email", "email");
        assert_form_input(&forms[1], "password", "password");
        assert_form_submit_button(&forms[1]);
    }

    #[tokio::test]
    async fn log_in_with_correct_credentials_redirects_to_overview() {
        let state = get_test_auth_state();
        state
            .auth
            .sign_up("jo@example.com", TEST_PASSWORD, "")
            .unwrap();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Form(LogInForm {
                email: "jo@example.com".to_owned(),
                password: TEST_PASSWORD.to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::OVERVIEW_VIEW);
        let set_cookie = response
            .headers()
            .get("set-cookie")
            .expect("want session cookie")
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with(&format!("{COOKIE_ACCESS_TOKEN}=")));
    }

    #[tokio::test]
    async fn log_in_with_wrong_password_keeps_email() {
        let state = get_test_auth_state();
        state
            .auth
            .sign_up("jo@example.com", TEST_PASSWORD, "")
            .unwrap();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Form(LogInForm {
                email: "jo@example.com".to_owned(),
                password: "not my password".to_owned(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_input_with_value(&form, "email", "email", "jo@example.com");
        assert_form_error_message(&form, "Invalid login credentials");
    }

    #[tokio::test]
    async fn log_in_with_missing_fields_shows_error() {
        let state = get_test_auth_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(
            State(state),
            jar,
            Form(LogInForm {
                email: "  ".to_owned(),
                password: String::new(),
            }),
        )
        .await;

        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Email and password are required");
    }
}
