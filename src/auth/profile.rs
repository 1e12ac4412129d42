//! The profile page and the handler for updating the profile.

use std::sync::Arc;

use axum::{
    Extension, Form,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    alert::Alert,
    auth::{AppSession, ProfileUpdate, user::Profile},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, CARD_STYLE, PAGE_CONTAINER_STYLE, base, loading_spinner,
        text_input,
    },
    navigation::NavBar,
};

fn profile_form(profile: &Profile) -> Markup {
    html! {
        form
            hx-put=(endpoints::PROFILE_API)
            hx-target="#alert-container"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            class="space-y-4"
        {
            (text_input("full_name", "Full name", "text", &profile.full_name, false))
            (text_input("username", "Username", "text", &profile.username, false))
            (text_input(
                "avatar_url",
                "Avatar URL",
                "url",
                profile.avatar_url.as_deref().unwrap_or_default(),
                false
            ))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Save profile"
            }
        }
    }
}

/// Display the signed in user's profile.
pub async fn get_profile_page(Extension(session): Extension<Arc<AppSession>>) -> Response {
    let nav_bar = NavBar::new(endpoints::PROFILE_VIEW).into_html();

    let content = match session.profile() {
        Some(profile) => html! {
            (nav_bar)

            div class=(PAGE_CONTAINER_STYLE)
            {
                div class=(CARD_STYLE)
                {
                    h1 class="text-xl font-bold mb-4" { "Profile" }
                    p class="mb-4 text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Signed in as " (profile.email)
                    }
                    (profile_form(&profile))
                }
            }
        },
        None => html! {
            (nav_bar)

            div class=(PAGE_CONTAINER_STYLE)
            {
                p { "Your profile could not be loaded. Try refreshing the page." }
            }
        },
    };

    base("Profile", &[], &content).into_response()
}

/// Update the signed in user's profile.
pub async fn update_profile_endpoint(
    Extension(session): Extension<Arc<AppSession>>,
    Form(updates): Form<ProfileUpdate>,
) -> Response {
    match session.update_profile(&updates) {
        Ok(_) => Alert::SuccessSimple {
            message: "Profile updated successfully!".to_owned(),
        }
        .into_response(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod profile_tests {
    use std::sync::Arc;

    use axum::{Extension, Form, http::StatusCode};

    use crate::{
        auth::{AuthBackend, AuthSession, ProfileUpdate},
        endpoints,
        test_utils::{
            TEST_PASSWORD, assert_hx_endpoint, assert_valid_html, get_test_auth,
            parse_html_document, parse_html_fragment,
        },
    };

    use super::{get_profile_page, update_profile_endpoint};

    #[tokio::test]
    async fn profile_page_shows_form_with_current_values() {
        let auth = Arc::new(get_test_auth());
        let signed_up = auth
            .sign_up("jo@example.com", TEST_PASSWORD, "Jo Bloggs")
            .unwrap();
        let session = AuthSession::initialize(auth, Some(signed_up.access_token)).await;

        let response = get_profile_page(Extension(Arc::new(session))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = document
            .select(&scraper::Selector::parse("form[hx-put]").unwrap())
            .next()
            .expect("No profile form found");
        assert_hx_endpoint(&form, endpoints::PROFILE_API, "hx-put");
        let full_name = form
            .select(&scraper::Selector::parse("input[name=full_name]").unwrap())
            .next()
            .expect("No full name input");
        assert_eq!(full_name.value().attr("value"), Some("Jo Bloggs"));
    }

    #[tokio::test]
    async fn update_profile_saves_changes() {
        let auth = Arc::new(get_test_auth());
        let signed_up = auth.sign_up("jo@example.com", TEST_PASSWORD, "").unwrap();
        let user_id = signed_up.user.id;
        let session = AuthSession::initialize(auth.clone(), Some(signed_up.access_token)).await;

        let response = update_profile_endpoint(
            Extension(Arc::new(session)),
            Form(ProfileUpdate {
                full_name: Some("Jo Bloggs".to_owned()),
                username: Some("jojo".to_owned()),
                avatar_url: Some(String::new()),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Profile updated successfully!"));
        let profile = auth.get_profile(user_id).unwrap();
        assert_eq!(profile.full_name, "Jo Bloggs");
        assert_eq!(profile.username, "jojo");
    }
}
