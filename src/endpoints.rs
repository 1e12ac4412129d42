//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/pots/{pot_id}', use [format_endpoint].

/// The root route which redirects to the overview or auth page.
pub const ROOT: &str = "/";

/// The page with the log-in and sign-up forms.
pub const AUTH_VIEW: &str = "/auth";
/// The route for submitting the log-in form.
pub const LOG_IN: &str = "/auth/log_in";
/// The route for submitting the sign-up form.
pub const SIGN_UP: &str = "/auth/sign_up";
/// The route for signing out.
pub const SIGN_OUT: &str = "/auth/sign_out";
/// The page and route for requesting a password recovery link.
pub const RESET_PASSWORD: &str = "/auth/reset-password";
/// The route a password recovery link points to.
pub const RECOVER: &str = "/auth/recover";
/// The page and route for choosing a new password.
pub const UPDATE_PASSWORD: &str = "/auth/update-password";

/// The landing page for logged in users.
pub const OVERVIEW_VIEW: &str = "/app/overview";
/// The page for displaying a user's transactions.
pub const TRANSACTIONS_VIEW: &str = "/app/transactions";
/// The page for managing savings pots.
pub const POTS_VIEW: &str = "/app/pots";
/// The page for managing budgets.
pub const BUDGETS_VIEW: &str = "/app/budgets";
/// The page for viewing and editing the user's profile.
pub const PROFILE_VIEW: &str = "/app/profile";

/// The route for creating pots.
pub const POTS_API: &str = "/api/pots";
/// The route for updating and deleting a pot.
pub const POT: &str = "/api/pots/{pot_id}";
/// The route for moving money from the balance into a pot.
pub const POT_ADD: &str = "/api/pots/{pot_id}/add";
/// The route for moving money from a pot back to the balance.
pub const POT_WITHDRAW: &str = "/api/pots/{pot_id}/withdraw";
/// The route for creating budgets.
pub const BUDGETS_API: &str = "/api/budgets";
/// The route for updating and deleting a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";
/// The route for updating the user's profile.
pub const PROFILE_API: &str = "/api/profile";
/// The route for the JSON data set used by the app pages.
pub const APP_DATA: &str = "/api/app_data";

/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// Only the first parameter is replaced.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::AUTH_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN);
        assert_endpoint_is_valid_uri(endpoints::SIGN_UP);
        assert_endpoint_is_valid_uri(endpoints::SIGN_OUT);
        assert_endpoint_is_valid_uri(endpoints::RESET_PASSWORD);
        assert_endpoint_is_valid_uri(endpoints::RECOVER);
        assert_endpoint_is_valid_uri(endpoints::UPDATE_PASSWORD);
        assert_endpoint_is_valid_uri(endpoints::OVERVIEW_VIEW);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::POTS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::BUDGETS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::PROFILE_VIEW);
        assert_endpoint_is_valid_uri(endpoints::POTS_API);
        assert_endpoint_is_valid_uri(endpoints::BUDGETS_API);
        assert_endpoint_is_valid_uri(endpoints::PROFILE_API);
        assert_endpoint_is_valid_uri(endpoints::APP_DATA);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);
        assert_endpoint_is_valid_uri(endpoints::STATIC);

        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::POT, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::POT_ADD, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::POT_WITHDRAW, 1));
        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::BUDGET, 1));
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint(super::POT_WITHDRAW, 42);

        assert_eq!(formatted_path, "/api/pots/42/withdraw");
    }
}
