//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_auth_page, get_profile_page, get_recover,
        get_reset_password_page, get_update_password_page, post_log_in, post_reset_password,
        post_sign_out, post_sign_up, post_update_password, update_profile_endpoint,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budgets_page, update_budget_endpoint,
    },
    endpoints,
    internal_server_error::get_internal_server_error_page,
    loader::get_app_data_endpoint,
    not_found::get_404_not_found,
    overview::get_overview_page,
    pot::{
        add_money_endpoint, create_pot_endpoint, delete_pot_endpoint, get_pots_page,
        update_pot_endpoint, withdraw_money_endpoint,
    },
    transaction::get_transactions_page,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::AUTH_VIEW, get(get_auth_page))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::SIGN_UP, post(post_sign_up))
        .route(endpoints::SIGN_OUT, post(post_sign_out))
        .route(
            endpoints::RESET_PASSWORD,
            get(get_reset_password_page).post(post_reset_password),
        )
        .route(endpoints::RECOVER, get(get_recover))
        .route(
            endpoints::UPDATE_PASSWORD,
            get(get_update_password_page).post(post_update_password),
        )
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::OVERVIEW_VIEW, get(get_overview_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::POTS_VIEW, get(get_pots_page))
        .route(endpoints::BUDGETS_VIEW, get(get_budgets_page))
        .route(endpoints::PROFILE_VIEW, get(get_profile_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes are called by HTMX and need the HX-Redirect header for auth redirects to work.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::POTS_API, post(create_pot_endpoint))
            .route(
                endpoints::POT,
                put(update_pot_endpoint).delete(delete_pot_endpoint),
            )
            .route(endpoints::POT_ADD, post(add_money_endpoint))
            .route(endpoints::POT_WITHDRAW, post(withdraw_money_endpoint))
            .route(endpoints::BUDGETS_API, post(create_budget_endpoint))
            .route(
                endpoints::BUDGET,
                put(update_budget_endpoint).delete(delete_budget_endpoint),
            )
            .route(endpoints::PROFILE_API, put(update_profile_endpoint))
            .route(endpoints::APP_DATA, get(get_app_data_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the overview page, which in turn redirects
/// to the auth page if the user is not logged in.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::OVERVIEW_VIEW)
}
