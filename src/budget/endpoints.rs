//! Route handlers for creating, editing and deleting budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, UserID,
    budget::{BudgetForm, BudgetId, create_budget, delete_budget, update_budget},
    db::lock_connection,
    endpoints,
};

/// The state needed by the budget route handlers.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn redirect_to_budgets() -> Response {
    (
        HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for creating a new budget, redirects to the budgets view on success.
pub async fn create_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| create_budget(user_id, &form, &connection));

    match result {
        Ok(budget) => {
            tracing::debug!("Created budget {} for user {user_id}", budget.id);
            redirect_to_budgets()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for changing a budget's category, maximum and theme.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| update_budget(user_id, budget_id, &form, &connection));

    match result {
        Ok(_) => redirect_to_budgets(),
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for deleting a budget.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserID>,
    Path(budget_id): Path<BudgetId>,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| delete_budget(user_id, budget_id, &connection));

    match result {
        Ok(()) => redirect_to_budgets(),
        Err(error) => error.into_alert_response(),
    }
}
