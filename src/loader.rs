//! Functions that fetch the data the app pages are rendered from.
//!
//! Categories, transactions and the balance are nice to have: if they cannot
//! be loaded the error is logged and the page renders without them. Sort
//! options, pots and budgets are required and a failure to load them fails
//! the whole page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState, Error, UserID,
    auth::{AppSession, AuthUser, Profile},
    balance::{Balance, get_balance},
    budget::{Budget, get_budgets},
    category::{Category, get_categories},
    db::lock_connection,
    pot::{Pot, get_pots},
    sorting::{SortOption, get_sort_options, get_transaction_sort_options},
    theme::{ColorTheme, get_themes},
    transaction::{Transaction, get_transactions},
};

/// Get the categories, or an empty list if they could not be loaded.
pub fn load_categories(connection: &Connection) -> Vec<Category> {
    get_categories(connection).unwrap_or_else(|error| {
        tracing::error!("Error loading categories: {error}");
        Vec::new()
    })
}

/// Get the colour themes, or an empty list if they could not be loaded.
pub fn load_themes(connection: &Connection) -> Vec<ColorTheme> {
    get_themes(connection).unwrap_or_else(|error| {
        tracing::error!("Error loading themes: {error}");
        Vec::new()
    })
}

/// Get the user's transactions, or an empty list if they could not be loaded.
pub fn load_transactions(user_id: UserID, connection: &Connection) -> Vec<Transaction> {
    get_transactions(user_id, connection).unwrap_or_else(|error| {
        tracing::error!("Error loading transactions for user {user_id}: {error}");
        Vec::new()
    })
}

/// Get the user's balance, or `None` if it could not be loaded.
pub fn load_balance(user_id: UserID, connection: &Connection) -> Option<Balance> {
    get_balance(user_id, connection)
        .inspect_err(|error| tracing::error!("Error loading balance for user {user_id}: {error}"))
        .ok()
}

/// Get the sort options for the transactions page.
///
/// # Errors
/// Returns the underlying error if the options could not be loaded.
pub fn load_transaction_sort_options(connection: &Connection) -> Result<Vec<SortOption>, Error> {
    get_transaction_sort_options(connection)
        .inspect_err(|error| tracing::error!("Failed to load transaction sort options: {error}"))
}

/// Get the sort options for the pots page.
///
/// # Errors
/// Returns the underlying error if the options could not be loaded.
pub fn load_sort_options(connection: &Connection) -> Result<Vec<SortOption>, Error> {
    get_sort_options(connection)
        .inspect_err(|error| tracing::error!("Failed to load sort options: {error}"))
}

/// Get the user's pots, newest first.
///
/// # Errors
/// Returns the underlying error if the pots could not be loaded.
pub fn load_pots(user_id: UserID, connection: &Connection) -> Result<Vec<Pot>, Error> {
    get_pots(user_id, connection)
        .inspect_err(|error| tracing::error!("Failed to load pots for user {user_id}: {error}"))
}

/// Get the user's budgets.
///
/// # Errors
/// Returns the underlying error if the budgets could not be loaded.
pub fn load_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    get_budgets(user_id, connection)
        .inspect_err(|error| tracing::error!("Failed to load budgets for user {user_id}: {error}"))
}

/// Everything the app layout needs, serialized as JSON for client side scripts.
#[derive(Debug, Clone, Serialize)]
pub struct AppData {
    /// The signed in user.
    pub user: AuthUser,
    /// The user's profile, if it has been loaded.
    pub profile: Option<Profile>,
    /// The transaction categories.
    pub categories: Vec<Category>,
    /// The sort options for the transactions page.
    pub transaction_sort_options: Vec<SortOption>,
    /// The user's transactions.
    pub transactions: Vec<Transaction>,
    /// The user's balance, absent if it could not be loaded.
    pub balance: Option<Balance>,
    /// The user's pots.
    pub pots: Vec<Pot>,
    /// The user's budgets.
    pub budgets: Vec<Budget>,
    /// The colour themes for pots and budgets.
    pub themes: Vec<ColorTheme>,
}

/// Assemble the layout data for `user`.
///
/// # Errors
/// Returns an error if any of the required data fails to load.
pub fn load_app_data(
    user: AuthUser,
    profile: Option<Profile>,
    connection: &Connection,
) -> Result<AppData, Error> {
    let user_id = user.id;

    Ok(AppData {
        categories: load_categories(connection),
        transaction_sort_options: load_transaction_sort_options(connection)?,
        transactions: load_transactions(user_id, connection),
        balance: load_balance(user_id, connection),
        pots: load_pots(user_id, connection)?,
        budgets: load_budgets(user_id, connection)?,
        themes: load_themes(connection),
        user,
        profile,
    })
}

/// The state needed for [get_app_data_endpoint].
#[derive(Debug, Clone)]
pub struct LoaderState {
    /// The database connection for reading the user's data.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoaderState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the signed in user's layout data as JSON.
pub async fn get_app_data_endpoint(
    State(state): State<LoaderState>,
    Extension(session): Extension<Arc<AppSession>>,
) -> Response {
    let Some(user) = session.user() else {
        return Error::NotAuthenticated.into_response();
    };
    let profile = session.profile();

    let result = lock_connection(&state.db_connection)
        .and_then(|connection| load_app_data(user, profile, &connection));

    match result {
        Ok(data) => Json(data).into_response(),
        Err(error) => error.into_response(),
    }
}
