//! Pennywise is a web app for tracking your balance, transactions, savings
//! pots and budgets.
//!
//! This library provides a REST API that directly serves HTML pages. Forms are
//! submitted with HTMX and every write is validated before it reaches the
//! SQLite database.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod balance;
mod budget;
mod category;
mod db;
mod endpoints;
mod error;
mod form;
mod html;
mod internal_server_error;
mod loader;
mod logging;
mod navigation;
mod not_found;
mod overview;
mod pot;
mod routing;
mod sorting;
mod theme;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    AuthBackend, AuthSession, PasswordHash, SqliteAuth, UserID, ValidatedPassword,
    get_user_by_email, set_user_password,
};
pub use balance::get_balance;
pub use budget::{BudgetForm, create_budget};
pub use category::{Category, CategoryId, get_categories};
pub use db::initialize as initialize_db;
pub use error::Error;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pot::{PotForm, ProcedureResult, add_money_to_pot, create_pot};
pub use routing::build_router;
pub use transaction::{NewTransaction, Transaction, create_transaction};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}
