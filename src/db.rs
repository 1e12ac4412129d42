//! Creates the application's tables and seeds the static reference data.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    auth::{create_password_reset_table, create_session_table, create_user_table},
    balance::create_balance_table,
    budget::create_budget_table,
    category::create_category_table,
    pot::create_pot_table,
    sorting::{create_sort_option_table, create_transaction_sort_option_table},
    theme::create_color_table,
    transaction::create_transaction_table,
};

/// Create all the tables, triggers and reference data for the application.
///
/// Safe to call on an existing database: tables are only created if they are
/// missing and seed rows are inserted with `INSERT OR IGNORE`.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the statements fail.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_session_table(&transaction)?;
    create_password_reset_table(&transaction)?;
    create_category_table(&transaction)?;
    create_color_table(&transaction)?;
    create_balance_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_pot_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_transaction_sort_option_table(&transaction)?;
    create_sort_option_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the shared database connection, logging a poisoned lock.
pub fn lock_connection(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
