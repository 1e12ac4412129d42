//! The per-user balance: money available, total income and total expenses.
//!
//! Transactions update the balance through triggers on the transaction table
//! and pot transfers move money between the balance and a pot.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{Error, UserID};

/// A user's running totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Balance {
    /// Money that is not set aside in a pot.
    pub current: f64,
    /// The sum of all income transactions.
    pub income: f64,
    /// The sum of all expense transactions, as a positive number.
    pub expenses: f64,
}

/// Create the balance table.
pub fn create_balance_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS balance (
                user_id INTEGER PRIMARY KEY,
                current REAL NOT NULL DEFAULT 0,
                income REAL NOT NULL DEFAULT 0,
                expenses REAL NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create a zero balance for a new user.
pub fn create_balance(user_id: UserID, connection: &Connection) -> Result<Balance, Error> {
    connection.execute(
        "INSERT INTO balance (user_id) VALUES (?1)",
        [user_id.as_i64()],
    )?;

    Ok(Balance {
        current: 0.0,
        income: 0.0,
        expenses: 0.0,
    })
}

/// Get the balance for `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no balance row.
pub fn get_balance(user_id: UserID, connection: &Connection) -> Result<Balance, Error> {
    connection
        .prepare("SELECT current, income, expenses FROM balance WHERE user_id = ?1")?
        .query_row([user_id.as_i64()], map_row)
        .map_err(|error| error.into())
}

fn map_row(row: &Row) -> Result<Balance, rusqlite::Error> {
    Ok(Balance {
        current: row.get(0)?,
        income: row.get(1)?,
        expenses: row.get(2)?,
    })
}
