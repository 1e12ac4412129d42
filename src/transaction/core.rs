//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    category::CategoryId,
    sorting::{SortValue, Sortable},
};

/// Database identifier for a transaction.
pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A link to an image of the other party.
    pub avatar: String,
    /// Who the money was paid to or received from.
    pub name: String,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Positive amounts are income, negative amounts are expenses.
    pub amount: f64,
    /// Whether the transaction repeats every month, e.g. a bill.
    pub recurring: bool,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        name: &str,
        amount: f64,
        date: OffsetDateTime,
        category_id: CategoryId,
    ) -> NewTransaction {
        NewTransaction {
            avatar: String::new(),
            name: name.to_owned(),
            category_id,
            date,
            amount,
            recurring: false,
        }
    }
}

impl Sortable for Transaction {
    fn sort_value(&self, field: &str) -> Option<SortValue<'_>> {
        match field {
            "name" => Some(SortValue::Text(&self.name)),
            "date" => Some(SortValue::Date(self.date)),
            "amount" => Some(SortValue::Number(self.amount)),
            "category_id" => Some(SortValue::Number(self.category_id as f64)),
            "recurring" => Some(SortValue::Boolean(self.recurring)),
            _ => None,
        }
    }
}

/// A transaction that has not been stored yet.
///
/// Optional fields default to an empty avatar and a one-off transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// A link to an image of the other party.
    pub avatar: String,
    /// Who the money was paid to or received from.
    pub name: String,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// Positive amounts are income, negative amounts are expenses.
    pub amount: f64,
    /// Whether the transaction repeats every month.
    pub recurring: bool,
}

impl NewTransaction {
    /// Set the avatar link.
    pub fn avatar(mut self, avatar: &str) -> Self {
        self.avatar = avatar.to_owned();
        self
    }

    /// Mark the transaction as recurring.
    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table and the triggers that keep the balance in sync.
///
/// Inserting a transaction adds its amount to the owner's current balance and
/// to either their income or expenses. Deleting one reverses that.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                avatar TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                amount REAL NOT NULL,
                recurring INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id)
                );

        CREATE INDEX IF NOT EXISTS idx_transaction_user ON \"transaction\"(user_id);

        CREATE TRIGGER IF NOT EXISTS transaction_inserted_update_balance
        AFTER INSERT ON \"transaction\"
        BEGIN
            UPDATE balance SET
                current = current + NEW.amount,
                income = income + MAX(NEW.amount, 0),
                expenses = expenses + MAX(-NEW.amount, 0)
            WHERE user_id = NEW.user_id;
        END;

        CREATE TRIGGER IF NOT EXISTS transaction_deleted_update_balance
        AFTER DELETE ON \"transaction\"
        BEGIN
            UPDATE balance SET
                current = current - OLD.amount,
                income = income - MAX(OLD.amount, 0),
                expenses = expenses - MAX(-OLD.amount, 0)
            WHERE user_id = OLD.user_id;
        END;",
    )
}

/// Store a new transaction for `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] for `category_id` if the category does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserID,
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, avatar, name, category_id, date, amount, recurring)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, avatar, name, category_id, date, amount, recurring",
        )?
        .query_row(
            (
                user_id.as_i64(),
                &new_transaction.avatar,
                &new_transaction.name,
                new_transaction.category_id,
                new_transaction.date,
                new_transaction.amount,
                new_transaction.recurring,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::validation("category_id", "Category does not exist"),
            error => error.into(),
        })
}

/// Get every transaction belonging to `user_id` in the order they were stored.
pub fn get_transactions(user_id: UserID, connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, avatar, name, category_id, date, amount, recurring
            FROM \"transaction\" WHERE user_id = ?1 ORDER BY id ASC",
        )?
        .query_map([user_id.as_i64()], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        avatar: row.get(1)?,
        name: row.get(2)?,
        category_id: row.get(3)?,
        date: row.get(4)?,
        amount: row.get(5)?,
        recurring: row.get(6)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
