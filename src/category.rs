//! Transaction categories. These are static reference data seeded when the
//! database is initialized.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::Error;

/// Database identifier for a category.
pub type CategoryId = i64;

/// A label for grouping transactions and budgets, e.g. "Groceries".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// The category's ID.
    pub id: CategoryId,
    /// The name shown to the user.
    pub label: String,
}

const CATEGORIES: [(CategoryId, &str); 10] = [
    (1, "Entertainment"),
    (2, "Bills"),
    (3, "Groceries"),
    (4, "Dining Out"),
    (5, "Transportation"),
    (6, "Personal Care"),
    (7, "Education"),
    (8, "Lifestyle"),
    (9, "Shopping"),
    (10, "General"),
];

/// Create the category table and insert the categories.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                label TEXT NOT NULL UNIQUE
                )",
        (),
    )?;

    let mut statement =
        connection.prepare("INSERT OR IGNORE INTO category (id, label) VALUES (?1, ?2)")?;
    for (id, label) in CATEGORIES {
        statement.execute((id, label))?;
    }

    Ok(())
}

/// Get every category in alphabetical order.
pub fn get_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, label FROM category ORDER BY label ASC")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(Error::from))
        .collect()
}

/// Find the category with `id` in `categories`.
pub fn get_category_by_id(categories: &[Category], id: CategoryId) -> Option<&Category> {
    categories.iter().find(|category| category.id == id)
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        label: row.get(1)?,
    })
}
