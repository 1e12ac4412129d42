//! The budget model, form validation and database queries.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{
    Error, UserID,
    category::CategoryId,
    form::{parse_positive_amount, required_text, to_cents},
    theme::DEFAULT_THEME,
    transaction::Transaction,
};

/// Database identifier for a budget.
pub type BudgetId = i64;

/// The largest maximum a budget may have.
pub const MAX_BUDGET_AMOUNT: f64 = 1_000_000.0;

/// A monthly spending limit for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The category whose expenses count towards the budget.
    pub category_id: CategoryId,
    /// The most the user wants to spend in the category each month.
    pub maximum: f64,
    /// The ID of the budget's colour theme.
    pub theme: String,
    /// When the budget was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The raw data entered in the create and edit budget forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetForm {
    /// The category ID as submitted by the category selector.
    pub category_id: String,
    /// The maximum as typed by the user.
    pub maximum: String,
    /// The theme ID. Blank means the default theme.
    pub theme: String,
}

struct ValidatedBudget<'a> {
    category_id: CategoryId,
    maximum: f64,
    theme: &'a str,
}

fn category_exists(category_id: CategoryId, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT 1 FROM category WHERE id = ?1",
            [category_id],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(Error::from)
}

fn validate_budget_form<'a>(
    form: &'a BudgetForm,
    connection: &Connection,
) -> Result<ValidatedBudget<'a>, Error> {
    let category = required_text(&form.category_id, "category_id", "Budget category is required")?;
    let category_id = match category.parse::<CategoryId>() {
        Ok(id) if category_exists(id, connection)? => id,
        _ => {
            return Err(Error::validation(
                "category_id",
                "Selected category does not exist",
            ));
        }
    };

    let maximum = parse_positive_amount(
        &form.maximum,
        "maximum",
        "Maximum amount must be a positive number",
    )?;
    if maximum > MAX_BUDGET_AMOUNT {
        return Err(Error::validation(
            "maximum",
            "Maximum amount cannot exceed $1,000,000",
        ));
    }

    let maximum = to_cents(maximum) as f64 / 100.0;
    if maximum <= 0.0 {
        return Err(Error::validation(
            "maximum",
            "Maximum amount must be a positive number",
        ));
    }

    let theme = match form.theme.trim() {
        "" => DEFAULT_THEME,
        theme => theme,
    };

    Ok(ValidatedBudget {
        category_id,
        maximum,
        theme,
    })
}

/// Create the budget table.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                maximum REAL NOT NULL CHECK (maximum > 0),
                theme TEXT NOT NULL DEFAULT 'blue',
                created_at TEXT NOT NULL,
                UNIQUE(user_id, category_id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id),
                FOREIGN KEY(theme) REFERENCES color(id)
                )",
        (),
    )?;

    Ok(())
}

fn map_sql_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateBudgetCategory,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::validation("theme", "Theme does not exist"),
        error => error.into(),
    }
}

fn find_budget_for_category(
    user_id: UserID,
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Option<BudgetId>, Error> {
    connection
        .query_row(
            "SELECT id FROM budget WHERE user_id = ?1 AND category_id = ?2",
            (user_id.as_i64(), category_id),
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
}

/// Validate `form` and create a new budget for `user_id`.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] if a field is missing, malformed or out of range,
/// - [Error::DuplicateBudgetCategory] if the user already budgets for the category,
/// - [Error::SqlError] if some other SQL error occurred.
pub fn create_budget(
    user_id: UserID,
    form: &BudgetForm,
    connection: &Connection,
) -> Result<Budget, Error> {
    let budget = validate_budget_form(form, connection)?;

    if find_budget_for_category(user_id, budget.category_id, connection)?.is_some() {
        return Err(Error::DuplicateBudgetCategory);
    }

    connection
        .prepare(
            "INSERT INTO budget (user_id, category_id, maximum, theme, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, category_id, maximum, theme, created_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                budget.category_id,
                budget.maximum,
                budget.theme,
                OffsetDateTime::now_utc(),
            ),
            map_budget_row,
        )
        .map_err(map_sql_error)
}

/// Get the budget `budget_id` if it belongs to `user_id`.
///
/// # Errors
/// Returns [Error::BudgetNotFound] if the budget does not exist or belongs to someone else.
pub fn get_budget(
    user_id: UserID,
    budget_id: BudgetId,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .prepare(
            "SELECT id, category_id, maximum, theme, created_at
            FROM budget WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((budget_id, user_id.as_i64()), map_budget_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::BudgetNotFound,
            error => error.into(),
        })
}

/// Get every budget belonging to `user_id`, newest first.
pub fn get_budgets(user_id: UserID, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, category_id, maximum, theme, created_at
            FROM budget WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// Change the category, maximum and theme of a budget.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] if a field is missing, malformed or out of range,
/// - [Error::BudgetNotFound] if the budget does not exist or belongs to someone else,
/// - [Error::DuplicateBudgetCategory] if another of the user's budgets has the category.
pub fn update_budget(
    user_id: UserID,
    budget_id: BudgetId,
    form: &BudgetForm,
    connection: &Connection,
) -> Result<Budget, Error> {
    let update = validate_budget_form(form, connection)?;
    get_budget(user_id, budget_id, connection)?;

    match find_budget_for_category(user_id, update.category_id, connection)? {
        Some(other_id) if other_id != budget_id => return Err(Error::DuplicateBudgetCategory),
        _ => {}
    }

    connection
        .prepare(
            "UPDATE budget SET category_id = ?1, maximum = ?2, theme = ?3
            WHERE id = ?4 AND user_id = ?5
            RETURNING id, category_id, maximum, theme, created_at",
        )?
        .query_row(
            (
                update.category_id,
                update.maximum,
                update.theme,
                budget_id,
                user_id.as_i64(),
            ),
            map_budget_row,
        )
        .map_err(map_sql_error)
}

/// Delete a budget.
///
/// # Errors
/// Returns [Error::BudgetNotFound] if the budget does not exist or belongs to someone else.
pub fn delete_budget(
    user_id: UserID,
    budget_id: BudgetId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (budget_id, user_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        Err(Error::BudgetNotFound)
    } else {
        Ok(())
    }
}

/// Map a database row to a Budget.
pub fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        maximum: row.get(2)?,
        theme: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// The total spent in `category_id` during the calendar month containing `today`.
///
/// Transaction dates are converted to `offset` before comparing months, so a
/// purchase late on the last day of the month counts towards that month in
/// the user's timezone. Income is ignored.
pub fn spent_in_month(
    transactions: &[Transaction],
    category_id: CategoryId,
    today: Date,
    offset: UtcOffset,
) -> f64 {
    let cents: i64 = transactions
        .iter()
        .filter(|transaction| transaction.category_id == category_id && transaction.amount < 0.0)
        .filter(|transaction| {
            let date = transaction.date.to_offset(offset).date();
            date.year() == today.year() && date.month() == today.month()
        })
        .map(|transaction| to_cents(-transaction.amount))
        .sum();

    cents as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use time::{
        UtcOffset,
        macros::{date, datetime, offset},
    };

    use crate::{
        Error,
        test_utils::{create_test_user, get_test_connection},
        transaction::Transaction,
    };

    use super::{
        BudgetForm, create_budget, delete_budget, get_budget, get_budgets, spent_in_month,
        update_budget,
    };

    fn form(category_id: &str, maximum: &str) -> BudgetForm {
        BudgetForm {
            category_id: category_id.to_owned(),
            maximum: maximum.to_owned(),
            theme: String::new(),
        }
    }

    #[test]
    fn create_budget_succeeds_with_default_theme() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);

        let budget = create_budget(user_id, &form("3", "450.5"), &conn).unwrap();

        assert_eq!(budget.category_id, 3);
        assert_eq!(budget.maximum, 450.5);
        assert_eq!(budget.theme, "blue");
    }

    #[test]
    fn create_budget_validates_fields() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        let cases = [
            (form("", "100"), "category_id", "Budget category is required"),
            (form("999", "100"), "category_id", "Selected category does not exist"),
            (form("abc", "100"), "category_id", "Selected category does not exist"),
            (
                form("3", ""),
                "maximum",
                "Maximum amount must be a positive number",
            ),
            (
                form("3", "0"),
                "maximum",
                "Maximum amount must be a positive number",
            ),
            (
                form("3", "1000001"),
                "maximum",
                "Maximum amount cannot exceed $1,000,000",
            ),
        ];

        for (budget_form, field, message) in cases {
            assert_eq!(
                create_budget(user_id, &budget_form, &conn).map(|_| ()),
                Err(Error::validation(field, message))
            );
        }
    }

    #[test]
    fn duplicate_category_is_rejected() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        create_budget(user_id, &form("3", "100"), &conn).unwrap();

        let result = create_budget(user_id, &form("3", "200"), &conn);

        assert_eq!(result, Err(Error::DuplicateBudgetCategory));
        assert_eq!(
            result.unwrap_err().to_string(),
            "A budget with this category already exists"
        );
    }

    #[test]
    fn update_allows_own_category_and_rejects_others() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        let groceries = create_budget(user_id, &form("3", "100"), &conn).unwrap();
        create_budget(user_id, &form("4", "100"), &conn).unwrap();

        let updated = update_budget(user_id, groceries.id, &form("3", "250"), &conn).unwrap();
        let clash = update_budget(user_id, groceries.id, &form("4", "250"), &conn);

        assert_eq!(updated.maximum, 250.0);
        assert_eq!(clash, Err(Error::DuplicateBudgetCategory));
    }

    #[test]
    fn budgets_of_other_users_are_not_found() {
        let conn = get_test_connection();
        let jo = create_test_user("jo@example.com", &conn);
        let sam = create_test_user("sam@example.com", &conn);
        let budget = create_budget(jo, &form("3", "100"), &conn).unwrap();

        assert_eq!(get_budget(sam, budget.id, &conn), Err(Error::BudgetNotFound));
        assert_eq!(
            update_budget(sam, budget.id, &form("3", "1"), &conn),
            Err(Error::BudgetNotFound)
        );
        assert_eq!(delete_budget(sam, budget.id, &conn), Err(Error::BudgetNotFound));
        assert!(get_budgets(sam, &conn).unwrap().is_empty());
        assert_eq!(get_budgets(jo, &conn).unwrap().len(), 1);
    }

    #[test]
    fn budgets_are_listed_newest_first() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        create_budget(user_id, &form("3", "100"), &conn).unwrap();
        create_budget(user_id, &form("4", "100"), &conn).unwrap();

        let categories = get_budgets(user_id, &conn)
            .unwrap()
            .into_iter()
            .map(|budget| budget.category_id)
            .collect::<Vec<_>>();

        assert_eq!(categories, [4, 3]);
    }

    #[test]
    fn delete_removes_budget() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        let budget = create_budget(user_id, &form("3", "100"), &conn).unwrap();

        assert_eq!(delete_budget(user_id, budget.id, &conn), Ok(()));
        assert_eq!(
            get_budget(user_id, budget.id, &conn),
            Err(Error::BudgetNotFound)
        );
    }

    #[test]
    fn spent_in_month_counts_expenses_in_local_month() {
        let transactions = [
            Transaction::build("Shop", -20.0, datetime!(2024-08-10 12:00 UTC), 3),
            Transaction::build("Refund", 5.0, datetime!(2024-08-11 12:00 UTC), 3),
            Transaction::build("Cafe", -7.5, datetime!(2024-08-11 12:00 UTC), 4),
            Transaction::build("Last month", -9.0, datetime!(2024-07-31 10:00 UTC), 3),
            // 2024-07-31 13:00 UTC is 2024-08-01 in New Zealand.
            Transaction::build("Late night", -1.25, datetime!(2024-07-31 13:00 UTC), 3),
        ]
        .into_iter()
        .enumerate()
        .map(|(id, new)| Transaction {
            id: id as i64,
            avatar: new.avatar,
            name: new.name,
            category_id: new.category_id,
            date: new.date,
            amount: new.amount,
            recurring: new.recurring,
        })
        .collect::<Vec<_>>();

        assert_eq!(
            spent_in_month(&transactions, 3, date!(2024 - 08 - 15), offset!(+12)),
            21.25
        );
        assert_eq!(
            spent_in_month(&transactions, 3, date!(2024 - 08 - 15), UtcOffset::UTC),
            20.0
        );
    }
}
