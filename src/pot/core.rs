//! The pot model, form validation and database queries.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    Error, UserID,
    form::{parse_positive_amount, required_text, to_cents},
    sorting::{SortValue, Sortable},
    theme::DEFAULT_THEME,
};

/// Database identifier for a pot.
pub type PotId = i64;

/// The longest pot name allowed, counted in grapheme clusters.
pub const MAX_POT_NAME_LENGTH: usize = 30;

/// The largest target a pot may have.
pub const MAX_POT_TARGET: f64 = 1_000_000.0;

/// Money set aside towards a savings goal.
///
/// The saved total is always between zero and the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pot {
    /// The ID of the pot.
    pub id: PotId,
    /// A name that is unique among the user's pots.
    pub name: String,
    /// The amount the user is saving towards.
    pub target: f64,
    /// The amount saved so far.
    pub total: f64,
    /// The ID of the pot's colour theme.
    pub theme: String,
    /// When the pot was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Pot {
    /// How far the pot is towards its target, between 0 and 100.
    pub fn percent_saved(&self) -> f64 {
        if self.target <= 0.0 {
            return 0.0;
        }

        (self.total / self.target * 100.0).clamp(0.0, 100.0)
    }
}

impl Sortable for Pot {
    fn sort_value(&self, field: &str) -> Option<SortValue<'_>> {
        match field {
            "name" => Some(SortValue::Text(&self.name)),
            "target" => Some(SortValue::Number(self.target)),
            "total" => Some(SortValue::Number(self.total)),
            "created_at" => Some(SortValue::Date(self.created_at)),
            "theme" => Some(SortValue::Text(&self.theme)),
            _ => None,
        }
    }
}

/// The raw data entered in the create and edit pot forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PotForm {
    /// The pot's name.
    pub name: String,
    /// The target as typed by the user.
    pub target: String,
    /// The theme ID. Blank means the default theme.
    pub theme: String,
}

/// Pot fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
struct ValidatedPot<'a> {
    name: &'a str,
    target: f64,
    theme: &'a str,
}

fn validate_pot_form(form: &PotForm) -> Result<ValidatedPot<'_>, Error> {
    let name = required_text(&form.name, "name", "Pot name is required")?;
    let target = parse_positive_amount(
        &form.target,
        "target",
        "Target amount must be a positive number",
    )?;

    if name.graphemes(true).count() > MAX_POT_NAME_LENGTH {
        return Err(Error::validation(
            "name",
            "Pot name must be 30 characters or less",
        ));
    }

    if target > MAX_POT_TARGET {
        return Err(Error::validation(
            "target",
            "Target amount cannot exceed $1,000,000",
        ));
    }

    let target = to_cents(target) as f64 / 100.0;
    if target <= 0.0 {
        return Err(Error::validation(
            "target",
            "Target amount must be a positive number",
        ));
    }

    let theme = match form.theme.trim() {
        "" => DEFAULT_THEME,
        theme => theme,
    };

    Ok(ValidatedPot {
        name,
        target,
        theme,
    })
}

/// Create the pot table.
pub fn create_pot_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS pot (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                target REAL NOT NULL CHECK (target > 0),
                total REAL NOT NULL DEFAULT 0 CHECK (total >= 0 AND total <= target),
                theme TEXT NOT NULL DEFAULT 'blue',
                created_at TEXT NOT NULL,
                UNIQUE(user_id, name),
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE,
                FOREIGN KEY(theme) REFERENCES color(id)
                )",
        (),
    )?;

    Ok(())
}

fn map_sql_error(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicatePotName(name.to_owned()),
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

fn find_pot_with_name(
    user_id: UserID,
    name: &str,
    connection: &Connection,
) -> Result<Option<PotId>, Error> {
    connection
        .query_row(
            "SELECT id FROM pot WHERE user_id = ?1 AND name = ?2",
            (user_id.as_i64(), name),
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
}

/// Validate `form` and create a new, empty pot for `user_id`.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] if a field is missing, malformed or out of range,
/// - [Error::DuplicatePotName] if the user already has a pot with the same name,
/// - [Error::SqlError] if some other SQL error occurred.
pub fn create_pot(user_id: UserID, form: &PotForm, connection: &Connection) -> Result<Pot, Error> {
    let pot = validate_pot_form(form)?;

    if find_pot_with_name(user_id, pot.name, connection)?.is_some() {
        return Err(Error::DuplicatePotName(pot.name.to_owned()));
    }

    connection
        .prepare(
            "INSERT INTO pot (user_id, name, target, total, theme, created_at)
            VALUES (?1, ?2, ?3, 0, ?4, ?5)
            RETURNING id, name, target, total, theme, created_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                pot.name,
                pot.target,
                pot.theme,
                OffsetDateTime::now_utc(),
            ),
            map_pot_row,
        )
        .map_err(|error| map_sql_error(error, pot.name))
}

/// Get the pot `pot_id` if it belongs to `user_id`.
///
/// # Errors
/// Returns [Error::PotNotFound] if the pot does not exist or belongs to someone else.
pub fn get_pot(user_id: UserID, pot_id: PotId, connection: &Connection) -> Result<Pot, Error> {
    connection
        .prepare(
            "SELECT id, name, target, total, theme, created_at
            FROM pot WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((pot_id, user_id.as_i64()), map_pot_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::PotNotFound,
            error => error.into(),
        })
}

/// Get every pot belonging to `user_id`, newest first.
pub fn get_pots(user_id: UserID, connection: &Connection) -> Result<Vec<Pot>, Error> {
    connection
        .prepare(
            "SELECT id, name, target, total, theme, created_at
            FROM pot WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], map_pot_row)?
        .map(|maybe_pot| maybe_pot.map_err(Error::from))
        .collect()
}

/// Change the name, target and theme of a pot. The saved total is never changed.
///
/// # Errors
/// Returns a:
/// - [Error::Validation] if a field is missing, malformed or out of range,
/// - [Error::PotNotFound] if the pot does not exist or belongs to someone else,
/// - [Error::DuplicatePotName] if another of the user's pots has the same name,
/// - [Error::TargetBelowTotal] if the new target is less than the saved total.
pub fn update_pot(
    user_id: UserID,
    pot_id: PotId,
    form: &PotForm,
    connection: &Connection,
) -> Result<Pot, Error> {
    let update = validate_pot_form(form)?;
    let existing = get_pot(user_id, pot_id, connection)?;

    match find_pot_with_name(user_id, update.name, connection)? {
        Some(other_id) if other_id != pot_id => {
            return Err(Error::DuplicatePotName(update.name.to_owned()));
        }
        _ => {}
    }

    if to_cents(update.target) < to_cents(existing.total) {
        return Err(Error::TargetBelowTotal(existing.total));
    }

    connection
        .prepare(
            "UPDATE pot SET name = ?1, target = ?2, theme = ?3
            WHERE id = ?4 AND user_id = ?5
            RETURNING id, name, target, total, theme, created_at",
        )?
        .query_row(
            (
                update.name,
                update.target,
                update.theme,
                pot_id,
                user_id.as_i64(),
            ),
            map_pot_row,
        )
        .map_err(|error| map_sql_error(error, update.name))
}

/// Delete an empty pot.
///
/// # Errors
/// Returns a:
/// - [Error::PotNotFound] if the pot does not exist or belongs to someone else,
/// - [Error::PotNotEmpty] if the pot still holds money.
pub fn delete_pot(user_id: UserID, pot_id: PotId, connection: &Connection) -> Result<(), Error> {
    let pot = get_pot(user_id, pot_id, connection)?;

    if to_cents(pot.total) > 0 {
        return Err(Error::PotNotEmpty {
            name: pot.name,
            total: pot.total,
        });
    }

    connection.execute(
        "DELETE FROM pot WHERE id = ?1 AND user_id = ?2",
        (pot_id, user_id.as_i64()),
    )?;

    Ok(())
}

/// Map a database row to a Pot.
pub fn map_pot_row(row: &Row) -> Result<Pot, rusqlite::Error> {
    Ok(Pot {
        id: row.get(0)?,
        name: row.get(1)?,
        target: row.get(2)?,
        total: row.get(3)?,
        theme: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error, UserID,
        balance::get_balance,
        pot::{add_money_to_pot, withdraw_from_pot},
        test_utils::{create_test_user, get_test_connection},
        transaction::{Transaction, create_transaction},
    };

    use super::{PotForm, create_pot, delete_pot, get_pot, get_pots, update_pot};

    fn form(name: &str, target: &str) -> PotForm {
        PotForm {
            name: name.to_owned(),
            target: target.to_owned(),
            theme: String::new(),
        }
    }

    fn set_total(pot_id: i64, total: f64, connection: &Connection) {
        connection
            .execute("UPDATE pot SET total = ?1 WHERE id = ?2", (total, pot_id))
            .unwrap();
    }

    #[test]
    fn create_pot_starts_empty_with_default_theme() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);

        let pot = create_pot(user_id, &form(" Holiday ", "1500"), &conn).unwrap();

        assert_eq!(pot.name, "Holiday");
        assert_eq!(pot.target, 1500.0);
        assert_eq!(pot.total, 0.0);
        assert_eq!(pot.theme, "blue");
    }

    #[test]
    fn create_pot_validates_fields() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        let cases = [
            (form("", "100"), "name", "Pot name is required"),
            (
                form("Holiday", "abc"),
                "target",
                "Target amount must be a positive number",
            ),
            (
                form("Holiday", "-5"),
                "target",
                "Target amount must be a positive number",
            ),
            (
                form(&"a".repeat(31), "100"),
                "name",
                "Pot name must be 30 characters or less",
            ),
            (
                form("Holiday", "1000000.01"),
                "target",
                "Target amount cannot exceed $1,000,000",
            ),
        ];

        for (pot_form, field, message) in cases {
            assert_eq!(
                create_pot(user_id, &pot_form, &conn),
                Err(Error::validation(field, message))
            );
        }
    }

    #[test]
    fn name_length_counts_graphemes() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);

        let result = create_pot(user_id, &form(&"🇳🇿".repeat(30), "100"), &conn);

        assert!(result.is_ok(), "got {result:?}");
    }

    #[test]
    fn create_pot_rejects_unknown_theme() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        let pot_form = PotForm {
            theme: "plaid".to_owned(),
            ..form("Holiday", "100")
        };

        assert_eq!(
            create_pot(user_id, &pot_form, &conn),
            Err(Error::validation("theme", "Theme does not exist"))
        );
    }

    #[test]
    fn duplicate_name_is_rejected_per_user() {
        let conn = get_test_connection();
        let jo = create_test_user("jo@example.com", &conn);
        let sam = create_test_user("sam@example.com", &conn);
        create_pot(jo, &form("Holiday", "100"), &conn).unwrap();

        let duplicate = create_pot(jo, &form("Holiday", "200"), &conn);
        let other_user = create_pot(sam, &form("Holiday", "200"), &conn);

        assert_eq!(duplicate, Err(Error::DuplicatePotName("Holiday".to_owned())));
        assert_eq!(
            duplicate.unwrap_err().to_string(),
            "A pot with this name already exists"
        );
        assert!(other_user.is_ok());
    }

    #[test]
    fn pots_of_other_users_are_not_found() {
        let conn = get_test_connection();
        let jo = create_test_user("jo@example.com", &conn);
        let sam = create_test_user("sam@example.com", &conn);
        let pot = create_pot(jo, &form("Holiday", "100"), &conn).unwrap();

        assert_eq!(get_pot(sam, pot.id, &conn), Err(Error::PotNotFound));
        assert_eq!(
            update_pot(sam, pot.id, &form("Mine now", "100"), &conn),
            Err(Error::PotNotFound)
        );
        assert_eq!(delete_pot(sam, pot.id, &conn), Err(Error::PotNotFound));
        assert!(get_pots(sam, &conn).unwrap().is_empty());
    }

    #[test]
    fn update_keeps_total_and_allows_same_name() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        let pot = create_pot(user_id, &form("Holiday", "100"), &conn).unwrap();
        set_total(pot.id, 40.0, &conn);

        let updated = update_pot(
            user_id,
            pot.id,
            &PotForm {
                theme: "green".to_owned(),
                ..form("Holiday", "250")
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.name, "Holiday");
        assert_eq!(updated.target, 250.0);
        assert_eq!(updated.total, 40.0);
        assert_eq!(updated.theme, "green");
    }

    #[test]
    fn update_rejects_name_of_other_pot() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        create_pot(user_id, &form("Holiday", "100"), &conn).unwrap();
        let car = create_pot(user_id, &form("Car", "100"), &conn).unwrap();

        let result = update_pot(user_id, car.id, &form("Holiday", "100"), &conn);

        assert_eq!(result, Err(Error::DuplicatePotName("Holiday".to_owned())));
    }

    #[test]
    fn update_rejects_target_below_total() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        let pot = create_pot(user_id, &form("Holiday", "100"), &conn).unwrap();
        set_total(pot.id, 50.0, &conn);

        let result = update_pot(user_id, pot.id, &form("Holiday", "49.99"), &conn);

        assert_eq!(result, Err(Error::TargetBelowTotal(50.0)));
        assert_eq!(
            result.unwrap_err().to_string(),
            "Target cannot be less than current saved amount ($50.00)"
        );
    }

    #[test]
    fn delete_requires_empty_pot() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        create_transaction(
            user_id,
            &Transaction::build("Salary", 200.0, datetime!(2024-08-01 9:00 UTC), 10),
            &conn,
        )
        .unwrap();
        let pot = create_pot(user_id, &form("Holiday", "100"), &conn).unwrap();
        assert!(add_money_to_pot(user_id, pot.id, 50.0, &conn).unwrap().success);

        assert_eq!(
            delete_pot(user_id, pot.id, &conn),
            Err(Error::PotNotEmpty {
                name: "Holiday".to_owned(),
                total: 50.0
            })
        );

        assert!(withdraw_from_pot(user_id, pot.id, 20.0, &conn).unwrap().success);
        assert!(delete_pot(user_id, pot.id, &conn).is_err());
        assert!(withdraw_from_pot(user_id, pot.id, 30.0, &conn).unwrap().success);

        assert_eq!(delete_pot(user_id, pot.id, &conn), Ok(()));
        assert_eq!(get_pot(user_id, pot.id, &conn), Err(Error::PotNotFound));
        assert_eq!(get_balance(user_id, &conn).unwrap().current, 200.0);
    }

    #[test]
    fn pots_are_listed_newest_first() {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        create_pot(user_id, &form("First", "100"), &conn).unwrap();
        create_pot(user_id, &form("Second", "100"), &conn).unwrap();

        let names = get_pots(user_id, &conn)
            .unwrap()
            .into_iter()
            .map(|pot| pot.name)
            .collect::<Vec<_>>();

        assert_eq!(names, ["Second", "First"]);
    }

    #[test]
    fn unknown_user_has_no_pots() {
        let conn = get_test_connection();

        assert!(get_pots(UserID::new(42), &conn).unwrap().is_empty());
    }
}
