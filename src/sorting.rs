//! Sorting items by a named field with configurable comparison semantics.
//!
//! Sort options are static reference data stored in the database. The
//! transactions page uses the transaction sort options and the pots page uses
//! the generic sort options. Each option names a field, a direction and how
//! the field's values should be compared.

use std::{cmp::Ordering, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::Serialize;
use time::OffsetDateTime;

use crate::Error;

/// The sort option used by the transactions page when none is selected.
pub const DEFAULT_TRANSACTION_SORT: &str = "latest";

/// The sort option used by the pots page when none is selected.
pub const DEFAULT_POT_SORT: &str = "newest";

/// The order to sort items in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(Error::validation(
                "direction",
                format!("unknown sort direction \"{other}\""),
            )),
        }
    }
}

/// How two field values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    /// Case-insensitive text, ties broken case-sensitively.
    String,
    /// Numeric difference.
    Number,
    /// Timestamp difference.
    Date,
    /// `false` before `true`.
    Boolean,
}

impl FromStr for SortType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "boolean" => Ok(Self::Boolean),
            other => Err(Error::validation(
                "type",
                format!("unknown sort type \"{other}\""),
            )),
        }
    }
}

/// What to sort by and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig<'a> {
    /// The field name passed to [Sortable::sort_value].
    pub field: &'a str,
    /// Ascending or descending.
    pub direction: SortDirection,
    /// The comparison semantics.
    pub sort_type: SortType,
}

/// A named sort configuration the user can pick from a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOption {
    /// A stable ID such as "latest".
    pub id: String,
    /// The text shown in the sort selector.
    pub label: String,
    /// The field to sort by.
    pub field: String,
    /// Ascending or descending.
    pub direction: SortDirection,
    /// The comparison semantics.
    #[serde(rename = "type")]
    pub sort_type: SortType,
}

impl SortOption {
    /// The comparator configuration for this option.
    pub fn config(&self) -> SortConfig<'_> {
        SortConfig {
            field: &self.field,
            direction: self.direction,
            sort_type: self.sort_type,
        }
    }
}

/// A field value that can be compared.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue<'a> {
    /// Text.
    Text(&'a str),
    /// A number.
    Number(f64),
    /// A point in time.
    Date(OffsetDateTime),
    /// A flag.
    Boolean(bool),
}

impl SortValue<'_> {
    fn as_number(&self) -> Option<f64> {
        match self {
            SortValue::Number(number) => Some(*number),
            SortValue::Boolean(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// Items whose fields can be looked up by name for sorting.
pub trait Sortable {
    /// The value of `field`, or `None` if the item has no such field.
    fn sort_value(&self, field: &str) -> Option<SortValue<'_>>;
}

fn compare_values(a: Option<SortValue>, b: Option<SortValue>, sort_type: SortType) -> Ordering {
    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };

    match (sort_type, &a, &b) {
        (SortType::String, SortValue::Text(a), SortValue::Text(b)) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
        (SortType::Date, SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
        (SortType::Number | SortType::Boolean, _, _) => match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

/// Return a copy of `items` sorted according to `config`.
///
/// The sort is stable. Items missing the field, or whose values do not match
/// the sort type, compare equal.
pub fn sort_by_config<T: Sortable + Clone>(items: &[T], config: &SortConfig) -> Vec<T> {
    let mut sorted = items.to_vec();

    sorted.sort_by(|a, b| {
        let ordering = compare_values(
            a.sort_value(config.field),
            b.sort_value(config.field),
            config.sort_type,
        );

        match config.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    sorted
}

/// Return a copy of `items` sorted by the option with `option_id`.
///
/// An unknown ID logs a warning and returns the items in their original order.
pub fn sort_by_option<T: Sortable + Clone>(
    items: &[T],
    option_id: &str,
    options: &[SortOption],
) -> Vec<T> {
    match options.iter().find(|option| option.id == option_id) {
        Some(option) => sort_by_config(items, &option.config()),
        None => {
            tracing::warn!("Sort option \"{option_id}\" not found");
            items.to_vec()
        }
    }
}

const TRANSACTION_SORT_OPTIONS: [(&str, &str, &str, &str, &str); 6] = [
    ("latest", "Latest", "date", "desc", "date"),
    ("oldest", "Oldest", "date", "asc", "date"),
    ("a_to_z", "A to Z", "name", "asc", "string"),
    ("z_to_a", "Z to A", "name", "desc", "string"),
    ("highest", "Highest", "amount", "desc", "number"),
    ("lowest", "Lowest", "amount", "asc", "number"),
];

const SORT_OPTIONS: [(&str, &str, &str, &str, &str); 6] = [
    ("newest", "Newest", "created_at", "desc", "date"),
    ("oldest", "Oldest", "created_at", "asc", "date"),
    ("name_asc", "Name (A to Z)", "name", "asc", "string"),
    ("name_desc", "Name (Z to A)", "name", "desc", "string"),
    ("highest_target", "Highest target", "target", "desc", "number"),
    ("most_saved", "Most saved", "total", "desc", "number"),
];

fn create_options_table(
    table: &str,
    options: &[(&str, &str, &str, &str, &str)],
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                field TEXT NOT NULL,
                direction TEXT NOT NULL CHECK (direction IN ('asc', 'desc')),
                type TEXT NOT NULL CHECK (type IN ('string', 'number', 'date', 'boolean')),
                position INTEGER NOT NULL
                )"
        ),
        (),
    )?;

    let mut statement = connection.prepare(&format!(
        "INSERT OR IGNORE INTO {table} (id, label, field, direction, type, position)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    ))?;

    for (position, (id, label, field, direction, sort_type)) in options.iter().enumerate() {
        statement.execute((id, label, field, direction, sort_type, position as i64))?;
    }

    Ok(())
}

/// Create and seed the table of sort options for the transactions page.
pub fn create_transaction_sort_option_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_options_table(
        "transaction_sort_option",
        &TRANSACTION_SORT_OPTIONS,
        connection,
    )
}

/// Create and seed the table of generic sort options.
pub fn create_sort_option_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_options_table("sort_option", &SORT_OPTIONS, connection)
}

fn get_options(table: &str, connection: &Connection) -> Result<Vec<SortOption>, Error> {
    connection
        .prepare(&format!(
            "SELECT id, label, field, direction, type FROM {table} ORDER BY position ASC"
        ))?
        .query_map([], map_row)?
        .map(|maybe_option| maybe_option.map_err(Error::from))
        .collect()
}

/// Get the sort options for the transactions page in display order.
pub fn get_transaction_sort_options(connection: &Connection) -> Result<Vec<SortOption>, Error> {
    get_options("transaction_sort_option", connection)
}

/// Get the generic sort options in display order.
pub fn get_sort_options(connection: &Connection) -> Result<Vec<SortOption>, Error> {
    get_options("sort_option", connection)
}

fn parse_column<T: FromStr<Err = Error>>(row: &Row, index: usize) -> Result<T, rusqlite::Error> {
    let text: String = row.get(index)?;

    text.parse()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn map_row(row: &Row) -> Result<SortOption, rusqlite::Error> {
    Ok(SortOption {
        id: row.get(0)?,
        label: row.get(1)?,
        field: row.get(2)?,
        direction: parse_column(row, 3)?,
        sort_type: parse_column(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::test_utils::get_test_connection;

    use super::{
        SortConfig, SortDirection, SortType, SortValue, Sortable, get_sort_options,
        get_transaction_sort_options, sort_by_config, sort_by_option,
    };

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        a: f64,
        name: &'static str,
        flag: bool,
    }

    impl Sortable for Item {
        fn sort_value(&self, field: &str) -> Option<SortValue<'_>> {
            match field {
                "a" => Some(SortValue::Number(self.a)),
                "name" => Some(SortValue::Text(self.name)),
                "flag" => Some(SortValue::Boolean(self.flag)),
                _ => None,
            }
        }
    }

    fn item(a: f64, name: &'static str) -> Item {
        Item {
            a,
            name,
            flag: false,
        }
    }

    fn values(items: &[Item]) -> Vec<f64> {
        items.iter().map(|item| item.a).collect()
    }

    #[test]
    fn sorts_numbers_in_both_directions() {
        let items = [item(3.0, "c"), item(1.0, "a"), item(2.0, "b")];
        let mut config = SortConfig {
            field: "a",
            direction: SortDirection::Asc,
            sort_type: SortType::Number,
        };

        assert_eq!(values(&sort_by_config(&items, &config)), [1.0, 2.0, 3.0]);

        config.direction = SortDirection::Desc;
        assert_eq!(values(&sort_by_config(&items, &config)), [3.0, 2.0, 1.0]);
    }

    #[test]
    fn strings_ignore_case_with_case_sensitive_tie_break() {
        let items = [item(1.0, "banana"), item(2.0, "apple"), item(3.0, "Apple")];
        let config = SortConfig {
            field: "name",
            direction: SortDirection::Asc,
            sort_type: SortType::String,
        };

        let names = sort_by_config(&items, &config)
            .into_iter()
            .map(|item| item.name)
            .collect::<Vec<_>>();

        assert_eq!(names, ["Apple", "apple", "banana"]);
    }

    #[test]
    fn booleans_sort_false_first() {
        let items = [
            Item {
                a: 1.0,
                name: "x",
                flag: true,
            },
            Item {
                a: 2.0,
                name: "y",
                flag: false,
            },
        ];
        let config = SortConfig {
            field: "flag",
            direction: SortDirection::Asc,
            sort_type: SortType::Boolean,
        };

        assert_eq!(values(&sort_by_config(&items, &config)), [2.0, 1.0]);
    }

    #[test]
    fn dates_compare_by_timestamp() {
        #[derive(Debug, Clone)]
        struct Dated(time::OffsetDateTime);

        impl Sortable for Dated {
            fn sort_value(&self, _field: &str) -> Option<SortValue<'_>> {
                Some(SortValue::Date(self.0))
            }
        }

        let items = [
            Dated(datetime!(2024-03-01 0:00 UTC)),
            Dated(datetime!(2024-01-01 0:00 UTC)),
        ];
        let config = SortConfig {
            field: "date",
            direction: SortDirection::Asc,
            sort_type: SortType::Date,
        };

        let sorted = sort_by_config(&items, &config);

        assert_eq!(sorted[0].0, datetime!(2024-01-01 0:00 UTC));
    }

    #[test]
    fn missing_field_keeps_original_order() {
        let items = [item(3.0, "c"), item(1.0, "a"), item(2.0, "b")];
        let config = SortConfig {
            field: "nope",
            direction: SortDirection::Asc,
            sort_type: SortType::Number,
        };

        assert_eq!(values(&sort_by_config(&items, &config)), [3.0, 1.0, 2.0]);
    }

    #[test]
    fn mismatched_type_compares_equal() {
        let items = [item(3.0, "c"), item(1.0, "a")];
        let config = SortConfig {
            field: "name",
            direction: SortDirection::Asc,
            sort_type: SortType::Number,
        };

        assert_eq!(values(&sort_by_config(&items, &config)), [3.0, 1.0]);
    }

    #[test]
    fn sort_is_stable() {
        let items = [item(1.0, "first"), item(0.0, "x"), item(1.0, "second")];
        let config = SortConfig {
            field: "a",
            direction: SortDirection::Desc,
            sort_type: SortType::Number,
        };

        let names = sort_by_config(&items, &config)
            .into_iter()
            .map(|item| item.name)
            .collect::<Vec<_>>();

        assert_eq!(names, ["first", "second", "x"]);
    }

    #[test]
    fn unknown_option_returns_copy() {
        let items = [item(3.0, "c"), item(1.0, "a")];

        let sorted = sort_by_option(&items, "nope", &[]);

        assert_eq!(sorted, items);
    }

    #[test]
    fn options_are_seeded_in_display_order() {
        let connection = get_test_connection();

        let transaction_options = get_transaction_sort_options(&connection).unwrap();
        let options = get_sort_options(&connection).unwrap();

        assert_eq!(transaction_options[0].id, "latest");
        assert_eq!(transaction_options[0].direction, SortDirection::Desc);
        assert_eq!(transaction_options[0].sort_type, SortType::Date);
        assert_eq!(transaction_options.len(), 6);
        assert_eq!(options[0].id, "newest");
        assert_eq!(options.len(), 6);
    }

    #[test]
    fn sort_by_option_uses_option_config() {
        let connection = get_test_connection();
        let options = get_sort_options(&connection).unwrap();
        let items = [item(1.0, "b"), item(2.0, "a")];

        let sorted = sort_by_option(&items, "name_asc", &options);

        assert_eq!(values(&sorted), [2.0, 1.0]);
    }
}
