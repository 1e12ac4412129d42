//! Colour themes for pots and budgets, seeded when the database is initialized.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::Error;

/// The theme used when a form does not pick one.
pub const DEFAULT_THEME: &str = "blue";

/// A named colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorTheme {
    /// A short ID such as "green".
    pub id: String,
    /// The name shown to the user.
    pub name: String,
    /// The colour as a CSS hex string.
    pub hex: String,
}

const THEMES: [(&str, &str, &str); 14] = [
    ("green", "Green", "#277C78"),
    ("yellow", "Yellow", "#F2CDAC"),
    ("cyan", "Cyan", "#82C9D7"),
    ("navy", "Navy", "#626070"),
    ("red", "Red", "#C94736"),
    ("purple", "Purple", "#826CB0"),
    ("turquoise", "Turquoise", "#597C7C"),
    ("brown", "Brown", "#93674F"),
    ("magenta", "Magenta", "#934F6F"),
    ("blue", "Blue", "#3F82B2"),
    ("navy-grey", "Navy Grey", "#97A0AC"),
    ("army-green", "Army Green", "#7F9161"),
    ("gold", "Gold", "#CAB361"),
    ("orange", "Orange", "#BE6C49"),
];

/// Create the color table and insert the themes.
pub fn create_color_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS color (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                hex TEXT NOT NULL
                )",
        (),
    )?;

    let mut statement =
        connection.prepare("INSERT OR IGNORE INTO color (id, name, hex) VALUES (?1, ?2, ?3)")?;
    for theme in THEMES {
        statement.execute(theme)?;
    }

    Ok(())
}

/// Get every theme in insertion order.
pub fn get_themes(connection: &Connection) -> Result<Vec<ColorTheme>, Error> {
    connection
        .prepare("SELECT id, name, hex FROM color ORDER BY rowid ASC")?
        .query_map([], map_row)?
        .map(|maybe_theme| maybe_theme.map_err(Error::from))
        .collect()
}

/// Find the theme with `id` in `themes`.
pub fn get_theme_by_id<'a>(themes: &'a [ColorTheme], id: &str) -> Option<&'a ColorTheme> {
    themes.iter().find(|theme| theme.id == id)
}

/// The hex colour for theme `id`, falling back to grey for unknown themes.
pub fn theme_hex<'a>(themes: &'a [ColorTheme], id: &str) -> &'a str {
    get_theme_by_id(themes, id)
        .map(|theme| theme.hex.as_str())
        .unwrap_or("#696868")
}

fn map_row(row: &Row) -> Result<ColorTheme, rusqlite::Error> {
    Ok(ColorTheme {
        id: row.get(0)?,
        name: row.get(1)?,
        hex: row.get(2)?,
    })
}
