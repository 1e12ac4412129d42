//! Users, their profiles and the queries for reading and updating them.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The identity of a signed in user as seen by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The address the user signs in with.
    pub email: String,
}

/// A registered user including their password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The address the user signs in with.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// The editable profile attached to each user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    /// The user's ID.
    pub id: UserID,
    /// The address the user signs in with.
    pub email: String,
    /// The user's full name.
    pub full_name: String,
    /// The user's display name.
    pub username: String,
    /// A link to the user's profile picture.
    pub avatar_url: Option<String>,
    /// When the user signed up.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the profile last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A partial profile update. Fields set to `None` are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    /// The new full name.
    pub full_name: Option<String>,
    /// The new display name.
    pub username: Option<String>,
    /// The new profile picture link. An empty string clears it.
    pub avatar_url: Option<String>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password TEXT NOT NULL,
                full_name TEXT NOT NULL DEFAULT '',
                username TEXT NOT NULL DEFAULT '',
                avatar_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The username defaults to the part of the email before the '@'.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - [Error::SqlError] if some other SQL error occurred.
pub fn create_user(
    email: &str,
    password_hash: &PasswordHash,
    full_name: &str,
    connection: &Connection,
) -> Result<AuthUser, Error> {
    let now = OffsetDateTime::now_utc();
    let username = email.split('@').next().unwrap_or_default();

    connection.execute(
        "INSERT INTO user (email, password, full_name, username, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        (email, password_hash.as_ref(), full_name, username, now),
    )?;

    Ok(AuthUser {
        id: UserID::new(connection.last_insert_rowid()),
        email: email.to_owned(),
    })
}

/// Get the user registered with `email`, ignoring case.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has registered with `email`.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, password FROM user WHERE email = ?1")?
        .query_row([email.trim()], |row| {
            let raw_password_hash: String = row.get(2)?;

            Ok(User {
                id: UserID::new(row.get(0)?),
                email: row.get(1)?,
                password_hash: PasswordHash::new_unchecked(&raw_password_hash),
            })
        })
        .map_err(|error| error.into())
}

/// Replace the password hash for `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn set_user_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1, updated_at = ?2 WHERE id = ?3",
        (
            password_hash.as_ref(),
            OffsetDateTime::now_utc(),
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the profile for `user_id`.
pub fn get_profile(user_id: UserID, connection: &Connection) -> Result<Profile, Error> {
    connection
        .prepare(
            "SELECT id, email, full_name, username, avatar_url, created_at, updated_at
            FROM user WHERE id = ?1",
        )?
        .query_row([user_id.as_i64()], map_profile_row)
        .map_err(|error| error.into())
}

/// Apply `updates` to the profile for `user_id` and return the updated profile.
pub fn update_profile(
    user_id: UserID,
    updates: &ProfileUpdate,
    connection: &Connection,
) -> Result<Profile, Error> {
    let current = get_profile(user_id, connection)?;

    let full_name = updates
        .full_name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&current.full_name);
    let username = updates
        .username
        .as_deref()
        .map(str::trim)
        .unwrap_or(&current.username);
    let avatar_url = match updates.avatar_url.as_deref().map(str::trim) {
        Some("") => None,
        Some(url) => Some(url),
        None => current.avatar_url.as_deref(),
    };

    connection
        .prepare(
            "UPDATE user SET full_name = ?1, username = ?2, avatar_url = ?3, updated_at = ?4
            WHERE id = ?5
            RETURNING id, email, full_name, username, avatar_url, created_at, updated_at",
        )?
        .query_row(
            (
                full_name,
                username,
                avatar_url,
                OffsetDateTime::now_utc(),
                user_id.as_i64(),
            ),
            map_profile_row,
        )
        .map_err(|error| error.into())
}

fn map_profile_row(row: &Row) -> Result<Profile, rusqlite::Error> {
    Ok(Profile {
        id: UserID::new(row.get(0)?),
        email: row.get(1)?,
        full_name: row.get(2)?,
        username: row.get(3)?,
        avatar_url: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, PasswordHash};

    use super::{
        ProfileUpdate, UserID, create_user, create_user_table, get_profile, get_user_by_email,
        set_user_password, update_profile,
    };

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    #[test]
    fn insert_user_succeeds() {
        let conn = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let user = create_user("jo@example.com", &password_hash, "Jo Bloggs", &conn).unwrap();

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.email, "jo@example.com");
    }

    #[test]
    fn insert_duplicate_email_fails_ignoring_case() {
        let conn = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");
        create_user("jo@example.com", &password_hash, "", &conn).unwrap();

        let result = create_user("JO@example.com", &password_hash, "", &conn);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_by_email_ignores_case() {
        let conn = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");
        let inserted = create_user("jo@example.com", &password_hash, "", &conn).unwrap();

        let user = get_user_by_email("Jo@Example.com", &conn).unwrap();

        assert_eq!(user.id, inserted.id);
        assert_eq!(user.password_hash, password_hash);
    }

    #[test]
    fn get_user_by_email_fails_for_unknown_email() {
        let conn = get_db_connection();

        assert_eq!(
            get_user_by_email("nobody@example.com", &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn set_password_replaces_hash() {
        let conn = get_db_connection();
        let user = create_user(
            "jo@example.com",
            &PasswordHash::new_unchecked("old"),
            "",
            &conn,
        )
        .unwrap();
        let new_hash = PasswordHash::new_unchecked("new");

        set_user_password(user.id, &new_hash, &conn).unwrap();

        let got = get_user_by_email("jo@example.com", &conn).unwrap();
        assert_eq!(got.password_hash, new_hash);
    }

    #[test]
    fn set_password_fails_for_missing_user() {
        let conn = get_db_connection();

        let result = set_user_password(UserID::new(42), &PasswordHash::new_unchecked("x"), &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn new_profile_uses_email_prefix_as_username() {
        let conn = get_db_connection();
        let user = create_user(
            "jo@example.com",
            &PasswordHash::new_unchecked("x"),
            "Jo",
            &conn,
        )
        .unwrap();

        let profile = get_profile(user.id, &conn).unwrap();

        assert_eq!(profile.username, "jo");
        assert_eq!(profile.full_name, "Jo");
        assert_eq!(profile.avatar_url, None);
    }

    #[test]
    fn update_profile_only_changes_given_fields() {
        let conn = get_db_connection();
        let user = create_user(
            "jo@example.com",
            &PasswordHash::new_unchecked("x"),
            "Jo",
            &conn,
        )
        .unwrap();

        let profile = update_profile(
            user.id,
            &ProfileUpdate {
                username: Some(" jojo ".to_owned()),
                avatar_url: Some("https://example.com/jo.png".to_owned()),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(profile.full_name, "Jo");
        assert_eq!(profile.username, "jojo");
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://example.com/jo.png")
        );
    }

    #[test]
    fn update_profile_clears_avatar_with_empty_string() {
        let conn = get_db_connection();
        let user = create_user(
            "jo@example.com",
            &PasswordHash::new_unchecked("x"),
            "Jo",
            &conn,
        )
        .unwrap();
        update_profile(
            user.id,
            &ProfileUpdate {
                avatar_url: Some("https://example.com/jo.png".to_owned()),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        let profile = update_profile(
            user.id,
            &ProfileUpdate {
                avatar_url: Some(String::new()),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(profile.avatar_url, None);
    }
}
