//! The auth provider: users, sessions, password recovery and session change notifications.
//!
//! [AuthBackend] is the seam between the request handlers and the store. The
//! production implementation, [SqliteAuth], keeps users and sessions in the
//! application database.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    Error, PasswordHash,
    auth::user::{
        AuthUser, Profile, ProfileUpdate, UserID, create_user, get_profile, get_user_by_email,
        set_user_password, update_profile,
    },
    balance::create_balance,
};

/// How long a session lasts after signing in.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::days(7);

/// How long a password recovery link stays valid.
pub const RECOVERY_TOKEN_DURATION: Duration = Duration::hours(1);

/// The number of unread events a subscriber may fall behind before it starts missing events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A signed in session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The opaque token stored in the client's cookie.
    pub access_token: String,
    /// The user the session belongs to.
    pub user: AuthUser,
    /// When the session stops being valid.
    pub expires_at: OffsetDateTime,
}

/// What changed about a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    /// A new session was created with a password.
    SignedIn,
    /// The session was ended.
    SignedOut,
    /// A session was created from a password recovery link.
    PasswordRecovery,
    /// The user's credentials changed.
    UserUpdated,
}

/// A notification that a session changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    /// What happened.
    pub kind: AuthEventKind,
    /// The session the event is about.
    pub access_token: String,
    /// The user of the session after the change, `None` once signed out.
    pub user: Option<AuthUser>,
}

/// The operations the app needs from an auth provider.
pub trait AuthBackend: Send + Sync + 'static {
    /// Get the session for `access_token` if it exists and has not expired.
    fn get_session(&self, access_token: &str) -> Result<Option<Session>, Error>;

    /// Register a new user and sign them in.
    fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session, Error>;

    /// Sign in with an email and password.
    ///
    /// Unknown emails and wrong passwords both produce [Error::InvalidCredentials].
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error>;

    /// End the session for `access_token`.
    fn sign_out(&self, access_token: &str) -> Result<(), Error>;

    /// Start password recovery for `email`.
    ///
    /// Succeeds whether or not `email` is registered so that callers cannot
    /// probe for accounts.
    fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), Error>;

    /// Trade a recovery token for a new session. The token can only be used once.
    fn exchange_recovery_token(&self, token: &str) -> Result<Session, Error>;

    /// Change the password of the user signed in with `access_token`.
    fn update_user_password(&self, access_token: &str, password: &str) -> Result<(), Error>;

    /// Get the profile for `user_id`.
    fn get_profile(&self, user_id: UserID) -> Result<Profile, Error>;

    /// Update the profile for `user_id`.
    fn update_profile(&self, user_id: UserID, updates: &ProfileUpdate) -> Result<Profile, Error>;

    /// Listen for session changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// An auth provider that stores users and sessions in SQLite.
#[derive(Debug)]
pub struct SqliteAuth {
    db_connection: Arc<Mutex<Connection>>,
    events: broadcast::Sender<AuthEvent>,
    session_duration: Duration,
    password_hash_cost: u32,
}

impl SqliteAuth {
    /// Create an auth provider that hashes passwords with `password_hash_cost`.
    pub fn new(db_connection: Arc<Mutex<Connection>>, password_hash_cost: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            db_connection,
            events,
            session_duration: DEFAULT_SESSION_DURATION,
            password_hash_cost,
        }
    }

    #[cfg(test)]
    pub(crate) fn db_connection(&self) -> &Arc<Mutex<Connection>> {
        &self.db_connection
    }

    fn notify(&self, kind: AuthEventKind, access_token: &str, user: Option<AuthUser>) {
        // Sending only fails when nobody is listening, which is fine.
        let _ = self.events.send(AuthEvent {
            kind,
            access_token: access_token.to_owned(),
            user,
        });
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

impl AuthBackend for SqliteAuth {
    fn get_session(&self, access_token: &str) -> Result<Option<Session>, Error> {
        let connection = self.lock()?;

        match get_session(access_token, &connection) {
            Ok(session) if session.expires_at > OffsetDateTime::now_utc() => Ok(Some(session)),
            Ok(_) => {
                tracing::debug!("session expired, removing it");
                delete_session(access_token, &connection)?;
                Ok(None)
            }
            Err(Error::NotFound) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session, Error> {
        let password_hash = PasswordHash::from_raw_password(password, self.password_hash_cost)?;

        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;
        let user = create_user(email.trim(), &password_hash, full_name.trim(), &transaction)?;
        create_balance(user.id, &transaction)?;
        let session = create_session(user, self.session_duration, &transaction)?;
        transaction.commit()?;

        tracing::info!("registered user {}", session.user.id);
        self.notify(
            AuthEventKind::SignedIn,
            &session.access_token,
            Some(session.user.clone()),
        );

        Ok(session)
    }

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error> {
        // Only the lookup holds the lock, bcrypt verification runs unlocked.
        let user = match get_user_by_email(email, &*self.lock()?) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        };

        let is_password_valid = user
            .password_hash
            .verify(password)
            .map_err(|error| Error::HashingError(error.to_string()))?;

        if !is_password_valid {
            return Err(Error::InvalidCredentials);
        }

        let auth_user = AuthUser {
            id: user.id,
            email: user.email,
        };
        let session = create_session(auth_user, self.session_duration, &*self.lock()?)?;

        self.notify(
            AuthEventKind::SignedIn,
            &session.access_token,
            Some(session.user.clone()),
        );

        Ok(session)
    }

    fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        let connection = self.lock()?;
        delete_session(access_token, &connection)?;
        self.notify(AuthEventKind::SignedOut, access_token, None);

        Ok(())
    }

    fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), Error> {
        let connection = self.lock()?;

        let user = match get_user_by_email(email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                tracing::info!("password reset requested for an unregistered email");
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        let token = Uuid::new_v4().to_string();
        let expires_at = OffsetDateTime::now_utc() + RECOVERY_TOKEN_DURATION;
        connection.execute(
            "INSERT INTO password_reset (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            (&token, user.id.as_i64(), expires_at),
        )?;

        // E-mail delivery is not supported, so the link is written to the log instead.
        tracing::info!(
            "password recovery link for user {}: {redirect_to}?token={token}",
            user.id
        );

        Ok(())
    }

    fn exchange_recovery_token(&self, token: &str) -> Result<Session, Error> {
        let connection = self.lock()?;
        let transaction = connection.unchecked_transaction()?;

        let (user_id, email, expires_at): (i64, String, OffsetDateTime) = transaction
            .query_row(
                "SELECT user.id, user.email, password_reset.expires_at
                FROM password_reset INNER JOIN user ON user.id = password_reset.user_id
                WHERE password_reset.token = ?1",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Error::InvalidRecoveryToken,
                error => error.into(),
            })?;

        transaction.execute("DELETE FROM password_reset WHERE token = ?1", [token])?;

        if expires_at <= OffsetDateTime::now_utc() {
            transaction.commit()?;
            return Err(Error::InvalidRecoveryToken);
        }

        let user = AuthUser {
            id: UserID::new(user_id),
            email,
        };
        let session = create_session(user, self.session_duration, &transaction)?;
        transaction.commit()?;

        self.notify(
            AuthEventKind::PasswordRecovery,
            &session.access_token,
            Some(session.user.clone()),
        );

        Ok(session)
    }

    fn update_user_password(&self, access_token: &str, password: &str) -> Result<(), Error> {
        let session = self
            .get_session(access_token)?
            .ok_or(Error::NotAuthenticated)?;
        let password_hash = PasswordHash::from_raw_password(password, self.password_hash_cost)?;

        set_user_password(session.user.id, &password_hash, &*self.lock()?)?;

        self.notify(
            AuthEventKind::UserUpdated,
            access_token,
            Some(session.user),
        );

        Ok(())
    }

    fn get_profile(&self, user_id: UserID) -> Result<Profile, Error> {
        get_profile(user_id, &*self.lock()?)
    }

    fn update_profile(&self, user_id: UserID, updates: &ProfileUpdate) -> Result<Profile, Error> {
        update_profile(user_id, updates, &*self.lock()?)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// Create the session table.
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create the table of password recovery tokens.
pub fn create_password_reset_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS password_reset (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn create_session(
    user: AuthUser,
    duration: Duration,
    connection: &Connection,
) -> Result<Session, Error> {
    let access_token = Uuid::new_v4().to_string();
    let expires_at = OffsetDateTime::now_utc() + duration;

    connection.execute(
        "INSERT INTO session (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        (&access_token, user.id.as_i64(), expires_at),
    )?;

    Ok(Session {
        access_token,
        user,
        expires_at,
    })
}

fn get_session(access_token: &str, connection: &Connection) -> Result<Session, Error> {
    connection
        .prepare(
            "SELECT session.token, user.id, user.email, session.expires_at
            FROM session INNER JOIN user ON user.id = session.user_id
            WHERE session.token = ?1",
        )?
        .query_row([access_token], |row| {
            Ok(Session {
                access_token: row.get(0)?,
                user: AuthUser {
                    id: UserID::new(row.get(1)?),
                    email: row.get(2)?,
                },
                expires_at: row.get(3)?,
            })
        })
        .map_err(|error| error.into())
}

fn delete_session(access_token: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM session WHERE token = ?1", [access_token])?;

    Ok(())
}
