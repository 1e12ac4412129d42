//! A per-request holder for the signed in user and their profile.
//!
//! The holder is built from the access token in the request's cookie. It keeps
//! its cached user up to date by listening to the auth provider's session
//! change events until it is dropped.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

use crate::{
    Error,
    auth::{
        backend::{AuthBackend, AuthEvent, Session, SqliteAuth},
        user::{AuthUser, Profile, ProfileUpdate},
    },
};

/// The session holder used by the app.
pub type AppSession = AuthSession<SqliteAuth>;

#[derive(Debug, Default)]
struct SessionState {
    user: Option<AuthUser>,
    profile: Option<Profile>,
    access_token: Option<String>,
    loading: bool,
    initialized: bool,
}

/// Caches the current user and profile for one client session.
pub struct AuthSession<B: AuthBackend> {
    backend: Arc<B>,
    state: Arc<RwLock<SessionState>>,
    listener: JoinHandle<()>,
}

impl<B: AuthBackend> AuthSession<B> {
    /// Load the session for `access_token` and start listening for changes to it.
    ///
    /// A missing, unknown or expired token produces a signed out holder. Errors
    /// from the auth provider are logged and also treated as signed out.
    pub async fn initialize(backend: Arc<B>, access_token: Option<String>) -> Self {
        let state = Arc::new(RwLock::new(SessionState {
            loading: true,
            ..Default::default()
        }));

        // Subscribe before reading the session so no change is missed.
        let receiver = backend.subscribe();

        let session = match access_token.as_deref() {
            Some(token) => backend.get_session(token).unwrap_or_else(|error| {
                tracing::error!("could not get session: {error}");
                None
            }),
            None => None,
        };

        let profile = session
            .as_ref()
            .and_then(|session| load_profile(backend.as_ref(), &session.user));

        {
            let mut state = write(&state);
            state.access_token = session.as_ref().map(|session| session.access_token.clone());
            state.user = session.map(|session| session.user);
            state.profile = profile;
            state.loading = false;
            state.initialized = true;
        }

        let listener = tokio::spawn(listen_for_changes(
            backend.clone(),
            Arc::downgrade(&state),
            receiver,
        ));

        Self {
            backend,
            state,
            listener,
        }
    }

    /// Register a new user and make them the current user.
    pub fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session, Error> {
        let session = self.backend.sign_up(email, password, full_name)?;
        self.set_session(&session);

        Ok(session)
    }

    /// Sign in with a password and make the user the current user.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let session = self.backend.sign_in_with_password(email, password)?;
        self.set_session(&session);

        Ok(session)
    }

    /// Sign out of the current session.
    ///
    /// The cached user and profile are always cleared, even when the auth
    /// provider fails or there was no session to end.
    pub fn sign_out(&self) {
        let access_token = read(&self.state).access_token.clone();

        match access_token {
            Some(token) => {
                if let Err(error) = self.backend.sign_out(&token) {
                    tracing::warn!("sign out failed, clearing local session anyway: {error}");
                }
            }
            None => tracing::info!("no active session, clearing local state only"),
        }

        let mut state = write(&self.state);
        state.user = None;
        state.profile = None;
        state.access_token = None;
    }

    /// Ask the auth provider to send a password recovery link for `email`.
    pub fn reset_password(&self, email: &str, redirect_to: &str) -> Result<(), Error> {
        self.backend.reset_password_for_email(email, redirect_to)
    }

    /// Change the current user's password.
    pub fn update_password(&self, password: &str) -> Result<(), Error> {
        let access_token = read(&self.state)
            .access_token
            .clone()
            .ok_or(Error::NotAuthenticated)?;

        self.backend.update_user_password(&access_token, password)
    }

    /// Update the current user's profile and cache the result.
    ///
    /// # Errors
    /// Returns [Error::NotAuthenticated] if nobody is signed in.
    pub fn update_profile(&self, updates: &ProfileUpdate) -> Result<Profile, Error> {
        let user_id = self.user().ok_or(Error::NotAuthenticated)?.id;
        let profile = self.backend.update_profile(user_id, updates)?;
        write(&self.state).profile = Some(profile.clone());

        Ok(profile)
    }

    /// The signed in user, if any.
    pub fn user(&self) -> Option<AuthUser> {
        read(&self.state).user.clone()
    }

    /// The signed in user's profile, if it could be loaded.
    pub fn profile(&self) -> Option<Profile> {
        read(&self.state).profile.clone()
    }

    /// The token identifying the current session.
    pub fn access_token(&self) -> Option<String> {
        read(&self.state).access_token.clone()
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        read(&self.state).user.is_some()
    }

    /// The current user's email, or an empty string when signed out.
    pub fn user_email(&self) -> String {
        read(&self.state)
            .user
            .as_ref()
            .map(|user| user.email.clone())
            .unwrap_or_default()
    }

    /// Whether the session is still being loaded.
    pub fn is_loading(&self) -> bool {
        read(&self.state).loading
    }

    /// Whether the initial session lookup has finished.
    pub fn is_initialized(&self) -> bool {
        read(&self.state).initialized
    }

    fn set_session(&self, session: &Session) {
        let profile = load_profile(self.backend.as_ref(), &session.user);

        let mut state = write(&self.state);
        state.access_token = Some(session.access_token.clone());
        state.user = Some(session.user.clone());
        state.profile = profile;
        state.loading = false;
    }
}

impl<B: AuthBackend> Drop for AuthSession<B> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen_for_changes<B: AuthBackend>(
    backend: Arc<B>,
    weak_state: Weak<RwLock<SessionState>>,
    mut receiver: tokio::sync::broadcast::Receiver<AuthEvent>,
) {
    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("session listener missed {skipped} auth events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let Some(state) = weak_state.upgrade() else {
            break;
        };

        if read(&state).access_token.as_deref() != Some(event.access_token.as_str()) {
            continue;
        }

        tracing::debug!("session changed: {:?}", event.kind);

        match event.user {
            Some(user) => {
                {
                    let mut state = write(&state);
                    state.user = Some(user.clone());
                    state.loading = false;
                }

                let backend = backend.clone();
                let state = Arc::downgrade(&state);
                tokio::spawn(async move {
                    let profile = load_profile(backend.as_ref(), &user);
                    if let Some(state) = state.upgrade() {
                        write(&state).profile = profile;
                    }
                });
            }
            None => {
                let mut state = write(&state);
                state.user = None;
                state.profile = None;
                state.access_token = None;
                state.loading = false;
            }
        }
    }
}

fn load_profile<B: AuthBackend>(backend: &B, user: &AuthUser) -> Option<Profile> {
    match backend.get_profile(user.id) {
        Ok(profile) => Some(profile),
        Err(error) => {
            tracing::error!("could not load profile for user {}: {error}", user.id);
            None
        }
    }
}

// A poisoned lock only means another thread panicked mid-update; the cached
// state is still usable.
fn read(state: &RwLock<SessionState>) -> RwLockReadGuard<'_, SessionState> {
    state
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(state: &RwLock<SessionState>) -> RwLockWriteGuard<'_, SessionState> {
    state
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
