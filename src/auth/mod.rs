//! Authentication: users and passwords, the auth provider, per-request
//! session holders, the auth middleware and the auth pages.

mod backend;
mod cookie;
mod log_in;
mod middleware;
mod password;
mod profile;
mod reset_password;
mod session;
mod sign_out;
mod sign_up;
mod user;

pub use backend::{
    AuthBackend, AuthEvent, AuthEventKind, Session, SqliteAuth, create_password_reset_table,
    create_session_table,
};
pub use log_in::{get_auth_page, post_log_in};
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use profile::{get_profile_page, update_profile_endpoint};
pub use reset_password::{
    get_recover, get_reset_password_page, get_update_password_page, post_reset_password,
    post_update_password,
};
pub use session::{AppSession, AuthSession};
pub use sign_out::post_sign_out;
pub use sign_up::post_sign_up;
pub use user::{
    AuthUser, Profile, ProfileUpdate, UserID, create_user, create_user_table, get_user_by_email,
    set_user_password,
};
