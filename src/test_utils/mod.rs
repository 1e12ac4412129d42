#![allow(missing_docs)]

//! Helpers shared by the unit tests.

pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    PasswordHash, SqliteAuth, UserID,
    auth::create_user,
    balance::create_balance,
    db::initialize,
};

pub(crate) use form::{
    assert_form_error_message, assert_form_input, assert_form_input_with_value,
    assert_form_submit_button, assert_hx_endpoint, must_get_form,
};
pub(crate) use html::{
    assert_valid_html, element_texts, parse_html_document, parse_html_fragment,
};
pub(crate) use http::{assert_hx_redirect, assert_status_ok, get_header};

/// A password that passes validation.
pub(crate) const TEST_PASSWORD: &str = "correct horse battery";

/// The lowest cost bcrypt accepts, so tests don't spend their time hashing.
pub(crate) const TEST_HASH_COST: u32 = 4;

/// An in-memory database with every table created and seeded.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// An auth provider backed by a fresh in-memory database.
pub(crate) fn get_test_auth() -> SqliteAuth {
    SqliteAuth::new(Arc::new(Mutex::new(get_test_connection())), TEST_HASH_COST)
}

/// Insert a user with a zero balance.
pub(crate) fn create_test_user(email: &str, connection: &Connection) -> UserID {
    let user = create_user(
        email,
        &PasswordHash::new_unchecked("not a real hash"),
        "",
        connection,
    )
    .expect("Could not create test user");
    create_balance(user.id, connection).expect("Could not create test balance");

    user.id
}

/// Auth handler state with a fresh auth provider.
pub(crate) fn get_test_auth_state() -> crate::auth::AuthState {
    crate::auth::AuthState {
        cookie_key: crate::app_state::create_cookie_key("foobar"),
        auth: Arc::new(get_test_auth()),
    }
}
