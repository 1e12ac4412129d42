//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert, html::format_currency, internal_server_error::InternalServerError,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email and password combination did not match a registered user.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// A user tried to sign up with an email that is already registered.
    #[error("A user with this email address has already been registered")]
    DuplicateEmail,

    /// The operation needs a signed in user, but there is no session.
    #[error("No user logged in")]
    NotAuthenticated,

    /// The password recovery token is unknown or has expired.
    #[error("The password recovery link is invalid or has expired")]
    InvalidRecoveryToken,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A submitted form field was missing, malformed or out of range.
    #[error("{message}")]
    Validation {
        /// The name of the form field that failed validation.
        field: &'static str,
        /// A message explaining how to fix the field.
        message: String,
    },

    /// The user already has a pot with the given name.
    #[error("A pot with this name already exists")]
    DuplicatePotName(String),

    /// The user already has a budget for the given category.
    #[error("A budget with this category already exists")]
    DuplicateBudgetCategory,

    /// The pot does not exist or belongs to another user.
    #[error("Pot not found")]
    PotNotFound,

    /// The budget does not exist or belongs to another user.
    #[error("Budget not found")]
    BudgetNotFound,

    /// Pots that still hold money cannot be deleted.
    #[error(
        "Cannot delete pot \"{name}\" because it contains {}. Withdraw the money first.",
        currency(.total)
    )]
    PotNotEmpty {
        /// The name of the pot.
        name: String,
        /// The amount of money in the pot.
        total: f64,
    },

    /// A pot's target cannot be lowered below the amount already saved.
    #[error("Target cannot be less than current saved amount ({})", currency(.0))]
    TargetBelowTotal(f64),

    /// A pot transfer procedure rejected the transfer.
    ///
    /// The message comes from the procedure and is shown to the user verbatim.
    #[error("{0}")]
    TransferRejected(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl Error {
    /// Create a validation error for the form field `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// The form field the error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::Validation { field, .. } => Some(*field),
            Error::DuplicatePotName(_) => Some("name"),
            Error::DuplicateBudgetCategory => Some("category_id"),
            Error::TargetBelowTotal(_) => Some("target"),
            Error::TransferRejected(_) => Some("amount"),
            Error::InvalidCredentials | Error::DuplicateEmail => Some("email"),
            _ => None,
        }
    }

    /// The status code for this error when it is the result of a form action.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. }
            | Error::DuplicatePotName(_)
            | Error::DuplicateBudgetCategory
            | Error::PotNotEmpty { .. }
            | Error::TargetBelowTotal(_)
            | Error::TransferRejected(_)
            | Error::InvalidCredentials
            | Error::DuplicateEmail
            | Error::InvalidRecoveryToken => StatusCode::BAD_REQUEST,
            Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::PotNotFound | Error::BudgetNotFound | Error::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn currency(amount: &f64) -> String {
    format_currency(*amount)
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::DuplicateEmail
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound | Error::PotNotFound | Error::BudgetNotFound => {
                NotFoundError.into_response()
            }
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert fragment for HTMX requests.
    ///
    /// Validation style errors keep the field name so the client can tell
    /// which input to fix. Internal errors are logged and replaced with a
    /// generic message.
    pub fn into_alert_response(self) -> Response {
        let status_code = self.status_code();

        let alert = match self {
            Error::PotNotFound => Alert::Error {
                message: "Pot not found".to_owned(),
                details: "The pot could not be found. \
                    Try refreshing the page to see if the pot has already been deleted."
                    .to_owned(),
            },
            Error::BudgetNotFound => Alert::Error {
                message: "Budget not found".to_owned(),
                details: "The budget could not be found. \
                    Try refreshing the page to see if the budget has already been deleted."
                    .to_owned(),
            },
            error @ Error::PotNotEmpty { .. } => Alert::Error {
                message: "Could not delete pot".to_owned(),
                details: error.to_string(),
            },
            error if status_code == StatusCode::BAD_REQUEST => Alert::FieldError {
                field: error.field().unwrap_or_default().to_owned(),
                message: error.to_string(),
            },
            Error::NotAuthenticated => Alert::Error {
                message: "Not logged in".to_owned(),
                details: "Log in and try again.".to_owned(),
            },
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                }
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::{
        Error,
        test_utils::{assert_valid_html, parse_html_fragment},
    };

    #[test]
    fn validation_errors_are_bad_requests_with_field() {
        let error = Error::validation("target", "Target amount must be a positive number");

        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.field(), Some("target"));
        assert_eq!(error.to_string(), "Target amount must be a positive number");
    }

    #[test]
    fn pot_not_empty_message_includes_name_and_total() {
        let error = Error::PotNotEmpty {
            name: "Holiday".to_owned(),
            total: 50.0,
        };

        assert_eq!(
            error.to_string(),
            "Cannot delete pot \"Holiday\" because it contains $50.00. Withdraw the money first."
        );
    }

    #[test]
    fn sql_errors_are_internal() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn field_error_alert_has_field_name() {
        let response = Error::DuplicatePotName("Holiday".to_owned()).into_alert_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let selector = scraper::Selector::parse("[data-field]").unwrap();
        let alert = html.select(&selector).next().expect("No field alert found");
        assert_eq!(alert.value().attr("data-field"), Some("name"));
        let text = alert.text().collect::<String>();
        assert!(text.contains("A pot with this name already exists"));
    }

    #[tokio::test]
    async fn internal_errors_are_not_shown_to_the_client() {
        let response =
            Error::SqlError(rusqlite::Error::InvalidQuery).into_alert_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Something went wrong"));
        assert!(!text.contains("SQL"));
    }
}
