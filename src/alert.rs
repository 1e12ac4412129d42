//! Alert system for displaying success and error messages to users.
//!
//! Alerts are rendered as HTML fragments that HTMX swaps into the
//! `#alert-container` element defined in the base page template.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// An alert message to show to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with extra details.
    Success { message: String, details: String },
    /// A success message without details.
    SuccessSimple { message: String },
    /// An error message with extra details.
    Error { message: String, details: String },
    /// An error caused by a single form field.
    ///
    /// The field name is written to the `data-field` attribute so the client
    /// can highlight the offending input.
    FieldError { field: String, message: String },
}

const SUCCESS_STYLE: &str = "flex items-start gap-3 p-4 mb-4 text-sm rounded-lg \
    text-green-800 bg-green-50 dark:bg-gray-800 dark:text-green-400";
const ERROR_STYLE: &str = "flex items-start gap-3 p-4 mb-4 text-sm rounded-lg \
    text-red-800 bg-red-50 dark:bg-gray-800 dark:text-red-400";

impl Alert {
    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Markup {
        let (style, message, details, field) = match self {
            Alert::Success { message, details } => (SUCCESS_STYLE, message, details, None),
            Alert::SuccessSimple { message } => (SUCCESS_STYLE, message, String::new(), None),
            Alert::Error { message, details } => (ERROR_STYLE, message, details, None),
            Alert::FieldError { field, message } => {
                (ERROR_STYLE, message, String::new(), Some(field))
            }
        };

        html! {
            div
                role="alert"
                class=(style)
                data-field=[field]
                onclick="this.remove()"
            {
                div
                {
                    p class="font-medium" { (message) }

                    @if !details.is_empty() {
                        p { (details) }
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        Html(self.into_html().into_string()).into_response()
    }
}
