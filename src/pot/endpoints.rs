//! Route handlers for creating, editing, deleting and moving money into and out of pots.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, UserID,
    db::lock_connection,
    endpoints,
    form::parse_positive_amount,
    pot::{
        PotForm, PotId, create_pot, delete_pot, get_pot,
        procedures::{ProcedureResult, add_money_to_pot, withdraw_from_pot},
        update_pot,
    },
};

/// The largest amount that can be added to a pot in one go.
pub const MAX_ADD_AMOUNT: f64 = 100_000.0;

/// The state needed by the pot route handlers.
#[derive(Debug, Clone)]
pub struct PotState {
    /// The database connection for managing pots.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PotState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form for moving money into or out of a pot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransferForm {
    /// The amount as typed by the user.
    pub amount: String,
}

fn redirect_to_pots() -> Response {
    (
        HxRedirect(endpoints::POTS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for creating a new pot, redirects to the pots view on success.
pub async fn create_pot_endpoint(
    State(state): State<PotState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PotForm>,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| create_pot(user_id, &form, &connection));

    match result {
        Ok(pot) => {
            tracing::debug!("Created pot {} for user {user_id}", pot.id);
            redirect_to_pots()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for changing a pot's name, target and theme.
pub async fn update_pot_endpoint(
    State(state): State<PotState>,
    Extension(user_id): Extension<UserID>,
    Path(pot_id): Path<PotId>,
    Form(form): Form<PotForm>,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| update_pot(user_id, pot_id, &form, &connection));

    match result {
        Ok(_) => redirect_to_pots(),
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for deleting an empty pot.
pub async fn delete_pot_endpoint(
    State(state): State<PotState>,
    Extension(user_id): Extension<UserID>,
    Path(pot_id): Path<PotId>,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| delete_pot(user_id, pot_id, &connection));

    match result {
        Ok(()) => redirect_to_pots(),
        Err(error) => error.into_alert_response(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TransferKind {
    Add,
    Withdraw,
}

fn parse_transfer_amount(form: &TransferForm, kind: TransferKind) -> Result<f64, Error> {
    let amount = parse_positive_amount(&form.amount, "amount", "Amount must be a positive number")?;

    if kind == TransferKind::Add && amount > MAX_ADD_AMOUNT {
        return Err(Error::validation("amount", "Amount cannot exceed $100,000"));
    }

    Ok(amount)
}

/// Validate and run a transfer, mapping a rejected procedure call to an error.
fn transfer(
    user_id: UserID,
    pot_id: PotId,
    form: &TransferForm,
    kind: TransferKind,
    connection: &Connection,
) -> Result<ProcedureResult, Error> {
    let amount = parse_transfer_amount(form, kind)?;
    get_pot(user_id, pot_id, connection)?;

    let result = match kind {
        TransferKind::Add => add_money_to_pot(user_id, pot_id, amount, connection)?,
        TransferKind::Withdraw => withdraw_from_pot(user_id, pot_id, amount, connection)?,
    };

    if result.success {
        Ok(result)
    } else {
        let message = result
            .error
            .unwrap_or_else(|| "The transfer could not be completed".to_owned());
        Err(Error::TransferRejected(message))
    }
}

async fn transfer_endpoint(
    state: PotState,
    user_id: UserID,
    pot_id: PotId,
    form: TransferForm,
    kind: TransferKind,
) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| transfer(user_id, pot_id, &form, kind, &connection));

    match result {
        Ok(result) => {
            tracing::info!(
                "Pot {pot_id} transfer for user {user_id}: {}",
                result.message.unwrap_or_default()
            );
            redirect_to_pots()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for moving money from the balance into a pot.
pub async fn add_money_endpoint(
    State(state): State<PotState>,
    Extension(user_id): Extension<UserID>,
    Path(pot_id): Path<PotId>,
    Form(form): Form<TransferForm>,
) -> Response {
    transfer_endpoint(state, user_id, pot_id, form, TransferKind::Add).await
}

/// A route handler for moving money from a pot back to the balance.
pub async fn withdraw_money_endpoint(
    State(state): State<PotState>,
    Extension(user_id): Extension<UserID>,
    Path(pot_id): Path<PotId>,
    Form(form): Form<TransferForm>,
) -> Response {
    transfer_endpoint(state, user_id, pot_id, form, TransferKind::Withdraw).await
}
