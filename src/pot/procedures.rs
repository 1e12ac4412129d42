//! Stored procedures that move money between the user's balance and a pot.
//!
//! Both procedures work in whole cents and run inside a single database
//! transaction, so the balance and the pot can never disagree about where the
//! money went.

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::{UserID, form::to_cents, pot::PotId};

/// The outcome of a transfer procedure.
///
/// Business rule violations are reported through `error` rather than as an
/// [Error](crate::Error) so that callers can show the message to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureResult {
    /// Whether the money was moved.
    pub success: bool,
    /// A human readable summary when the transfer succeeded.
    pub message: Option<String>,
    /// Why the transfer was rejected.
    pub error: Option<String>,
}

impl ProcedureResult {
    fn ok(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
        }
    }

    fn rejected(error: &str) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.to_owned()),
        }
    }
}

struct PotTotals {
    target_cents: i64,
    total_cents: i64,
}

fn get_pot_totals(
    user_id: UserID,
    pot_id: PotId,
    connection: &Connection,
) -> Result<Option<PotTotals>, rusqlite::Error> {
    connection
        .query_row(
            "SELECT target, total FROM pot WHERE id = ?1 AND user_id = ?2",
            (pot_id, user_id.as_i64()),
            |row| {
                Ok(PotTotals {
                    target_cents: to_cents(row.get(0)?),
                    total_cents: to_cents(row.get(1)?),
                })
            },
        )
        .optional()
}

fn get_balance_cents(user_id: UserID, connection: &Connection) -> Result<i64, rusqlite::Error> {
    connection
        .query_row(
            "SELECT current FROM balance WHERE user_id = ?1",
            [user_id.as_i64()],
            |row| row.get::<_, f64>(0),
        )
        .optional()
        .map(|current| current.map(to_cents).unwrap_or(0))
}

fn apply_transfer(
    user_id: UserID,
    pot_id: PotId,
    pot_total_cents: i64,
    balance_cents: i64,
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "UPDATE pot SET total = ?1 WHERE id = ?2 AND user_id = ?3",
        (pot_total_cents as f64 / 100.0, pot_id, user_id.as_i64()),
    )?;
    connection.execute(
        "UPDATE balance SET current = ?1 WHERE user_id = ?2",
        (balance_cents as f64 / 100.0, user_id.as_i64()),
    )?;

    Ok(())
}

/// Move `amount` dollars from the current balance of `user_id` into the pot.
///
/// The transfer is rejected if the pot does not belong to the user, the
/// amount is not positive, the pot would exceed its target, or the balance is
/// too small.
///
/// # Errors
/// Returns an error only if the database itself fails.
pub fn add_money_to_pot(
    user_id: UserID,
    pot_id: PotId,
    amount: f64,
    connection: &Connection,
) -> Result<ProcedureResult, rusqlite::Error> {
    let transaction = connection.unchecked_transaction()?;

    let Some(pot) = get_pot_totals(user_id, pot_id, &transaction)? else {
        return Ok(ProcedureResult::rejected("Pot not found"));
    };

    let amount_cents = to_cents(amount);
    if !amount.is_finite() || amount_cents <= 0 {
        return Ok(ProcedureResult::rejected("Amount must be positive"));
    }

    let new_total_cents = pot.total_cents + amount_cents;
    if new_total_cents > pot.target_cents {
        return Ok(ProcedureResult::rejected(
            "Adding this amount would exceed the pot target",
        ));
    }

    let balance_cents = get_balance_cents(user_id, &transaction)?;
    if balance_cents < amount_cents {
        return Ok(ProcedureResult::rejected("Insufficient balance"));
    }

    apply_transfer(
        user_id,
        pot_id,
        new_total_cents,
        balance_cents - amount_cents,
        &transaction,
    )?;
    transaction.commit()?;

    Ok(ProcedureResult::ok(format!(
        "Added {} to pot",
        crate::html::format_currency(amount_cents as f64 / 100.0)
    )))
}

/// Move `amount` dollars out of the pot and back into the current balance of `user_id`.
///
/// The transfer is rejected if the pot does not belong to the user, the
/// amount is not positive, or the pot holds less than `amount`.
///
/// # Errors
/// Returns an error only if the database itself fails.
pub fn withdraw_from_pot(
    user_id: UserID,
    pot_id: PotId,
    amount: f64,
    connection: &Connection,
) -> Result<ProcedureResult, rusqlite::Error> {
    let transaction = connection.unchecked_transaction()?;

    let Some(pot) = get_pot_totals(user_id, pot_id, &transaction)? else {
        return Ok(ProcedureResult::rejected("Pot not found"));
    };

    let amount_cents = to_cents(amount);
    if !amount.is_finite() || amount_cents <= 0 {
        return Ok(ProcedureResult::rejected("Amount must be positive"));
    }

    if amount_cents > pot.total_cents {
        return Ok(ProcedureResult::rejected(
            "Cannot withdraw more than the pot total",
        ));
    }

    let balance_cents = get_balance_cents(user_id, &transaction)?;

    apply_transfer(
        user_id,
        pot_id,
        pot.total_cents - amount_cents,
        balance_cents + amount_cents,
        &transaction,
    )?;
    transaction.commit()?;

    Ok(ProcedureResult::ok(format!(
        "Withdrew {} from pot",
        crate::html::format_currency(amount_cents as f64 / 100.0)
    )))
}
