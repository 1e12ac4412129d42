//! Parsing helpers shared by the form handlers.
//!
//! Form fields arrive as strings so that a malformed number produces a
//! validation message instead of a rejected request.

use crate::Error;

/// Trim `value` and fail with `message` for `field` if nothing is left.
pub fn required_text<'a>(
    value: &'a str,
    field: &'static str,
    message: &str,
) -> Result<&'a str, Error> {
    let value = value.trim();

    if value.is_empty() {
        Err(Error::validation(field, message))
    } else {
        Ok(value)
    }
}

/// Parse a strictly positive, finite dollar amount.
///
/// Fails with `message` for `field` if `value` is empty, not a number, zero or negative.
pub fn parse_positive_amount(
    value: &str,
    field: &'static str,
    message: &str,
) -> Result<f64, Error> {
    match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(Error::validation(field, message)),
    }
}

/// Convert a dollar amount to whole cents.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::{parse_positive_amount, required_text, to_cents};

    #[test]
    fn required_text_trims() {
        assert_eq!(required_text("  Holiday ", "name", "required"), Ok("Holiday"));
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(
            required_text("   ", "name", "Pot name is required"),
            Err(Error::validation("name", "Pot name is required"))
        );
    }

    #[test]
    fn parse_positive_amount_accepts_decimals() {
        assert_eq!(parse_positive_amount(" 12.5 ", "amount", "bad"), Ok(12.5));
    }

    #[test]
    fn parse_positive_amount_rejects_bad_input() {
        for value in ["", "abc", "0", "-1", "NaN", "inf"] {
            assert_eq!(
                parse_positive_amount(value, "amount", "Amount must be a positive number"),
                Err(Error::validation("amount", "Amount must be a positive number")),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn cents_round_to_nearest() {
        assert_eq!(to_cents(0.1 + 0.2), 30);
        assert_eq!(to_cents(19.99), 1999);
        assert_eq!(to_cents(-2.5), -250);
    }
}
