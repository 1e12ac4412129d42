//! Narrowing a list of transactions by category and name.

use crate::{category::CategoryId, transaction::Transaction};

/// Keep the transactions in `category_id` whose name contains `search`.
///
/// Both filters are optional. The search ignores case and surrounding whitespace,
/// and a blank search matches everything.
pub fn filter_transactions(
    transactions: &[Transaction],
    category_id: Option<CategoryId>,
    search: Option<&str>,
) -> Vec<Transaction> {
    let search = search
        .map(|text| text.trim().to_lowercase())
        .filter(|text| !text.is_empty());

    transactions
        .iter()
        .filter(|transaction| category_id.is_none_or(|id| transaction.category_id == id))
        .filter(|transaction| {
            search
                .as_deref()
                .is_none_or(|text| transaction.name.to_lowercase().contains(text))
        })
        .cloned()
        .collect()
}
