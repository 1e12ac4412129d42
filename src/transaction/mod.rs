//! Transactions: money the user has spent or earned.
//!
//! Transactions are read-only in the web app. They are added by the seeding
//! tool and keep the user's balance up to date through database triggers.

mod core;
mod filter;
mod transactions_page;

pub use core::{
    NewTransaction, Transaction, TransactionId, create_transaction, create_transaction_table,
    get_transactions, map_transaction_row,
};
pub use filter::filter_transactions;
pub use transactions_page::{TransactionsPageState, TransactionsQuery, get_transactions_page};
