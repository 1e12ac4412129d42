//! Savings pots: money the user sets aside from their balance towards a target.

mod core;
mod endpoints;
mod pots_page;
mod procedures;

pub use core::{
    MAX_POT_NAME_LENGTH, MAX_POT_TARGET, Pot, PotForm, PotId, create_pot, create_pot_table,
    delete_pot, get_pot, get_pots, map_pot_row, update_pot,
};
pub use endpoints::{
    MAX_ADD_AMOUNT, PotState, TransferForm, add_money_endpoint, create_pot_endpoint,
    delete_pot_endpoint, update_pot_endpoint, withdraw_money_endpoint,
};
pub use pots_page::{PotsQuery, get_pots_page};
pub use procedures::{ProcedureResult, add_money_to_pot, withdraw_from_pot};
