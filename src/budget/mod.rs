//! Monthly spending limits per category.

mod budgets_page;
mod core;
mod endpoints;

pub use budgets_page::{BudgetsPageState, get_budgets_page};
pub use core::{
    Budget, BudgetForm, BudgetId, MAX_BUDGET_AMOUNT, create_budget, create_budget_table,
    delete_budget, get_budget, get_budgets, map_budget_row, spent_in_month, update_budget,
};
pub use endpoints::{
    BudgetState, create_budget_endpoint, delete_budget_endpoint, update_budget_endpoint,
};
