//! Displays the user's budgets with this month's spending.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, UtcOffset};

use crate::{
    AppState, Error, UserID,
    budget::{Budget, spent_in_month},
    category::{Category, CategoryId, get_category_by_id},
    db::lock_connection,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, dollar_input,
        dollar_input_styles, format_currency, progress_bar, theme_select,
    },
    loader::{load_budgets, load_categories, load_themes, load_transactions},
    navigation::NavBar,
    theme::{ColorTheme, DEFAULT_THEME, theme_hex},
    timezone::get_local_offset,
    transaction::Transaction,
};

/// How many of a category's latest expenses to show on a budget card.
const LATEST_SPENDING_COUNT: usize = 3;

/// The state needed for [get_budgets_page].
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    /// The database connection for reading budgets and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A budget together with the numbers shown on its card.
struct BudgetSummary {
    budget: Budget,
    category_label: String,
    spent: f64,
    remaining: f64,
    latest_spending: Vec<Transaction>,
}

struct BudgetsPageData {
    summaries: Vec<BudgetSummary>,
    categories: Vec<Category>,
    themes: Vec<ColorTheme>,
}

/// Pair each budget with its category label and the spending in the month containing `today`.
fn summarise_budgets(
    budgets: Vec<Budget>,
    categories: &[Category],
    transactions: &[Transaction],
    today: Date,
    offset: UtcOffset,
) -> Vec<BudgetSummary> {
    budgets
        .into_iter()
        .map(|budget| {
            let spent = spent_in_month(transactions, budget.category_id, today, offset);
            let category_label = get_category_by_id(categories, budget.category_id)
                .map(|category| category.label.clone())
                .unwrap_or_else(|| "Unknown".to_owned());

            let mut latest_spending: Vec<Transaction> = transactions
                .iter()
                .filter(|transaction| {
                    transaction.category_id == budget.category_id && transaction.amount < 0.0
                })
                .cloned()
                .collect();
            latest_spending.sort_by(|a, b| b.date.cmp(&a.date));
            latest_spending.truncate(LATEST_SPENDING_COUNT);

            BudgetSummary {
                remaining: (budget.maximum - spent).max(0.0),
                category_label,
                spent,
                latest_spending,
                budget,
            }
        })
        .collect()
}

fn load_budgets_page(user_id: UserID, state: &BudgetsPageState) -> Result<BudgetsPageData, Error> {
    let offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let today = time::OffsetDateTime::now_utc().to_offset(offset).date();

    let connection = lock_connection(&state.db_connection)?;
    let budgets = load_budgets(user_id, &connection)?;
    let categories = load_categories(&connection);
    let transactions = load_transactions(user_id, &connection);
    let themes = load_themes(&connection);

    Ok(BudgetsPageData {
        summaries: summarise_budgets(budgets, &categories, &transactions, today, offset),
        categories,
        themes,
    })
}

/// Renders the budgets page.
pub async fn get_budgets_page(
    State(state): State<BudgetsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    match load_budgets_page(user_id, &state) {
        Ok(data) => budgets_view(&data).into_response(),
        Err(error) => error.into_response(),
    }
}

fn category_select(
    id: &str,
    categories: &[Category],
    selected: Option<CategoryId>,
    is_available: impl Fn(CategoryId) -> bool,
) -> Markup {
    html! {
        div
        {
            label for=(id) class=(FORM_LABEL_STYLE) { "Budget Category" }

            select name="category_id" id=(id) class=(FORM_TEXT_INPUT_STYLE) required
            {
                @if selected.is_none() {
                    option value="" { "Select a category" }
                }

                @for category in categories {
                    @let is_selected = selected == Some(category.id);
                    @if is_selected || is_available(category.id) {
                        option value=(category.id) selected[is_selected] { (category.label) }
                    }
                }
            }
        }
    }
}

fn budgets_view(data: &BudgetsPageData) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW).into_html();
    let used_categories: Vec<CategoryId> = data
        .summaries
        .iter()
        .map(|summary| summary.budget.category_id)
        .collect();
    let is_available = |id: CategoryId| !used_categories.contains(&id);
    let total_maximum: f64 = data.summaries.iter().map(|summary| summary.budget.maximum).sum();
    let total_spent: f64 = data.summaries.iter().map(|summary| summary.spent).sum();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-6"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    h1 class="text-xl font-bold" { "Budgets" }

                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        (format_currency(total_spent)) " of " (format_currency(total_maximum))
                        " spent this month"
                    }
                }

                details class=(CARD_STYLE)
                {
                    summary class="cursor-pointer font-semibold" { "Add New Budget" }

                    form
                        hx-post=(endpoints::BUDGETS_API)
                        hx-target-error="#alert-container"
                        class="mt-4 space-y-4"
                    {
                        (category_select("category_id", &data.categories, None, is_available))
                        (dollar_input("maximum", "Maximum Spend", None))
                        (theme_select("theme", &data.themes, DEFAULT_THEME))

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Budget" }
                    }
                }

                @if data.summaries.is_empty() {
                    p class="text-gray-500 dark:text-gray-400"
                    {
                        "You have no budgets yet. Create one above to track your spending."
                    }
                } @else {
                    div class="grid gap-4 md:grid-cols-2"
                    {
                        @for summary in &data.summaries {
                            (budget_card(summary, &data.categories, &data.themes, is_available))
                        }
                    }
                }
            }
        }
    };

    base("Budgets", &[dollar_input_styles()], &content)
}

fn budget_card(
    summary: &BudgetSummary,
    categories: &[Category],
    themes: &[ColorTheme],
    is_available: impl Fn(CategoryId) -> bool,
) -> Markup {
    let budget = &summary.budget;
    let colour = theme_hex(themes, &budget.theme);
    let maximum_id = format!("budget-{}-maximum", budget.id);
    let delete_confirmation = format!(
        "Are you sure you want to delete the {} budget? This cannot be undone.",
        summary.category_label
    );

    html! {
        article class=(CARD_STYLE) data-budget-id=(budget.id)
        {
            header class="flex items-center justify-between mb-2"
            {
                h2 class="flex items-center gap-3 text-lg font-bold"
                {
                    span
                        class="inline-block w-4 h-4 rounded-full"
                        style=(format!("background-color: {colour};"))
                    {}
                    (summary.category_label)
                }

                button
                    type="button"
                    hx-delete=(format_endpoint(endpoints::BUDGET, budget.id))
                    hx-confirm=(delete_confirmation)
                    hx-target-error="#alert-container"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }

            p class="mb-4 text-sm text-gray-500 dark:text-gray-400"
            {
                "Maximum of " (format_currency(budget.maximum))
            }

            (progress_bar(summary.spent, budget.maximum, colour))

            dl class="grid grid-cols-2 gap-4 my-4"
            {
                div
                {
                    dt class="text-xs text-gray-500 dark:text-gray-400" { "Spent" }
                    dd class="font-bold" data-testid="spent" { (format_currency(summary.spent)) }
                }
                div
                {
                    dt class="text-xs text-gray-500 dark:text-gray-400" { "Remaining" }
                    dd class="font-bold" data-testid="remaining" { (format_currency(summary.remaining)) }
                }
            }

            @if !summary.latest_spending.is_empty() {
                h3 class="text-sm font-semibold mb-2" { "Latest Spending" }
                ul class="mb-4 space-y-1 text-sm"
                {
                    @for transaction in &summary.latest_spending {
                        li class="flex justify-between"
                        {
                            span { (transaction.name) }
                            span { (format_currency(transaction.amount)) }
                        }
                    }
                }
            }

            details
            {
                summary class="cursor-pointer text-sm" { "Edit Budget" }

                form
                    hx-put=(format_endpoint(endpoints::BUDGET, budget.id))
                    hx-target-error="#alert-container"
                    class="mt-4 space-y-4"
                {
                    (category_select(
                        &format!("budget-{}-category", budget.id),
                        categories,
                        Some(budget.category_id),
                        is_available,
                    ))

                    div
                    {
                        label for=(maximum_id) class=(FORM_LABEL_STYLE) { "Maximum Spend" }
                        div class="input-wrapper w-full"
                        {
                            input
                                type="number"
                                step="0.01"
                                min="0.01"
                                name="maximum"
                                id=(maximum_id)
                                value=(format!("{:.2}", budget.maximum))
                                class=(FORM_TEXT_INPUT_STYLE)
                                required;
                        }
                    }

                    (theme_select(&format!("budget-{}-theme", budget.id), themes, &budget.theme))

                    button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Save Changes" }
                }
            }
        }
    }
}
