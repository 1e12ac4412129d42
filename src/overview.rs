//! The overview page: a summary of the balance, pots, budgets, latest
//! transactions and recurring bills.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error, UserID,
    balance::Balance,
    budget::{Budget, spent_in_month},
    category::{Category, get_category_by_id},
    db::lock_connection,
    endpoints,
    html::{CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base, format_currency, progress_bar},
    loader::{load_balance, load_budgets, load_categories, load_pots, load_themes, load_transactions},
    navigation::NavBar,
    pot::Pot,
    theme::{ColorTheme, theme_hex},
    timezone::get_local_offset,
    transaction::Transaction,
};

/// How many pots the overview shows.
const OVERVIEW_POT_COUNT: usize = 4;
/// How many transactions the overview shows.
const OVERVIEW_TRANSACTION_COUNT: usize = 5;

/// The state needed for [get_overview_page].
#[derive(Debug, Clone)]
pub struct OverviewState {
    /// The database connection for reading the user's data.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for OverviewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

struct BudgetOverview {
    budget: Budget,
    label: String,
    spent: f64,
}

struct OverviewData {
    balance: Option<Balance>,
    total_saved: f64,
    pots: Vec<Pot>,
    budgets: Vec<BudgetOverview>,
    latest_transactions: Vec<Transaction>,
    recurring_bills: f64,
    categories: Vec<Category>,
    themes: Vec<ColorTheme>,
}

/// The monthly cost of the user's recurring bills.
///
/// A bill that recurs shows up once per month, so each payee is counted once
/// using its most recent payment.
fn recurring_bills_total(transactions: &[Transaction]) -> f64 {
    let mut bills: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| transaction.recurring && transaction.amount < 0.0)
        .collect();
    bills.sort_by(|a, b| b.date.cmp(&a.date));

    let mut seen = HashSet::new();
    let cents: i64 = bills
        .into_iter()
        .filter(|bill| seen.insert(bill.name.as_str()))
        .map(|bill| crate::form::to_cents(-bill.amount))
        .sum();

    cents as f64 / 100.0
}

fn latest_transactions(transactions: &[Transaction], count: usize) -> Vec<Transaction> {
    let mut latest = transactions.to_vec();
    latest.sort_by(|a, b| b.date.cmp(&a.date));
    latest.truncate(count);
    latest
}

fn load_overview(user_id: UserID, state: &OverviewState) -> Result<OverviewData, Error> {
    let offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let today = OffsetDateTime::now_utc().to_offset(offset).date();

    let connection = lock_connection(&state.db_connection)?;
    let balance = load_balance(user_id, &connection);
    let pots = load_pots(user_id, &connection)?;
    let budgets = load_budgets(user_id, &connection)?;
    let transactions = load_transactions(user_id, &connection);
    let categories = load_categories(&connection);
    let themes = load_themes(&connection);
    drop(connection);

    let budgets = budgets
        .into_iter()
        .map(|budget| BudgetOverview {
            spent: spent_in_month(&transactions, budget.category_id, today, offset),
            label: get_category_by_id(&categories, budget.category_id)
                .map(|category| category.label.clone())
                .unwrap_or_else(|| "Unknown".to_owned()),
            budget,
        })
        .collect();

    Ok(OverviewData {
        balance,
        total_saved: pots.iter().map(|pot| pot.total).sum(),
        pots: pots.into_iter().take(OVERVIEW_POT_COUNT).collect(),
        budgets,
        latest_transactions: latest_transactions(&transactions, OVERVIEW_TRANSACTION_COUNT),
        recurring_bills: recurring_bills_total(&transactions),
        categories,
        themes,
    })
}

/// Renders the overview page.
pub async fn get_overview_page(
    State(state): State<OverviewState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    match load_overview(user_id, &state) {
        Ok(data) => overview_view(&data).into_response(),
        Err(error) => error.into_response(),
    }
}

fn section_header(title: &str, url: &str, link_text: &str) -> Markup {
    html! {
        header class="flex justify-between items-center mb-4"
        {
            h2 class="text-lg font-bold" { (title) }
            a href=(url) class=(LINK_STYLE) { (link_text) }
        }
    }
}

fn balance_cards(balance: Option<&Balance>) -> Markup {
    let cards = [
        ("Current Balance", balance.map(|balance| balance.current)),
        ("Income", balance.map(|balance| balance.income)),
        ("Expenses", balance.map(|balance| balance.expenses)),
    ];

    html! {
        div class="grid gap-4 md:grid-cols-3" data-testid="balance"
        {
            @for (label, amount) in cards {
                div class=(CARD_STYLE)
                {
                    p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
                    p class="text-2xl font-bold"
                    {
                        @match amount {
                            Some(amount) => { (format_currency(amount)) }
                            None => { "Unavailable" }
                        }
                    }
                }
            }
        }
    }
}

fn overview_view(data: &OverviewData) -> Markup {
    let nav_bar = NavBar::new(endpoints::OVERVIEW_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                h1 class="text-xl font-bold" { "Overview" }

                (balance_cards(data.balance.as_ref()))

                section class=(CARD_STYLE) data-testid="pots"
                {
                    (section_header("Pots", endpoints::POTS_VIEW, "See Details"))

                    p class="mb-4"
                    {
                        span class="text-sm text-gray-500 dark:text-gray-400" { "Total Saved " }
                        span class="text-2xl font-bold" { (format_currency(data.total_saved)) }
                    }

                    ul class="grid grid-cols-2 gap-4"
                    {
                        @for pot in &data.pots {
                            li
                                class="pl-3 border-l-4"
                                style=(format!("border-color: {};", theme_hex(&data.themes, &pot.theme)))
                            {
                                p class="text-xs text-gray-500 dark:text-gray-400" { (pot.name) }
                                p class="font-bold" { (format_currency(pot.total)) }
                            }
                        }
                    }
                }

                section class=(CARD_STYLE) data-testid="transactions"
                {
                    (section_header("Transactions", endpoints::TRANSACTIONS_VIEW, "View All"))

                    ul class="divide-y divide-gray-200 dark:divide-gray-700"
                    {
                        @for transaction in &data.latest_transactions {
                            li class="flex justify-between py-3"
                            {
                                div
                                {
                                    p class="font-bold" { (transaction.name) }
                                    p class="text-xs text-gray-500 dark:text-gray-400"
                                    {
                                        (get_category_by_id(&data.categories, transaction.category_id)
                                            .map(|category| category.label.as_str())
                                            .unwrap_or("Unknown"))
                                    }
                                }
                                p class="font-bold" { (format_currency(transaction.amount)) }
                            }
                        }
                    }
                }

                section class=(CARD_STYLE) data-testid="budgets"
                {
                    (section_header("Budgets", endpoints::BUDGETS_VIEW, "See Details"))

                    ul class="space-y-4"
                    {
                        @for summary in &data.budgets {
                            @let colour = theme_hex(&data.themes, &summary.budget.theme);
                            li
                            {
                                div class="flex justify-between text-sm mb-1"
                                {
                                    span { (summary.label) }
                                    span
                                    {
                                        (format_currency(summary.spent)) " of "
                                        (format_currency(summary.budget.maximum))
                                    }
                                }
                                (progress_bar(summary.spent, summary.budget.maximum, colour))
                            }
                        }
                    }
                }

                section class=(CARD_STYLE) data-testid="recurring-bills"
                {
                    (section_header("Recurring Bills", endpoints::TRANSACTIONS_VIEW, "See Details"))

                    p class="flex justify-between"
                    {
                        span { "Monthly total" }
                        span class="font-bold" { (format_currency(data.recurring_bills)) }
                    }
                }
            }
        }
    };

    base("Overview", &[], &content)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use scraper::{Html, Selector};
    use time::macros::datetime;

    use crate::{
        UserID,
        pot::{PotForm, add_money_to_pot, create_pot},
        test_utils::{assert_valid_html, create_test_user, get_test_connection, parse_html_document},
        transaction::{Transaction, create_transaction},
    };

    use super::{OverviewState, get_overview_page, recurring_bills_total};

    fn transaction(name: &str, amount: f64, day: u8, recurring: bool) -> Transaction {
        let date = datetime!(2024-08-01 12:00 UTC)
            .replace_day(day)
            .unwrap();

        Transaction {
            id: day as i64,
            avatar: String::new(),
            name: name.to_owned(),
            category_id: 2,
            date,
            amount,
            recurring,
        }
    }

    #[test]
    fn recurring_bills_count_each_payee_once() {
        let transactions = [
            transaction("Power", -80.0, 1, true),
            transaction("Power", -95.5, 15, true),
            transaction("Gym", -30.0, 3, true),
            transaction("Groceries", -120.0, 4, false),
            transaction("Salary", 2000.0, 5, true),
        ];

        assert_eq!(recurring_bills_total(&transactions), 125.5);
    }

    fn section_text(html: &Html, testid: &str) -> String {
        html.select(&Selector::parse(&format!("[data-testid={testid}]")).unwrap())
            .next()
            .unwrap_or_else(|| panic!("No section {testid}"))
            .text()
            .collect()
    }

    #[tokio::test]
    async fn overview_shows_summaries() {
        let conn = get_test_connection();
        let user_id: UserID = create_test_user("jo@example.com", &conn);
        for day in 1..=6 {
            create_transaction(
                user_id,
                &Transaction::build(
                    &format!("Payee {day}"),
                    100.0,
                    datetime!(2024-08-01 12:00 UTC).replace_day(day).unwrap(),
                    10,
                ),
                &conn,
            )
            .unwrap();
        }
        for name in ["A", "B", "C", "D", "E"] {
            let pot = create_pot(
                user_id,
                &PotForm {
                    name: name.to_owned(),
                    target: "100".to_owned(),
                    theme: String::new(),
                },
                &conn,
            )
            .unwrap();
            add_money_to_pot(user_id, pot.id, 10.0, &conn).unwrap();
        }
        let state = OverviewState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Pacific/Auckland".to_owned(),
        };

        let response = get_overview_page(State(state), Extension(user_id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert!(section_text(&html, "balance").contains("$550.00"));
        let pots = section_text(&html, "pots");
        assert!(pots.contains("$50.00"));
        let pot_items = html
            .select(&Selector::parse("[data-testid=pots] li").unwrap())
            .count();
        assert_eq!(pot_items, 4);
        let transaction_items = html
            .select(&Selector::parse("[data-testid=transactions] li").unwrap())
            .count();
        assert_eq!(transaction_items, 5);
        assert!(!section_text(&html, "transactions").contains("Payee 1"));
    }
}
