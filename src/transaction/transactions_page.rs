//! Defines the route handler for the page that displays transactions as a table.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error, UserID,
    category::{Category, CategoryId, get_category_by_id},
    db::lock_connection,
    endpoints,
    html::{
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    loader::{load_categories, load_transaction_sort_options, load_transactions},
    navigation::NavBar,
    sorting::{DEFAULT_TRANSACTION_SORT, SortOption, sort_by_option},
    transaction::{Transaction, filter_transactions},
};

const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day] [month repr:short] [year]");

/// The state needed for [get_transactions_page].
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the transactions page.
///
/// `category` is kept as a string so that "all" or a stale ID shows every
/// transaction instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    /// The ID of the sort option to order transactions by.
    pub sort: Option<String>,
    /// The category ID to filter by.
    pub category: Option<String>,
    /// Text that transaction names must contain.
    pub search: Option<String>,
}

impl TransactionsQuery {
    fn category_id(&self) -> Option<CategoryId> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty() && *category != "all")
            .and_then(|category| {
                category
                    .parse()
                    .inspect_err(|_| tracing::debug!("Ignoring invalid category {category:?}"))
                    .ok()
            })
    }
}

struct TransactionsPageData {
    transactions: Vec<Transaction>,
    categories: Vec<Category>,
    sort_options: Vec<SortOption>,
    selected_sort: String,
    selected_category: Option<CategoryId>,
    search: String,
}

fn load_transactions_page(
    user_id: UserID,
    query: TransactionsQuery,
    state: &TransactionsPageState,
) -> Result<TransactionsPageData, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sort_options = load_transaction_sort_options(&connection)?;
    let categories = load_categories(&connection);
    let transactions = load_transactions(user_id, &connection);

    let selected_category = query.category_id();
    let search = query.search.unwrap_or_default();
    let selected_sort = query
        .sort
        .unwrap_or_else(|| DEFAULT_TRANSACTION_SORT.to_owned());

    let transactions = filter_transactions(&transactions, selected_category, Some(&search));
    let transactions = sort_by_option(&transactions, &selected_sort, &sort_options);

    Ok(TransactionsPageData {
        transactions,
        categories,
        sort_options,
        selected_sort,
        selected_category,
        search,
    })
}

/// Renders the transactions page.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionsQuery>,
) -> Response {
    match load_transactions_page(user_id, query, &state) {
        Ok(data) => transactions_view(&data).into_response(),
        Err(error) => error.into_response(),
    }
}

fn filter_form(data: &TransactionsPageData) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="flex flex-wrap items-end gap-4 w-full"
        {
            div class="grow"
            {
                label for="search" class="sr-only" { "Search transactions" }
                input
                    type="search"
                    name="search"
                    id="search"
                    placeholder="Search transactions"
                    value=(data.search)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="sort" class="text-sm text-gray-500 dark:text-gray-400" { "Sort by" }
                select name="sort" id="sort" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for sort_option in &data.sort_options {
                        option
                            value=(sort_option.id)
                            selected[sort_option.id == data.selected_sort]
                        {
                            (sort_option.label)
                        }
                    }
                }
            }

            div
            {
                label for="category" class="text-sm text-gray-500 dark:text-gray-400" { "Category" }
                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="all" selected[data.selected_category.is_none()] { "All Transactions" }

                    @for category in &data.categories {
                        option
                            value=(category.id)
                            selected[data.selected_category == Some(category.id)]
                        {
                            (category.label)
                        }
                    }
                }
            }

            button type="submit" class=(LINK_STYLE) { "Apply" }
        }
    }
}

fn transaction_row(transaction: &Transaction, categories: &[Category]) -> Markup {
    let category = get_category_by_id(categories, transaction.category_id)
        .map(|category| category.label.as_str())
        .unwrap_or("Unknown");
    let date = transaction
        .date
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| transaction.date.date().to_string());
    let amount_style = if transaction.amount >= 0.0 {
        "px-6 py-4 text-right font-bold text-green-700 dark:text-green-400"
    } else {
        "px-6 py-4 text-right font-bold"
    };
    let amount = if transaction.amount > 0.0 {
        format!("+{}", format_currency(transaction.amount))
    } else {
        format_currency(transaction.amount)
    };

    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
        {
            th
                scope="row"
                class="flex items-center gap-3 px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
            {
                @if !transaction.avatar.is_empty() {
                    img src=(transaction.avatar) alt="" class="w-8 h-8 rounded-full";
                }
                (transaction.name)
                @if transaction.recurring {
                    span class="text-xs text-gray-500 dark:text-gray-400" { "Recurring" }
                }
            }
            td class=(TABLE_CELL_STYLE) { (category) }
            td class=(TABLE_CELL_STYLE)
            {
                time datetime=(transaction.date.date().to_string()) { (date) }
            }
            td class=(amount_style) { (amount) }
        }
    }
}

fn transactions_view(data: &TransactionsPageData) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-4"
            {
                h1 class="text-xl font-bold" { "Transactions" }

                (filter_form(data))

                @if data.transactions.is_empty() {
                    p class="text-gray-500 dark:text-gray-400" { "No transactions found." }
                } @else {
                    div class="w-full overflow-x-auto"
                    {
                        table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Recipient / Sender" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Transaction Date" }
                                    th scope="col" class="px-6 py-4 text-right" { "Amount" }
                                }
                            }

                            tbody
                            {
                                @for transaction in &data.transactions {
                                    (transaction_row(transaction, &data.categories))
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Transactions", &[], &content)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::Html;
    use time::macros::datetime;

    use crate::{
        UserID,
        test_utils::{
            assert_valid_html, create_test_user, element_texts, get_test_connection,
            parse_html_document,
        },
        transaction::{Transaction, create_transaction},
    };

    use super::{TransactionsPageState, TransactionsQuery, get_transactions_page};

    fn get_state() -> (TransactionsPageState, UserID) {
        let conn = get_test_connection();
        let user_id = create_test_user("jo@example.com", &conn);
        for (name, amount, date, category_id) in [
            ("Emma Richardson", 75.5, datetime!(2024-08-19 14:23 UTC), 10),
            ("Savory Bites", -55.5, datetime!(2024-08-20 20:23 UTC), 4),
            ("Daniel Carter", -42.3, datetime!(2024-08-18 09:45 UTC), 1),
            ("Sun Park", 120.0, datetime!(2024-08-17 16:12 UTC), 10),
        ] {
            create_transaction(
                user_id,
                &Transaction::build(name, amount, date, category_id),
                &conn,
            )
            .unwrap();
        }

        (
            TransactionsPageState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user_id,
        )
    }

    fn row_names(html: &Html) -> Vec<String> {
        element_texts(html, "tr[data-transaction-id] th")
    }

    async fn get_page(query: TransactionsQuery) -> Html {
        let (state, user_id) = get_state();
        let response = get_transactions_page(State(state), Extension(user_id), Query(query)).await;
        assert_eq!(response.status(), StatusCode::OK);

        parse_html_document(response).await
    }

    #[tokio::test]
    async fn defaults_to_latest_first() {
        let html = get_page(TransactionsQuery::default()).await;

        assert_valid_html(&html);
        assert_eq!(
            row_names(&html),
            ["Savory Bites", "Emma Richardson", "Daniel Carter", "Sun Park"]
        );
    }

    #[tokio::test]
    async fn sorts_by_amount() {
        let html = get_page(TransactionsQuery {
            sort: Some("highest".to_owned()),
            ..Default::default()
        })
        .await;

        assert_eq!(
            row_names(&html),
            ["Sun Park", "Emma Richardson", "Daniel Carter", "Savory Bites"]
        );
    }

    #[tokio::test]
    async fn filters_by_category_and_search() {
        let html = get_page(TransactionsQuery {
            sort: Some("a_to_z".to_owned()),
            category: Some("10".to_owned()),
            search: Some("park".to_owned()),
        })
        .await;

        assert_eq!(row_names(&html), ["Sun Park"]);
    }

    #[tokio::test]
    async fn all_category_shows_everything() {
        let html = get_page(TransactionsQuery {
            category: Some("all".to_owned()),
            ..Default::default()
        })
        .await;

        assert_eq!(row_names(&html).len(), 4);
    }

    #[tokio::test]
    async fn unknown_sort_keeps_stored_order() {
        let html = get_page(TransactionsQuery {
            sort: Some("sideways".to_owned()),
            ..Default::default()
        })
        .await;

        assert_eq!(
            row_names(&html),
            ["Emma Richardson", "Savory Bites", "Daniel Carter", "Sun Park"]
        );
    }

    #[tokio::test]
    async fn no_matches_shows_message() {
        let html = get_page(TransactionsQuery {
            search: Some("nobody".to_owned()),
            ..Default::default()
        })
        .await;

        assert!(row_names(&html).is_empty());
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No transactions found."));
    }
}
