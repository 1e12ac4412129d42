//! Displays the user's savings pots with forms for managing them.

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error, UserID,
    db::lock_connection,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, dollar_input,
        dollar_input_styles, format_currency, progress_bar, sort_select, text_input,
        theme_select,
    },
    loader::{load_pots, load_sort_options, load_themes},
    navigation::NavBar,
    pot::{Pot, endpoints::PotState},
    sorting::{DEFAULT_POT_SORT, SortOption, sort_by_option},
    theme::{ColorTheme, DEFAULT_THEME, theme_hex},
};

/// The query parameters for the pots page.
#[derive(Debug, Default, Deserialize)]
pub struct PotsQuery {
    /// The ID of the sort option to order pots by.
    pub sort: Option<String>,
}

struct PotsPageData {
    pots: Vec<Pot>,
    sort_options: Vec<SortOption>,
    themes: Vec<ColorTheme>,
    selected_sort: String,
}

fn load_pots_page(
    user_id: UserID,
    query: PotsQuery,
    state: &PotState,
) -> Result<PotsPageData, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let sort_options = load_sort_options(&connection)?;
    let pots = load_pots(user_id, &connection)?;
    let themes = load_themes(&connection);

    let selected_sort = query.sort.unwrap_or_else(|| DEFAULT_POT_SORT.to_owned());
    let pots = sort_by_option(&pots, &selected_sort, &sort_options);

    Ok(PotsPageData {
        pots,
        sort_options,
        themes,
        selected_sort,
    })
}

/// Renders the pots page.
pub async fn get_pots_page(
    State(state): State<PotState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<PotsQuery>,
) -> Response {
    match load_pots_page(user_id, query, &state) {
        Ok(data) => pots_view(&data).into_response(),
        Err(error) => error.into_response(),
    }
}

fn pots_view(data: &PotsPageData) -> Markup {
    let nav_bar = NavBar::new(endpoints::POTS_VIEW).into_html();
    let total_saved: f64 = data.pots.iter().map(|pot| pot.total).sum();

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-5xl space-y-6"
            {
                header class="flex justify-between flex-wrap items-end gap-4"
                {
                    div
                    {
                        h1 class="text-xl font-bold" { "Pots" }
                        p class="text-sm text-gray-500 dark:text-gray-400"
                        {
                            "Total saved: " (format_currency(total_saved))
                        }
                    }

                    (sort_select(endpoints::POTS_VIEW, &data.sort_options, &data.selected_sort))
                }

                (create_pot_form(&data.themes))

                @if data.pots.is_empty() {
                    p class="text-gray-500 dark:text-gray-400"
                    {
                        "You have no pots yet. Create one above to start saving."
                    }
                } @else {
                    div class="grid gap-4 md:grid-cols-2" data-testid="pot-list"
                    {
                        @for pot in &data.pots {
                            (pot_card(pot, &data.themes))
                        }
                    }
                }
            }
        }
    };

    base("Pots", &[dollar_input_styles()], &content)
}

fn create_pot_form(themes: &[ColorTheme]) -> Markup {
    html! {
        details class=(CARD_STYLE)
        {
            summary class="cursor-pointer font-semibold" { "Add New Pot" }

            form
                hx-post=(endpoints::POTS_API)
                hx-target-error="#alert-container"
                class="mt-4 space-y-4"
            {
                (text_input("name", "Pot Name", "text", "", true))
                (dollar_input("target", "Target", None))
                (theme_select("theme", themes, DEFAULT_THEME))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Pot" }
            }
        }
    }
}

fn amount_form(pot: &Pot, endpoint: &str, action: &str, max: f64) -> Markup {
    let input_id = format!("pot-{}-{}-amount", pot.id, action.to_lowercase());

    html! {
        form
            hx-post=(format_endpoint(endpoint, pot.id))
            hx-target-error="#alert-container"
            class="flex items-end gap-2"
        {
            div class="grow"
            {
                label for=(input_id) class="sr-only" { (action) " amount" }

                div class="input-wrapper w-full"
                {
                    input
                        type="number"
                        step="0.01"
                        min="0.01"
                        max=(format!("{max:.2}"))
                        name="amount"
                        id=(input_id)
                        placeholder="0.00"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }
            }

            button type="submit" class="px-4 py-2.5 text-sm rounded bg-gray-900 text-white dark:bg-gray-600"
            {
                (action)
            }
        }
    }
}

fn edit_pot_form(pot: &Pot, themes: &[ColorTheme]) -> Markup {
    let name_id = format!("pot-{}-name", pot.id);
    let target_id = format!("pot-{}-target", pot.id);

    html! {
        details
        {
            summary class="cursor-pointer text-sm" { "Edit Pot" }

            form
                hx-put=(format_endpoint(endpoints::POT, pot.id))
                hx-target-error="#alert-container"
                class="mt-4 space-y-4"
            {
                div
                {
                    label for=(name_id) class=(FORM_LABEL_STYLE) { "Pot Name" }
                    input
                        type="text"
                        name="name"
                        id=(name_id)
                        value=(pot.name)
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                div
                {
                    label for=(target_id) class=(FORM_LABEL_STYLE) { "Target" }
                    div class="input-wrapper w-full"
                    {
                        input
                            type="number"
                            step="0.01"
                            min=(format!("{:.2}", pot.total.max(0.01)))
                            name="target"
                            id=(target_id)
                            value=(format!("{:.2}", pot.target))
                            class=(FORM_TEXT_INPUT_STYLE)
                            required;
                    }
                }

                (theme_select(&format!("pot-{}-theme", pot.id), themes, &pot.theme))

                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Save Changes" }
            }
        }
    }
}

fn pot_card(pot: &Pot, themes: &[ColorTheme]) -> Markup {
    let colour = theme_hex(themes, &pot.theme);
    let delete_confirmation = format!(
        "Are you sure you want to delete the pot '{}'? This cannot be undone.",
        pot.name
    );

    html! {
        article class=(CARD_STYLE) data-pot-id=(pot.id)
        {
            header class="flex items-center justify-between mb-4"
            {
                h2 class="flex items-center gap-3 text-lg font-bold"
                {
                    span
                        class="inline-block w-4 h-4 rounded-full"
                        style=(format!("background-color: {colour};"))
                    {}
                    (pot.name)
                }

                button
                    type="button"
                    hx-delete=(format_endpoint(endpoints::POT, pot.id))
                    hx-confirm=(delete_confirmation)
                    hx-target-error="#alert-container"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }

            div class="flex justify-between items-end mb-2"
            {
                span class="text-sm text-gray-500 dark:text-gray-400" { "Total Saved" }
                span class="text-2xl font-bold" { (format_currency(pot.total)) }
            }

            (progress_bar(pot.total, pot.target, colour))

            div class="flex justify-between mt-2 mb-4 text-xs text-gray-500 dark:text-gray-400"
            {
                span { (format!("{:.2}%", pot.percent_saved())) }
                span { "Target of " (format_currency(pot.target)) }
            }

            div class="grid gap-2 sm:grid-cols-2 mb-4"
            {
                (amount_form(pot, endpoints::POT_ADD, "Add", (pot.target - pot.total).max(0.0)))
                (amount_form(pot, endpoints::POT_WITHDRAW, "Withdraw", pot.total))
            }

            (edit_pot_form(pot, themes))
        }
    }
}
