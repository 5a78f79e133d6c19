//! HTML rendering for the dashboard page.

use maud::{Markup, html};

use crate::{
    auth::Session,
    endpoints,
    html::{
        BADGE_PURCHASE_STYLE, BADGE_TOP_UP_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_date,
        format_signed_amount,
    },
    pagination::{PaginationIndicator, create_pagination_indicators},
    transaction::{
        KindFilter, SortDirection, SortField, Transaction, TransactionKind, TransactionPage,
        next_sort,
    },
};

fn amount_class(amount: f64) -> &'static str {
    if amount < 0.0 {
        "text-red-700 dark:text-red-300"
    } else {
        "text-green-700 dark:text-green-300"
    }
}

fn dashboard_url(
    filter: KindFilter,
    sort_field: SortField,
    sort_direction: SortDirection,
    page: usize,
) -> String {
    format!(
        "{}?filter={}&sort={}&dir={}&page={}",
        endpoints::DASHBOARD_VIEW,
        filter,
        sort_field,
        sort_direction,
        page
    )
}

/// A column header that selects the next sort state for its field, with an
/// arrow marking the active field's direction.
fn sort_header(
    label: &str,
    field: SortField,
    current_field: SortField,
    current_direction: SortDirection,
    filter: KindFilter,
) -> Markup {
    let (next_field, next_direction) = next_sort(current_field, current_direction, field);
    let url = dashboard_url(filter, next_field, next_direction, 1);

    html! {
        a href=(url) class="flex items-center gap-1 hover:text-blue-600 dark:hover:text-blue-400"
        {
            (label)

            @if field == current_field
            {
                @match current_direction
                {
                    SortDirection::Ascending => span { "\u{25B2}" }
                    SortDirection::Descending => span { "\u{25BC}" }
                }
            }
        }
    }
}

fn filter_tabs(
    filter: KindFilter,
    sort_field: SortField,
    sort_direction: SortDirection,
) -> Markup {
    let tab_style = |active: bool| {
        if active {
            "px-3 py-1 rounded-full text-sm font-medium bg-blue-600 text-white"
        } else {
            "px-3 py-1 rounded-full text-sm font-medium text-gray-600 dark:text-gray-300 \
            hover:bg-gray-200 dark:hover:bg-gray-700"
        }
    };

    html! {
        div class="flex items-center gap-2" role="tablist"
        {
            @for option in [KindFilter::All, KindFilter::Purchase, KindFilter::TopUp]
            {
                a
                    href=(dashboard_url(option, sort_field, sort_direction, 1))
                    class=(tab_style(option == filter))
                {
                    (option)
                }
            }
        }
    }
}

fn kind_badge(kind: TransactionKind) -> Markup {
    let style = match kind {
        TransactionKind::TopUp => BADGE_TOP_UP_STYLE,
        TransactionKind::Purchase => BADGE_PURCHASE_STYLE,
    };

    html! {
        span class=(style) { (kind) }
    }
}

fn transaction_row(transaction: &Transaction) -> Markup {
    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (format_date(transaction.date)) }
            td class=(TABLE_CELL_STYLE) { (kind_badge(transaction.kind)) }
            td class={ (TABLE_CELL_STYLE) " text-right font-semibold" }
            {
                span class=(amount_class(transaction.amount))
                {
                    (format_signed_amount(transaction.amount))
                }
            }
        }
    }
}

fn pagination_controls(
    page: &TransactionPage,
    filter: KindFilter,
    sort_field: SortField,
    sort_direction: SortDirection,
) -> Markup {
    let indicators = create_pagination_indicators(page.page, page.total_pages);
    let page_url = |target_page| dashboard_url(filter, sort_field, sort_direction, target_page);
    let page_link_style = "px-3 py-1 rounded text-sm hover:bg-gray-200 dark:hover:bg-gray-700";

    html! {
        nav aria-label="Pagination" class="flex items-center justify-center gap-1 py-3"
        {
            @for indicator in indicators
            {
                @match indicator
                {
                    PaginationIndicator::BackButton(target) =>
                        a href=(page_url(target)) class=(page_link_style) { "Previous" }
                    PaginationIndicator::NextButton(target) =>
                        a href=(page_url(target)) class=(page_link_style) { "Next" }
                    PaginationIndicator::Page(target) =>
                        a href=(page_url(target)) class=(page_link_style) { (target) }
                    PaginationIndicator::CurrPage(current) =>
                        span class="px-3 py-1 rounded text-sm font-bold bg-blue-600 text-white"
                        {
                            (current)
                        }
                    PaginationIndicator::Ellipsis =>
                        span class="px-2 text-gray-500" { "\u{2026}" }
                }
            }
        }
    }
}

fn account_card(session: &Session) -> Markup {
    let display_name = session.display_name();
    let initial: String = display_name.chars().take(1).collect();

    html! {
        section class="rounded bg-white dark:bg-gray-800 shadow p-6 space-y-4 w-full"
        {
            div class="flex items-center gap-4"
            {
                div class="flex items-center justify-center h-16 w-16 rounded-full
                    bg-blue-100 dark:bg-blue-900 text-blue-700 dark:text-blue-300
                    text-xl font-semibold"
                {
                    (initial)
                }

                div
                {
                    h2 class="text-xl font-bold" { (display_name) }
                    p class="text-sm text-gray-500 dark:text-gray-400" { (session.email) }
                }
            }

            div class="flex items-center gap-3 text-sm text-gray-500 dark:text-gray-400"
            {
                span class="inline-flex items-center px-2.5 py-0.5 text-xs font-semibold
                    rounded-full text-blue-800 bg-blue-100 dark:bg-blue-900 dark:text-blue-300"
                {
                    "Active"
                }

                a href=(endpoints::CHANGE_PASSWORD_VIEW) class=(LINK_STYLE) { "Change Password" }
            }
        }
    }
}

fn activation_card(session: &Session) -> Markup {
    html! {
        section class="rounded bg-white dark:bg-gray-800 shadow p-6 w-full"
        {
            h2 class="text-lg font-bold mb-3" { "Activation Card" }

            @if let Some(card_url) = &session.card_url
            {
                img
                    src=(card_url)
                    alt="Activation card"
                    class="w-full rounded border border-gray-200 dark:border-gray-700";
            } @else
            {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "No activation card on file."
                }
            }
        }
    }
}

fn transactions_card(
    page: &TransactionPage,
    filter: KindFilter,
    sort_field: SortField,
    sort_direction: SortDirection,
) -> Markup {
    html! {
        section class="rounded bg-white dark:bg-gray-800 shadow w-full overflow-hidden"
        {
            header class="flex justify-between flex-wrap items-center gap-3 p-6 pb-3"
            {
                div
                {
                    h2 class="text-lg font-bold" { "Recent Transactions" }
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Your latest financial activity"
                    }
                }

                (filter_tabs(filter, sort_field, sort_direction))
            }

            @if page.rows.is_empty()
            {
                div class="text-center py-12 text-gray-500 dark:text-gray-400"
                {
                    p class="text-lg font-medium mb-2" { "No transactions found" }
                    p class="text-sm" { "Try adjusting your filter to see more results." }
                }
            } @else
            {
                table class="w-full my-2 text-sm text-left rtl:text-right
                    text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                (sort_header("Date", SortField::Date, sort_field, sort_direction, filter))
                            }
                            th scope="col" class=(TABLE_CELL_STYLE)
                            {
                                (sort_header("Type", SortField::Type, sort_field, sort_direction, filter))
                            }
                            th scope="col" class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (sort_header("Amount", SortField::Amount, sort_field, sort_direction, filter))
                            }
                        }
                    }

                    tbody
                    {
                        @for transaction in &page.rows
                        {
                            (transaction_row(transaction))
                        }
                    }
                }

                @if page.total_pages > 1
                {
                    (pagination_controls(page, filter, sort_field, sort_direction))
                }
            }
        }
    }
}

pub(crate) fn dashboard_view(
    session: &Session,
    page: &TransactionPage,
    filter: KindFilter,
    sort_field: SortField,
    sort_direction: SortDirection,
) -> Markup {
    let content = html! {
        header class="w-full border-b border-gray-200 dark:border-gray-700 bg-white dark:bg-gray-800"
        {
            div class="container mx-auto px-4 py-4 flex items-center justify-between"
            {
                div
                {
                    h1 class="text-2xl font-bold tracking-tight" { "Dashboard" }
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Welcome back, " (session.display_name())
                    }
                }

                a href=(endpoints::LOG_OUT) class=(LINK_STYLE) { "Logout" }
            }
        }

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-6"
            {
                div class="grid lg:grid-cols-2 gap-6"
                {
                    (account_card(session))
                    (activation_card(session))
                }

                (transactions_card(page, filter, sort_field, sort_direction))
            }
        }
    };

    base("Dashboard", &content)
}
