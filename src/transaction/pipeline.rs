//! The filter, sort and paginate pipeline behind the dashboard's
//! transaction table.
//!
//! The pipeline is a pure function of its inputs: the dashboard handler
//! re-runs it on every request with the view state parsed from the query
//! string, so the rendered page is always consistent with the URL.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::model::{Transaction, TransactionKind};

/// The fixed number of transactions shown per page.
pub const PAGE_SIZE: usize = 10;

/// The category filter applied before sorting and paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KindFilter {
    /// Keep every transaction.
    #[default]
    All,
    /// Keep only purchases.
    Purchase,
    /// Keep only top-ups.
    #[serde(rename = "Top-up")]
    TopUp,
}

impl KindFilter {
    fn matches(&self, transaction: &Transaction) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Purchase => transaction.kind == TransactionKind::Purchase,
            KindFilter::TopUp => transaction.kind == TransactionKind::TopUp,
        }
    }
}

impl Display for KindFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KindFilter::All => write!(f, "All"),
            KindFilter::Purchase => write!(f, "Purchase"),
            KindFilter::TopUp => write!(f, "Top-up"),
        }
    }
}

/// The column the transaction table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Sort by the transaction date.
    #[default]
    Date,
    /// Sort by category, purchases before top-ups.
    Type,
    /// Sort by the signed amount.
    Amount,
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortField::Date => write!(f, "date"),
            SortField::Type => write!(f, "type"),
            SortField::Amount => write!(f, "amount"),
        }
    }
}

/// The direction the transaction table is sorted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Sort in order of increasing value.
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in order of decreasing value.
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// The sort state a column header link should select.
///
/// Selecting the already active field toggles the direction; selecting a new
/// field starts over in descending order.
pub fn next_sort(
    current_field: SortField,
    current_direction: SortDirection,
    selected_field: SortField,
) -> (SortField, SortDirection) {
    if selected_field == current_field {
        (current_field, current_direction.toggled())
    } else {
        (selected_field, SortDirection::Descending)
    }
}

/// One page of the filtered and sorted transaction list, plus the metadata
/// the pagination controls need.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    /// The rows to display, at most [PAGE_SIZE] of them.
    pub rows: Vec<Transaction>,
    /// The 1-based page number after clamping.
    pub page: usize,
    /// The number of pages, at least 1 even for an empty list.
    pub total_pages: usize,
    /// How many transactions survived the filter.
    pub total_count: usize,
}

/// Run the list pipeline: filter by category, sort by the chosen field and
/// direction, then cut out the requested page.
///
/// The sort is stable and descending is exactly the reversed ascending
/// comparator, so rows with equal keys keep their input order either way.
/// `page` is 1-based and clamped into `[1, total_pages]`, so out-of-range
/// requests return the nearest page rather than an error.
pub fn apply(
    transactions: &[Transaction],
    filter: KindFilter,
    sort_field: SortField,
    sort_direction: SortDirection,
    page: usize,
) -> TransactionPage {
    let mut filtered: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| {
        let ordering = match sort_field {
            SortField::Date => a.date.cmp(&b.date),
            SortField::Type => a.kind.cmp(&b.kind),
            SortField::Amount => a.amount.total_cmp(&b.amount),
        };

        match sort_direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });

    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total_count);
    let rows = filtered[start..end].to_vec();

    TransactionPage {
        rows,
        page,
        total_pages,
        total_count,
    }
}
