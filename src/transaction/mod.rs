//! Transactions: the raw ledger rows (the `native_transaction` table), the
//! projection into signed view-model rows and the filter/sort/paginate
//! pipeline that feeds the dashboard table.

mod model;
mod pipeline;

pub use model::{
    NewTransaction, RawTransaction, Transaction, TransactionId, TransactionKind,
    create_transaction, get_transactions_for_account, project,
};
pub(crate) use model::create_transaction_table;
pub use pipeline::{
    KindFilter, PAGE_SIZE, SortDirection, SortField, TransactionPage, apply, next_sort,
};
