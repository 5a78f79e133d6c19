//! Defines the raw transaction rows, the projected view model and the
//! database queries for transactions.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, account::AccountId};

/// The ID of a transaction.
pub type TransactionId = i64;

/// The category tag the external ledger writes for credits.
///
/// Compared case-insensitively; every other tag is treated as a purchase.
const TOP_UP_TAG: &str = "top up";

/// A ledger row exactly as the external process wrote it.
///
/// Rows are immutable: the web app never creates, updates or deletes them.
/// The amount is kept as raw text because the ledger writes both numbers and
/// numeric strings; [project] is responsible for making sense of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the account this transaction belongs to.
    pub account_id: AccountId,
    /// The category tag, e.g. "Top Up" or "Purchase".
    pub tag: String,
    /// The unsigned amount as raw text.
    pub amount: String,
    /// When the transaction happened.
    pub created_at: OffsetDateTime,
}

/// Whether a transaction took money off the account or added to it.
///
/// The derived ordering (purchases before top-ups) is the total order the
/// dashboard's "Type" column sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money spent; displayed with a negative amount.
    Purchase,
    /// Money added to the account; displayed with a positive amount.
    #[serde(rename = "Top-up")]
    TopUp,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Purchase => write!(f, "Purchase"),
            TransactionKind::TopUp => write!(f, "Top-up"),
        }
    }
}

/// A transaction normalized for display: a signed amount and a typed
/// category instead of the ledger's raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// The amount, positive for top-ups and negative for purchases.
    pub amount: f64,
    /// The category of the transaction.
    pub kind: TransactionKind,
}

/// Project a raw ledger row into its display form.
///
/// The category is decided by comparing the tag case-insensitively against
/// "top up". The amount text is parsed as a float and its magnitude signed
/// by category; anything unparseable or non-finite becomes zero, so this
/// function never fails.
pub fn project(raw: &RawTransaction) -> Transaction {
    let kind = if raw.tag.eq_ignore_ascii_case(TOP_UP_TAG) {
        TransactionKind::TopUp
    } else {
        TransactionKind::Purchase
    };

    let magnitude = match raw.amount.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value.abs(),
        _ => 0.0,
    };

    let amount = match kind {
        TransactionKind::TopUp => magnitude,
        TransactionKind::Purchase => -magnitude,
    };

    Transaction {
        id: raw.id,
        date: raw.created_at,
        amount,
        kind,
    }
}

/// The data needed to record a new ledger row.
///
/// Only used by tests and seeding tools; in production the rows come from
/// the external ledger process.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// The ID of the account this transaction belongs to.
    pub account_id: AccountId,
    /// The category tag.
    pub tag: String,
    /// The unsigned amount as raw text.
    pub amount: String,
    /// When the transaction happened.
    pub created_at: OffsetDateTime,
}

/// Create the `native_transaction` table if it does not already exist.
///
/// # Errors
/// Returns a [rusqlite::Error] if there was an SQL error.
pub(crate) fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS native_transaction (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES native_user(id),
            tag TEXT NOT NULL,
            amount TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_transaction_row(row: &Row) -> Result<RawTransaction, rusqlite::Error> {
    Ok(RawTransaction {
        id: row.get(0)?,
        account_id: AccountId::new(row.get(1)?),
        tag: row.get(2)?,
        amount: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Get all transactions belonging to `account_id`, newest first.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn get_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<RawTransaction>, Error> {
    connection
        // Sort by date, and then ID to keep transaction order stable across refreshes
        .prepare(
            "SELECT id, account_id, tag, amount, created_at FROM native_transaction \
            WHERE account_id = ?1 \
            ORDER BY created_at DESC, id ASC",
        )?
        .query_map([account_id.as_i64()], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Insert a new ledger row and return the stored transaction.
///
/// # Errors
/// Returns an [Error::SqlError] if the row could not be inserted, e.g. when
/// `account_id` does not refer to an account.
pub fn create_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<RawTransaction, Error> {
    connection.execute(
        "INSERT INTO native_transaction (account_id, tag, amount, created_at) \
        VALUES (?1, ?2, ?3, ?4)",
        (
            transaction.account_id.as_i64(),
            &transaction.tag,
            &transaction.amount,
            transaction.created_at,
        ),
    )?;

    Ok(RawTransaction {
        id: connection.last_insert_rowid(),
        account_id: transaction.account_id,
        tag: transaction.tag,
        amount: transaction.amount,
        created_at: transaction.created_at,
    })
}
