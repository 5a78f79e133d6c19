//! The account model (the `native_user` table), credential verification and
//! the queries the web app runs against accounts.
//!
//! Accounts are created externally (see the `create_account` binary); the
//! web app only reads them, except for the credential field which the
//! change-password flow updates.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::PasswordHash};

/// The ID of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(i64);

impl AccountId {
    /// Create a new account ID.
    ///
    /// The caller should ensure that `id` refers to an existing account.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The ID as an integer, e.g. for use in SQL query parameters.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered account holder.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// When the account was created.
    pub created_at: OffsetDateTime,
    /// The account holder's first name.
    pub fname: Option<String>,
    /// The account holder's last name.
    pub lname: Option<String>,
    /// The email used to log in. Stored trimmed and lowercased.
    pub email: String,
    /// The account holder's phone number. Not used by the web app.
    pub phone: Option<String>,
    /// The account holder's national ID. Not used by the web app.
    pub nic: Option<String>,
    /// The prepaid balance as recorded by the external ledger, kept as raw
    /// text since the ledger writes both numbers and numeric strings.
    pub amount: Option<String>,
    /// A URL to the account's activation card image.
    pub card_url: Option<String>,
    /// The salted and hashed log-in password.
    pub password_hash: PasswordHash,
}

impl Account {
    /// The name to greet the account holder with.
    ///
    /// Uses the first/last name when present, otherwise falls back to the
    /// email's local part with its first letter upper-cased.
    pub fn display_name(&self) -> String {
        derive_display_name(self.fname.as_deref(), self.lname.as_deref(), &self.email)
    }
}

/// The data needed to create a new account row.
///
/// Only used by the admin tooling and tests; the web app never creates
/// accounts.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// The account holder's first name.
    pub fname: Option<String>,
    /// The account holder's last name.
    pub lname: Option<String>,
    /// The email used to log in.
    pub email: String,
    /// The account holder's phone number.
    pub phone: Option<String>,
    /// The account holder's national ID.
    pub nic: Option<String>,
    /// The prepaid balance as raw text.
    pub amount: Option<String>,
    /// A URL to the account's activation card image.
    pub card_url: Option<String>,
    /// The salted and hashed log-in password.
    pub password_hash: PasswordHash,
}

/// Create the `native_user` table if it does not already exist.
///
/// # Errors
/// Returns a [rusqlite::Error] if there was an SQL error.
pub(crate) fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS native_user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            fname TEXT,
            lname TEXT,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            nic TEXT,
            amount TEXT,
            card_url TEXT,
            password TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Normalize an email for storage and comparison: trim whitespace and
/// lowercase.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email_part(part: &str) -> bool {
    !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || c == '@')
}

/// Check that an email has the shape `local@domain.tld`.
///
/// The local part and the domain segments around the final dot must be
/// non-empty and free of whitespace and further '@' characters. This is the
/// same shape check the log-in form applies client side.
pub(crate) fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => match domain.rsplit_once('.') {
            Some((host, tld)) => {
                is_valid_email_part(local) && is_valid_email_part(host) && is_valid_email_part(tld)
            }
            None => false,
        },
        None => false,
    }
}

fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let raw_password_hash: String = row.get(9)?;

    Ok(Account {
        id: AccountId::new(row.get(0)?),
        created_at: row.get(1)?,
        fname: row.get(2)?,
        lname: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        nic: row.get(6)?,
        amount: row.get(7)?,
        card_url: row.get(8)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, created_at, fname, lname, email, phone, nic, amount, card_url, password";

/// Look up the account registered under `email`.
///
/// The email is normalized (trimmed and lowercased) before the lookup, so
/// callers may pass the raw form input.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if no account is registered under `email`.
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn get_account_by_email(email: &str, connection: &Connection) -> Result<Account, Error> {
    let email = normalize_email(email);

    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM native_user WHERE email = ?1"
        ))?
        .query_row([email], map_account_row)
        .map_err(|error| error.into())
}

/// Insert a new account row and return the stored account.
///
/// The email is normalized before it is stored.
///
/// # Errors
/// Returns an [Error::SqlError] if the row could not be inserted, e.g. when
/// the email is already registered.
pub fn create_account(account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    let created_at = OffsetDateTime::now_utc();
    let email = normalize_email(&account.email);

    connection.execute(
        "INSERT INTO native_user (created_at, fname, lname, email, phone, nic, amount, card_url, password) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            created_at,
            &account.fname,
            &account.lname,
            &email,
            &account.phone,
            &account.nic,
            &account.amount,
            &account.card_url,
            account.password_hash.to_string(),
        ),
    )?;

    Ok(Account {
        id: AccountId::new(connection.last_insert_rowid()),
        created_at,
        fname: account.fname,
        lname: account.lname,
        email,
        phone: account.phone,
        nic: account.nic,
        amount: account.amount,
        card_url: account.card_url,
        password_hash: account.password_hash,
    })
}

/// Store a new password hash for the account with `account_id`.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if there is no account with `account_id`.
/// - [Error::SqlError] if there was an unexpected SQL error.
pub(crate) fn update_account_password(
    account_id: AccountId,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE native_user SET password = ?1 WHERE id = ?2",
        (password_hash.to_string(), account_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Check an email/password pair against the registered accounts.
///
/// Input validation happens before any query runs: an empty or malformed
/// email and an empty password are rejected locally.
///
/// This function only reads from the database, so it is safe to retry.
///
/// # Errors
/// Returns:
/// - [Error::EmptyEmail], [Error::InvalidEmail] or [Error::EmptyPassword]
///   if the input fails validation.
/// - [Error::NotFound] if no account is registered under `email`.
/// - [Error::InvalidCredentials] if the password does not match.
/// - [Error::HashingError] if the password could not be verified.
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn verify_credentials(
    email: &str,
    password: &str,
    connection: &Connection,
) -> Result<Account, Error> {
    let email = normalize_email(email);

    if email.is_empty() {
        return Err(Error::EmptyEmail);
    }

    if !is_valid_email(&email) {
        return Err(Error::InvalidEmail);
    }

    if password.trim().is_empty() {
        return Err(Error::EmptyPassword);
    }

    let account = get_account_by_email(&email, connection)?;

    match account.password_hash.verify(password) {
        Ok(true) => Ok(account),
        Ok(false) => Err(Error::InvalidCredentials),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

/// Derive the name to display for an account.
///
/// "fname lname" when both are present, either alone when only one is, and
/// otherwise the email's local part with its first letter upper-cased (e.g.
/// "jane@example.com" becomes "Jane").
pub(crate) fn derive_display_name(
    fname: Option<&str>,
    lname: Option<&str>,
    email: &str,
) -> String {
    let fname = fname.map(str::trim).filter(|name| !name.is_empty());
    let lname = lname.map(str::trim).filter(|name| !name.is_empty());

    match (fname, lname) {
        (Some(fname), Some(lname)) => format!("{fname} {lname}"),
        (Some(fname), None) => fname.to_owned(),
        (None, Some(lname)) => lname.to_owned(),
        (None, None) => {
            let local_part = email.split('@').next().unwrap_or_default();
            let mut chars = local_part.chars();

            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}
