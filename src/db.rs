//! Database initialization for the application.

use rusqlite::Connection;

use crate::{
    Error, account::create_account_table, transaction::create_transaction_table,
};

/// Create the tables for the domain models if they do not already exist.
///
/// # Errors
/// Returns an [Error::SqlError] if the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    create_account_table(connection)?;
    create_transaction_table(connection)?;

    Ok(())
}
