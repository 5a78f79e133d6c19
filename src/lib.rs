//! Native Portal is a small web app for managing a prepaid account: log in,
//! view your activation card and transaction history, and change your
//! password.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod dashboard;
mod db;
mod endpoints;
mod html;
mod not_found;
mod pagination;
mod routing;
#[cfg(test)]
mod test_utils;
mod transaction;

pub use account::{Account, AccountId, NewAccount, create_account};
pub use app_state::AppState;
pub use auth::{PasswordHash, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use routing::build_router;

use crate::{html::error_view, not_found::get_404_not_found_response};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email field was left empty.
    #[error("Email is required.")]
    EmptyEmail,

    /// The email does not have the shape `local@domain.tld`.
    #[error("Enter a valid email address.")]
    InvalidEmail,

    /// The password field was left empty.
    #[error("Password is required.")]
    EmptyPassword,

    /// The new password is shorter than the minimum length.
    #[error("New password must be at least 6 characters")]
    PasswordTooShort,

    /// The new password and its confirmation do not match.
    #[error("New passwords do not match")]
    PasswordMismatch,

    /// The new password is the same as the current one.
    #[error("New password must be different from your current password")]
    PasswordUnchanged,

    /// The password did not match the stored credential at log-in.
    #[error("Incorrect password.")]
    InvalidCredentials,

    /// The current password did not match the stored credential when
    /// changing the password.
    #[error("Current password is incorrect.")]
    IncorrectOldPassword,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The session cookie is missing from the cookie jar, or could not be
    /// decoded into a session.
    #[error("no session cookie in the cookie jar")]
    CookieMissing,

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., email) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_view(
                        "Internal Server Error",
                        "500",
                        "Something went wrong",
                        "An unexpected error occurred. Please try again later.",
                    ),
                )
                    .into_response()
            }
        }
    }
}
