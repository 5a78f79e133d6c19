//! The change-password page and endpoint.
//!
//! The flow is a single linear pass: validate the form locally, look the
//! account up, check the current password, then persist the new hash. The
//! first failing step produces the response; nothing is retried.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::{get_account_by_email, is_valid_email, normalize_email, update_account_password},
    auth::{PasswordHash, ValidatedPassword},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, auth_panel, base, email_input, loading_spinner, password_input,
    },
};

use super::log_in::NO_ACCOUNT_ERROR_MSG;

/// Field-level error messages for the change-password form.
#[derive(Debug, Default)]
struct ChangePasswordFormErrors {
    email: Option<String>,
    old_password: Option<String>,
    new_password: Option<String>,
    confirm_password: Option<String>,
    form: Option<String>,
}

fn change_password_form(email: &str, errors: &ChangePasswordFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::CHANGE_PASSWORD_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #old_password, #new_password, #confirm_password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            (email_input(email, errors.email.as_deref()))
            (password_input("Current Password", "old_password", errors.old_password.as_deref()))
            (password_input("New Password", "new_password", errors.new_password.as_deref()))
            (password_input("Confirm New Password", "confirm_password", errors.confirm_password.as_deref()))

            @if let Some(form_error) = &errors.form
            {
                div class="text-sm text-red-600 bg-red-50 dark:bg-red-900/20 border
                    border-red-200 dark:border-red-800 rounded-lg p-3"
                {
                    (form_error)
                }
            }

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Update Password"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Remembered your password? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Back to log in"
                }
            }
        }
    }
}

/// The panel swapped in for the form after a successful change. It navigates
/// back to the log-in page after a short delay.
fn success_panel() -> Markup {
    html! {
        div
            class="text-center space-y-4"
            hx-get=(endpoints::LOG_IN_VIEW)
            hx-trigger="load delay:2s"
            hx-target="body"
            hx-push-url="true"
        {
            h2 class="text-2xl font-bold text-gray-900 dark:text-white" { "Password Changed!" }

            p class="text-gray-500 dark:text-gray-400"
            {
                "Your password has been successfully updated. Redirecting to login..."
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                    "Back to log in"
                }
            }
        }
    }
}

/// Display the change-password page.
pub async fn get_change_password_page() -> Response {
    let form = change_password_form("", &ChangePasswordFormErrors::default());
    let content = auth_panel("Change Password", &form);
    base("Change Password", &content).into_response()
}

/// The state needed to change an account password.
#[derive(Debug, Clone)]
pub struct ChangePasswordState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChangePasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw data entered by the user in the change-password form.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChangePasswordData {
    /// The email of the account whose password should change.
    pub email: String,
    /// The current password.
    pub old_password: String,
    /// The replacement password.
    pub new_password: String,
    /// The replacement password, entered a second time.
    pub confirm_password: String,
}

/// Validate the form, re-verify the current password and persist the new one.
///
/// All validation runs before the account lookup, so malformed input never
/// reaches the database.
///
/// # Errors
/// Returns:
/// - [Error::EmptyEmail], [Error::InvalidEmail], [Error::EmptyPassword],
///   [Error::PasswordTooShort], [Error::PasswordMismatch] or
///   [Error::PasswordUnchanged] if the input fails validation.
/// - [Error::NotFound] if no account is registered under the email.
/// - [Error::IncorrectOldPassword] if the current password does not match.
/// - [Error::HashingError] if the password could not be verified or hashed.
/// - [Error::SqlError] if there was an unexpected SQL error.
pub(crate) fn change_password(
    data: &ChangePasswordData,
    connection: &Connection,
) -> Result<(), Error> {
    let email = normalize_email(&data.email);

    if email.is_empty() {
        return Err(Error::EmptyEmail);
    }

    if !is_valid_email(&email) {
        return Err(Error::InvalidEmail);
    }

    if data.old_password.trim().is_empty() {
        return Err(Error::EmptyPassword);
    }

    if data.new_password != data.confirm_password {
        return Err(Error::PasswordMismatch);
    }

    let validated_password = ValidatedPassword::new(&data.new_password)?;

    if data.new_password == data.old_password {
        return Err(Error::PasswordUnchanged);
    }

    let account = get_account_by_email(&email, connection)?;

    match account.password_hash.verify(&data.old_password) {
        Ok(true) => {}
        Ok(false) => return Err(Error::IncorrectOldPassword),
        Err(error) => return Err(Error::HashingError(error.to_string())),
    }

    let new_hash = PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST)?;

    update_account_password(account.id, &new_hash, connection)
}

const INTERNAL_ERROR_MSG: &str = "Something went wrong. Please try again.";

/// Handler for change-password requests via the POST method.
///
/// On success the form is replaced by a confirmation panel that navigates
/// back to the log-in page. Otherwise, the form is returned with an error
/// message next to the field that caused the problem.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn post_change_password(
    State(state): State<ChangePasswordState>,
    Form(form_data): Form<ChangePasswordData>,
) -> Response {
    let result = change_password(
        &form_data,
        &state
            .db_connection
            .lock()
            .expect("Could not acquire database lock"),
    );

    let email = &form_data.email;

    let errors = match result {
        Ok(()) => return success_panel().into_response(),
        Err(error @ (Error::EmptyEmail | Error::InvalidEmail)) => ChangePasswordFormErrors {
            email: Some(error.to_string()),
            ..Default::default()
        },
        Err(error @ (Error::EmptyPassword | Error::IncorrectOldPassword)) => {
            ChangePasswordFormErrors {
                old_password: Some(error.to_string()),
                ..Default::default()
            }
        }
        Err(error @ (Error::PasswordTooShort | Error::PasswordUnchanged)) => {
            ChangePasswordFormErrors {
                new_password: Some(error.to_string()),
                ..Default::default()
            }
        }
        Err(error @ Error::PasswordMismatch) => ChangePasswordFormErrors {
            confirm_password: Some(error.to_string()),
            ..Default::default()
        },
        Err(Error::NotFound) => ChangePasswordFormErrors {
            form: Some(NO_ACCOUNT_ERROR_MSG.to_owned()),
            ..Default::default()
        },
        Err(error) => {
            tracing::error!("Unhandled error while changing password: {error}");
            ChangePasswordFormErrors {
                form: Some(INTERNAL_ERROR_MSG.to_owned()),
                ..Default::default()
            }
        }
    };

    change_password_form(email, &errors).into_response()
}

#[cfg(test)]
mod change_password_tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash,
        account::{NewAccount, create_account, get_account_by_email},
        db::initialize,
    };

    use super::{ChangePasswordData, change_password};

    fn form(email: &str, old: &str, new: &str, confirm: &str) -> ChangePasswordData {
        ChangePasswordData {
            email: email.to_owned(),
            old_password: old.to_owned(),
            new_password: new.to_owned(),
            confirm_password: confirm.to_owned(),
        }
    }

    fn get_connection_with_account(email: &str, password: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        create_account(
            NewAccount {
                fname: None,
                lname: None,
                email: email.to_owned(),
                phone: None,
                nic: None,
                amount: None,
                card_url: None,
                password_hash: PasswordHash::from_raw_password(password, 4).unwrap(),
            },
            &conn,
        )
        .expect("Could not create test account");

        conn
    }

    #[test]
    fn change_password_persists_the_new_credential() {
        let conn = get_connection_with_account("a@b.com", "old password");

        change_password(&form("a@b.com", "old password", "new password 1", "new password 1"), &conn)
            .expect("Expected the password change to succeed");

        let account = get_account_by_email("a@b.com", &conn).unwrap();
        assert!(account.password_hash.verify("new password 1").unwrap());
        assert!(!account.password_hash.verify("old password").unwrap());
    }

    #[test]
    fn change_password_rejects_wrong_old_password() {
        let conn = get_connection_with_account("a@b.com", "old password");

        let got = change_password(
            &form("a@b.com", "not the old password", "new password 1", "new password 1"),
            &conn,
        );

        assert_eq!(got, Err(Error::IncorrectOldPassword));

        let account = get_account_by_email("a@b.com", &conn).unwrap();
        assert!(
            account.password_hash.verify("old password").unwrap(),
            "the stored credential must be unchanged after a failed attempt"
        );
    }

    #[test]
    fn change_password_rejects_unknown_account() {
        let conn = get_connection_with_account("a@b.com", "old password");

        let got = change_password(
            &form("nobody@b.com", "old password", "new password 1", "new password 1"),
            &conn,
        );

        assert_eq!(got, Err(Error::NotFound));
    }

    // The validation tests below run against a connection with no tables:
    // if validation did not short-circuit before the lookup, the queries
    // would fail with an SQL error instead.

    #[test]
    fn change_password_rejects_mismatched_confirmation_before_lookup() {
        let conn = Connection::open_in_memory().unwrap();

        let got = change_password(&form("a@b.com", "old password", "abcdef", "xyzdef"), &conn);

        assert_eq!(got, Err(Error::PasswordMismatch));
    }

    #[test]
    fn change_password_rejects_short_new_password_before_lookup() {
        let conn = Connection::open_in_memory().unwrap();

        let got = change_password(&form("a@b.com", "old password", "abc", "abc"), &conn);

        assert_eq!(got, Err(Error::PasswordTooShort));
    }

    #[test]
    fn change_password_rejects_reused_password_before_lookup() {
        let conn = Connection::open_in_memory().unwrap();

        let got = change_password(
            &form("a@b.com", "same password", "same password", "same password"),
            &conn,
        );

        assert_eq!(got, Err(Error::PasswordUnchanged));
    }

    #[test]
    fn change_password_rejects_malformed_email_before_lookup() {
        let conn = Connection::open_in_memory().unwrap();

        let got = change_password(
            &form("not-an-email", "old password", "new password 1", "new password 1"),
            &conn,
        );

        assert_eq!(got, Err(Error::InvalidEmail));
    }

    #[test]
    fn change_password_rejects_empty_old_password_before_lookup() {
        let conn = Connection::open_in_memory().unwrap();

        let got = change_password(&form("a@b.com", " ", "new password 1", "new password 1"), &conn);

        assert_eq!(got, Err(Error::EmptyPassword));
    }
}
