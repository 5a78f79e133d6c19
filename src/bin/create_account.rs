use std::{error::Error, io, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use native_portal::{NewAccount, PasswordHash, ValidatedPassword, create_account, initialize_db};

/// A utility for registering a new account in the portal database.
///
/// The web app never creates accounts itself, so this tool plays the role of
/// the external registration process.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. Created if it does not exist.
    #[arg(long)]
    db_path: String,

    /// The email the account holder will log in with.
    #[arg(long)]
    email: String,

    /// The account holder's first name.
    #[arg(long)]
    fname: Option<String>,

    /// The account holder's last name.
    #[arg(long)]
    lname: Option<String>,

    /// The account holder's phone number.
    #[arg(long)]
    phone: Option<String>,

    /// The account holder's national ID.
    #[arg(long)]
    nic: Option<String>,

    /// A URL to the account's activation card image.
    #[arg(long)]
    card_url: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let conn = Connection::open(db_path)
        .unwrap_or_else(|_| panic!("Could not open the database at {db_path:?}"));
    initialize_db(&conn)?;

    println!("Creating account for {}", args.email);

    let password_hash = match get_password_hash() {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    let account = create_account(
        NewAccount {
            fname: args.fname,
            lname: args.lname,
            email: args.email,
            phone: args.phone,
            nic: args.nic,
            amount: None,
            card_url: args.card_url,
            password_hash,
        },
        &conn,
    )?;

    println!(
        "Created account {} for {} ({})",
        account.id,
        account.display_name(),
        account.email
    );

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }
}

fn get_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = match rpassword::prompt_password("Enter a password: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if let Err(error) = ValidatedPassword::new(&first_password) {
            print_error(error);
            continue;
        }

        let second_password = match rpassword::prompt_password("Enter the same password again: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        let password_hash =
            match PasswordHash::from_raw_password(&first_password, PasswordHash::DEFAULT_COST) {
                Ok(password_hash) => password_hash,
                Err(error) => {
                    print_error(format!("Could not hash password: {error}. Try again."));
                    continue;
                }
            };

        return Some(password_hash);
    }
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string())
}
