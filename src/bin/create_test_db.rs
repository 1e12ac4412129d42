use std::{
    error::Error,
    path::Path,
    process::exit,
    sync::{Arc, Mutex},
};

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use pennywise::{
    AuthBackend, BudgetForm, PasswordHash, PotForm, SqliteAuth, Transaction, add_money_to_pot,
    create_budget, create_pot, create_transaction, initialize_db,
};

const DEMO_EMAIL: &str = "demo@example.com";
const DEMO_PASSWORD: &str = "password";

/// Transactions as (name, amount, days ago, category ID, recurring).
const TRANSACTIONS: [(&str, f64, i64, i64, bool); 18] = [
    ("Emma Richardson", 75.5, 1, 10, false),
    ("Savory Bites Bistro", -55.5, 2, 4, false),
    ("Daniel Carter", -42.3, 3, 10, false),
    ("Sun Park", 120.0, 4, 10, false),
    ("Urban Services Hub", -65.0, 5, 10, false),
    ("Liam Hughes", 65.75, 6, 3, false),
    ("Lily Ramirez", 50.0, 7, 10, false),
    ("Ethan Clark", -32.5, 8, 4, false),
    ("James Thompson", -5.0, 9, 1, false),
    ("Pixel Playground", -10.0, 10, 1, true),
    ("Ella Phillips", -45.0, 11, 4, false),
    ("Sofia Peterson", -15.0, 12, 5, false),
    ("Mason Martinez", -35.25, 13, 8, false),
    ("Green Plate Eatery", -78.5, 14, 3, false),
    ("Spark Electric Solutions", -100.0, 15, 2, true),
    ("Rina Sato", -50.0, 16, 2, false),
    ("Swift Ride Share", -18.75, 17, 5, false),
    ("Employer Ltd", 3814.25, 20, 10, true),
];

/// Pots as (name, target, theme, amount to add).
const POTS: [(&str, &str, &str, f64); 4] = [
    ("Savings", "2000", "green", 159.0),
    ("Concert Ticket", "150", "navy", 110.0),
    ("Gift", "150", "cyan", 40.0),
    ("New Laptop", "1000", "yellow", 10.0),
];

/// Budgets as (category ID, maximum, theme).
const BUDGETS: [(&str, &str, &str); 4] = [
    ("1", "50", "green"),
    ("2", "750", "cyan"),
    ("4", "75", "yellow"),
    ("6", "100", "navy"),
];

/// A utility for creating a demo database for the pennywise server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;
    initialize_db(&conn)?;

    let conn = Arc::new(Mutex::new(conn));
    let auth = SqliteAuth::new(conn.clone(), PasswordHash::DEFAULT_COST);

    println!("Creating demo user {DEMO_EMAIL} with the password '{DEMO_PASSWORD}'...");
    let user = auth.sign_up(DEMO_EMAIL, DEMO_PASSWORD, "Demo User")?.user;

    let conn = conn.lock().map_err(|_| "Could not lock the database connection")?;

    println!("Creating transactions...");
    let now = OffsetDateTime::now_utc();
    for (name, amount, days_ago, category_id, recurring) in TRANSACTIONS {
        let transaction = Transaction::build(name, amount, now - Duration::days(days_ago), category_id)
            .recurring(recurring);
        create_transaction(user.id, &transaction, &conn)?;
    }

    println!("Creating pots...");
    for (name, target, theme, amount) in POTS {
        let pot = create_pot(
            user.id,
            &PotForm {
                name: name.to_owned(),
                target: target.to_owned(),
                theme: theme.to_owned(),
            },
            &conn,
        )?;

        let result = add_money_to_pot(user.id, pot.id, amount, &conn)?;
        if !result.success {
            eprintln!("Could not add money to {name}: {:?}", result.error);
        }
    }

    println!("Creating budgets...");
    for (category_id, maximum, theme) in BUDGETS {
        create_budget(
            user.id,
            &BudgetForm {
                category_id: category_id.to_owned(),
                maximum: maximum.to_owned(),
                theme: theme.to_owned(),
            },
            &conn,
        )?;
    }

    println!("Success!");

    Ok(())
}
