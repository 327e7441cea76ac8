use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use ledger_core::{
    CategoryId, initialize_db,
    account::{AccountName, NewAccount, create_account},
    category::{CategoryName, NewCategory, create_category},
    store::in_unit_of_work,
};

/// A utility for creating and populating a ledger database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    db_path: String,

    /// File path to a JSON file describing the accounts and categories to create.
    #[arg(long, short)]
    seed_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Seed {
    accounts: Vec<SeedAccount>,
    categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
struct SeedAccount {
    name: String,
    #[serde(rename = "type")]
    account_type: String,
    #[serde(default)]
    balance: f64,
}

#[derive(Debug, Deserialize)]
struct SeedCategory {
    name: String,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    children: Vec<SeedCategory>,
}

/// Create and optionally populate a ledger database.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let db_path = Path::new(&args.db_path);

    if db_path.exists() {
        eprintln!("File already exists at {db_path:#?}!");
        exit(1);
    }

    let seed = match &args.seed_path {
        Some(seed_path) => serde_json::from_str(&fs::read_to_string(seed_path)?)?,
        None => Seed::default(),
    };

    println!("Creating database at {db_path:#?}");
    let conn = Connection::open(db_path)?;

    initialize_db(&conn)?;

    println!(
        "Creating {} accounts and {} top level categories...",
        seed.accounts.len(),
        seed.categories.len()
    );
    apply_seed(&seed, &conn)?;

    println!("Success!");

    Ok(())
}

fn apply_seed(seed: &Seed, conn: &Connection) -> Result<(), ledger_core::Error> {
    in_unit_of_work(conn, |conn| {
        for account in &seed.accounts {
            let account = create_account(
                NewAccount {
                    name: AccountName::new(&account.name)?,
                    account_type: account.account_type.clone(),
                    opening_balance: account.balance,
                },
                conn,
            )?;
            tracing::debug!(account_id = account.id, "seeded account {}", account.name);
        }

        for category in &seed.categories {
            create_category_tree(category, None, conn)?;
        }

        Ok(())
    })
}

fn create_category_tree(
    category: &SeedCategory,
    parent_id: Option<CategoryId>,
    conn: &Connection,
) -> Result<(), ledger_core::Error> {
    let created = create_category(
        NewCategory {
            name: CategoryName::new(&category.name)?,
            parent_id,
            amount: category.amount,
        },
        conn,
    )?;
    tracing::debug!(category_id = created.id, "seeded category {}", created.name);

    for child in &category.children {
        create_category_tree(child, Some(created.id), conn)?;
    }

    Ok(())
}
