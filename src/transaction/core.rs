//! Defines the core data models and table for transactions.

use rusqlite::{Connection, Row, types::Value};
use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};

use crate::{
    database_id::{AccountId, CategoryId, TransactionId},
    store::{Fields, Record, Store},
};

// ============================================================================
// MODELS
// ============================================================================

/// The table transactions are stored in.
pub const TRANSACTION_TABLE: &str = "transactions";

/// Money leaving an account, either spent against a category or moved to
/// another account.
///
/// To post a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money came out of.
    pub account_id: AccountId,
    /// The category the money was spent against.
    pub category_id: Option<CategoryId>,
    /// Who was paid.
    pub payee: Option<String>,
    /// A free text note.
    pub memo: Option<String>,
    /// The amount of money that left the account.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// The account the money went to, for transfers between accounts.
    pub transfer_account_id: Option<AccountId>,
    /// When the transaction was recorded (UTC).
    pub created_at: PrimitiveDateTime,
    /// When the transaction was last changed (UTC).
    pub updated_at: PrimitiveDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(account_id: AccountId, amount: f64, date: Date) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            amount,
            date,
            category_id: None,
            payee: None,
            memo: None,
            transfer_account_id: None,
        }
    }
}

impl Record for Transaction {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "account_id",
        "category_id",
        "payee",
        "memo",
        "amount",
        "date",
        "transfer_account_id",
        "created_at",
        "updated_at",
    ];
    const WRITABLE_COLUMNS: &'static [&'static str] = &[
        "account_id",
        "category_id",
        "payee",
        "memo",
        "amount",
        "date",
        "transfer_account_id",
    ];

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            category_id: row.get(2)?,
            payee: row.get(3)?,
            memo: row.get(4)?,
            amount: row.get(5)?,
            date: row.get(6)?,
            transfer_account_id: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

/// A builder for posting [Transaction]s.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// use crate::transaction::{Transaction, post_transaction};
///
/// let builder = Transaction::build(1, 45.99, date!(2025 - 01 - 15))
///     .category_id(Some(3))
///     .payee(Some("Corner Cafe".to_owned()));
/// let id = post_transaction(builder, &connection)?;
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The account the money comes out of.
    pub account_id: AccountId,

    /// The amount of money that leaves the account.
    ///
    /// Posting subtracts this from the account balance and from the
    /// category amount. A negative amount (e.g. a refund) adds money back.
    pub amount: f64,

    /// The date when the transaction occurred.
    pub date: Date,

    /// The category to spend against. Required unless the transaction is a
    /// transfer.
    pub category_id: Option<CategoryId>,

    /// Who was paid.
    pub payee: Option<String>,

    /// A free text note.
    pub memo: Option<String>,

    /// The account that receives the money in a transfer.
    ///
    /// Posting adds `amount` to this account's balance.
    pub transfer_account_id: Option<AccountId>,
}

impl TransactionBuilder {
    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the payee for the transaction.
    pub fn payee(mut self, payee: Option<String>) -> Self {
        self.payee = payee;
        self
    }

    /// Set the memo for the transaction.
    pub fn memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo;
        self
    }

    /// Make the transaction a transfer into `transfer_account_id`.
    pub fn transfer_account_id(mut self, transfer_account_id: Option<AccountId>) -> Self {
        self.transfer_account_id = transfer_account_id;
        self
    }

    pub(super) fn to_fields(&self) -> Fields {
        Fields::new()
            .set("account_id", self.account_id)
            .set("category_id", self.category_id)
            .set("payee", self.payee.clone())
            .set("memo", self.memo.clone())
            .set("amount", self.amount)
            .set("date", date_value(self.date))
            .set("transfer_account_id", self.transfer_account_id)
    }
}

/// Dates are stored as `YYYY-MM-DD` text.
pub(super) fn date_value(date: Date) -> Value {
    Value::Text(date.to_string())
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The record store for transactions.
pub fn transaction_store(connection: &Connection) -> Store<'_, Transaction> {
    Store::new(connection, TRANSACTION_TABLE, "id")
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                category_id INTEGER,
                payee TEXT,
                memo TEXT,
                amount REAL NOT NULL,
                date TEXT NOT NULL,
                transfer_account_id INTEGER,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(account_id) REFERENCES accounts(id) ON UPDATE CASCADE,
                FOREIGN KEY(category_id) REFERENCES categories(id) ON UPDATE CASCADE ON DELETE SET NULL,
                FOREIGN KEY(transfer_account_id) REFERENCES accounts(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Add composite index used when listing an account's transactions by date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions(account_id, date);",
        (),
    )?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
