//! Defines the account model, its table and the account operations.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::{
    Error,
    database_id::AccountId,
    store::{Fields, ListOptions, Record, Store},
};

/// The table accounts are stored in.
pub const ACCOUNT_TABLE: &str = "accounts";

/// The name of an account, e.g. 'Everyday' or 'Credit Card'.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountName(String);

impl AccountName {
    /// Create an account name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyAccountName] if `name` is empty or just whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyAccountName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create an account name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for AccountName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bank account, credit card or cash wallet that money is spent from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The name of the account.
    pub name: AccountName,
    /// The kind of account, e.g. "checking", "savings" or "credit".
    #[serde(rename = "type")]
    pub account_type: String,
    /// The balance.
    ///
    /// Only changed by posting and voiding transactions.
    pub balance: f64,
    /// When the account was created (UTC).
    pub created_at: PrimitiveDateTime,
    /// When the account was last changed (UTC).
    pub updated_at: PrimitiveDateTime,
}

impl Record for Account {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "type",
        "balance",
        "created_at",
        "updated_at",
    ];
    const WRITABLE_COLUMNS: &'static [&'static str] = &["name", "type", "balance"];

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let raw_name: String = row.get(1)?;

        Ok(Self {
            id: row.get(0)?,
            name: AccountName::new_unchecked(&raw_name),
            account_type: row.get(2)?,
            balance: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

/// The data needed to open an account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The name of the account.
    pub name: AccountName,
    /// The kind of account.
    pub account_type: String,
    /// The balance the account starts with.
    pub opening_balance: f64,
}

/// The changes to make to an account. `None` leaves a field as it is.
///
/// The balance cannot be set here, it only follows posted transactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountUpdate {
    /// The new name.
    pub name: Option<AccountName>,
    /// The new kind of account.
    pub account_type: Option<String>,
}

/// The record store for accounts.
pub fn account_store(connection: &Connection) -> Store<'_, Account> {
    Store::new(connection, ACCOUNT_TABLE, "id")
}

/// Create the account table.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'checking',
            balance REAL NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        (),
    )?;

    Ok(())
}

/// Create an account and return it.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn create_account(account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    let store = account_store(connection);
    let fields = Fields::new()
        .set("name", account.name.as_ref().to_owned())
        .set("type", account.account_type)
        .set("balance", account.opening_balance);

    let id = store.create(&fields)?;

    store.get_by_id(id)
}

/// Retrieve a single live account by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `account_id` does not refer to a live account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_account(account_id: AccountId, connection: &Connection) -> Result<Account, Error> {
    account_store(connection).get_by_id(account_id)
}

/// Retrieve the live accounts selected by `options`.
///
/// # Errors
/// This function will return an error if `options` refers to an unknown
/// column or if there is an SQL error.
pub fn list_accounts(options: &ListOptions, connection: &Connection) -> Result<Vec<Account>, Error> {
    account_store(connection).list(options)
}

/// Apply `update` to the live account `account_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn update_account(
    account_id: AccountId,
    update: AccountUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    let fields = Fields::new()
        .set_if_some("name", update.name.map(|name| name.as_ref().to_owned()))
        .set_if_some("type", update.account_type);

    account_store(connection).update(account_id, &fields)
}

/// Soft delete an account. Its transactions are kept.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn delete_account(account_id: AccountId, connection: &Connection) -> Result<(), Error> {
    account_store(connection).soft_delete(account_id)
}

/// Get the total balance across all live accounts.
///
/// # Errors
/// Returns [Error] if:
/// - Database connection fails
/// - SQL query preparation or execution fails
pub fn get_total_account_balance(connection: &Connection) -> Result<f64, Error> {
    let mut stmt =
        connection.prepare("SELECT COALESCE(SUM(balance), 0) FROM accounts WHERE is_deleted = 0")?;

    let total: f64 = stmt.query_row([], |row| row.get(0))?;

    Ok(total)
}

/// Add `delta` to the balance of the live account `account_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAccount] if `account_id` does not refer to a live account,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn adjust_account_balance(
    account_id: AccountId,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE accounts SET balance = balance + ?1, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2 AND is_deleted = 0",
        (delta, account_id),
    )?;

    if rows_affected == 0 {
        tracing::warn!(account_id, delta, "tried to adjust an account that is not live");
        return Err(Error::InvalidAccount(account_id));
    }

    tracing::debug!(account_id, delta, "account balance adjusted");

    Ok(())
}


#[cfg(test)]
mod account_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        account::{
            AccountName, AccountUpdate, NewAccount, adjust_account_balance, create_account,
            delete_account, get_account, list_accounts, update_account,
        },
        db::initialize,
        store::{ListOptions, SortOrder},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn new_account(name: &str, balance: f64) -> NewAccount {
        NewAccount {
            name: AccountName::new_unchecked(name),
            account_type: "checking".to_owned(),
            opening_balance: balance,
        }
    }

    #[test]
    fn account_name_rejects_whitespace() {
        assert_eq!(AccountName::new(" \t"), Err(Error::EmptyAccountName));
    }

    #[test]
    fn create_account_succeeds() {
        let conn = get_test_connection();

        let account = create_account(new_account("Everyday", 100.5), &conn).unwrap();

        assert!(account.id > 0);
        assert_eq!(account.name, AccountName::new_unchecked("Everyday"));
        assert_eq!(account.account_type, "checking");
        assert_eq!(account.balance, 100.5);
        assert_eq!(get_account(account.id, &conn), Ok(account));
    }

    #[test]
    fn list_accounts_sorted_by_name() {
        let conn = get_test_connection();
        create_account(new_account("Savings", 0.0), &conn).unwrap();
        create_account(new_account("Everyday", 0.0), &conn).unwrap();

        let accounts = list_accounts(
            &ListOptions::default().order_by("name", SortOrder::Ascending),
            &conn,
        )
        .unwrap();

        let names: Vec<String> = accounts.iter().map(|a| a.name.to_string()).collect();
        assert_eq!(names, vec!["Everyday", "Savings"]);
    }

    #[test]
    fn update_account_leaves_balance_alone() {
        let conn = get_test_connection();
        let account = create_account(new_account("Everyday", 42.0), &conn).unwrap();

        update_account(
            account.id,
            AccountUpdate {
                name: Some(AccountName::new_unchecked("Daily")),
                account_type: Some("savings".to_owned()),
            },
            &conn,
        )
        .unwrap();

        let updated = get_account(account.id, &conn).unwrap();
        assert_eq!(updated.name, AccountName::new_unchecked("Daily"));
        assert_eq!(updated.account_type, "savings");
        assert_eq!(updated.balance, 42.0);
    }

    #[test]
    fn delete_account_hides_account() {
        let conn = get_test_connection();
        let account = create_account(new_account("Everyday", 0.0), &conn).unwrap();

        delete_account(account.id, &conn).unwrap();

        assert_eq!(get_account(account.id, &conn), Err(Error::NotFound));
        assert_eq!(list_accounts(&ListOptions::default(), &conn), Ok(vec![]));
    }

    #[test]
    fn adjust_balance_of_missing_account_fails() {
        let conn = get_test_connection();

        assert_eq!(
            adjust_account_balance(7, 10.0, &conn),
            Err(Error::InvalidAccount(7))
        );
    }
}
