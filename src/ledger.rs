//! A shareable handle to the ledger database.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::Connection;

use crate::{Error, db::initialize};

/// Owns the database connection and hands it out one caller at a time.
///
/// Cloning a `Ledger` is cheap, every clone shares the same connection.
#[derive(Debug, Clone)]
pub struct Ledger {
    connection: Arc<Mutex<Connection>>,
}

impl Ledger {
    /// Create a new [Ledger] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Open (or create) the database file at `path` and initialize it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::info!("opening ledger at {}", path.display());

        Self::new(Connection::open(path)?)
    }

    /// Lock the connection for exclusive use.
    ///
    /// # Errors
    /// Returns [Error::DatabaseLockError] if another thread panicked while
    /// holding the lock.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        account::{AccountName, NewAccount, create_account, get_account},
        category::{CategoryName, NewCategory, create_category, get_category},
        transaction::{Transaction, post_transaction},
    };

    use super::Ledger;

    fn get_test_ledger() -> Ledger {
        Ledger::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn new_initializes_tables() {
        let ledger = get_test_ledger();
        let connection = ledger.connection().unwrap();

        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('accounts', 'categories', 'transactions')",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(tables, 3);
    }

    #[test]
    fn concurrent_posts_are_all_applied() {
        let ledger = get_test_ledger();
        let (account_id, category_id) = {
            let connection = ledger.connection().unwrap();
            let account = create_account(
                NewAccount {
                    name: AccountName::new_unchecked("Everyday"),
                    account_type: "checking".to_owned(),
                    opening_balance: 1000.0,
                },
                &connection,
            )
            .unwrap();
            let category = create_category(
                NewCategory {
                    name: CategoryName::new_unchecked("Groceries"),
                    parent_id: None,
                    amount: Some(500.0),
                },
                &connection,
            )
            .unwrap();

            (account.id, category.id)
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    let connection = ledger.connection().unwrap();
                    post_transaction(
                        Transaction::build(account_id, 10.0, date!(2025 - 04 - 01))
                            .category_id(Some(category_id)),
                        &connection,
                    )
                    .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let connection = ledger.connection().unwrap();
        assert_eq!(get_account(account_id, &connection).unwrap().balance, 920.0);
        assert_eq!(
            get_category(category_id, &connection).unwrap().amount,
            Some(420.0)
        );
    }

    #[test]
    fn poisoned_lock_returns_error() {
        let ledger = get_test_ledger();
        let poisoner = ledger.clone();

        let result = thread::spawn(move || {
            let _connection = poisoner.connection().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(result.is_err());

        assert!(matches!(ledger.connection(), Err(Error::DatabaseLockError)));
    }
}
