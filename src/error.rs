//! Defines the crate level error type and how errors are classified for callers.

use crate::database_id::{AccountId, CategoryId, DatabaseId};

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// An empty string was used to create an account name.
    #[error("account name cannot be empty")]
    EmptyAccountName,

    /// A column name that is not part of the table was used in an insert,
    /// update, filter or sort.
    ///
    /// Column names are checked against the record definition before any SQL
    /// is built, so this is always a programming error in the caller.
    #[error("\"{column}\" is not a known column of the table \"{table}\"")]
    UnknownColumn {
        /// The table the statement was built for.
        table: &'static str,
        /// The offending column name.
        column: String,
    },

    /// The parent ID used to create or move a category does not refer to a
    /// live category.
    #[error("the parent ID {0} does not refer to a valid category")]
    InvalidParent(CategoryId),

    /// Moving a category under the given parent would make the category its
    /// own ancestor.
    #[error("category {category_id} cannot be moved under {parent_id}, it would form a cycle")]
    CategoryCycle {
        /// The category being moved.
        category_id: CategoryId,
        /// The requested parent.
        parent_id: CategoryId,
    },

    /// A transaction that is not a transfer was posted without a category.
    #[error("a category is required for transactions that are not transfers")]
    MissingCategory,

    /// The account ID used to post a transaction does not refer to a live
    /// account.
    #[error("the account ID {0} does not refer to a valid account")]
    InvalidAccount(AccountId),

    /// The category ID used to post a transaction does not refer to a live
    /// category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// A transfer named the same account as both source and target.
    #[error("cannot transfer from account {0} to itself")]
    SelfTransfer(AccountId),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A lookup by ID matched more than one live row.
    ///
    /// Identity columns are primary keys, so this indicates a corrupted
    /// database rather than a caller mistake.
    #[error("expected one row in \"{table}\" with ID {id}, found {count}")]
    DuplicateRows {
        /// The table that was queried.
        table: &'static str,
        /// The ID that was looked up.
        id: DatabaseId,
        /// How many rows matched.
        count: usize,
    },

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

/// The broad class of an [Error], used by callers to decide how to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied malformed data or a reference to a missing row.
    /// Retrying the same request will fail again.
    Validation,
    /// An identity lookup matched zero rows.
    NotFound,
    /// Any driver, connection or integrity failure.
    Storage,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyCategoryName
            | Error::EmptyAccountName
            | Error::UnknownColumn { .. }
            | Error::InvalidParent(_)
            | Error::CategoryCycle { .. }
            | Error::MissingCategory
            | Error::InvalidAccount(_)
            | Error::InvalidCategory(_)
            | Error::SelfTransfer(_) => ErrorKind::Validation,
            Error::NotFound => ErrorKind::NotFound,
            Error::DuplicateRows { .. } | Error::SqlError(_) | Error::DatabaseLockError => {
                ErrorKind::Storage
            }
        }
    }
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

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn other_sql_errors_are_storage_errors() {
        let error: Error = rusqlite::Error::InvalidQuery.into();

        assert_eq!(error, Error::SqlError(rusqlite::Error::InvalidQuery));
        assert_eq!(error.kind(), ErrorKind::Storage);
    }

    #[test]
    fn bad_input_is_a_validation_error() {
        assert_eq!(Error::EmptyCategoryName.kind(), ErrorKind::Validation);
        assert_eq!(Error::MissingCategory.kind(), ErrorKind::Validation);
        assert_eq!(
            Error::CategoryCycle {
                category_id: 1,
                parent_id: 2
            }
            .kind(),
            ErrorKind::Validation
        );
    }
}
