//! Implements the generic SQLite backed record store.

use std::marker::PhantomData;

use rusqlite::{Connection, params_from_iter, types::Value};

use crate::{Error, database_id::DatabaseId};

use super::{Fields, ListOptions, Record};

/// Creates, retrieves, updates and soft deletes records of type `R` in one
/// table.
///
/// The store borrows the connection, so it can be created on a plain
/// connection or on an open transaction (which derefs to a connection) and
/// is cheap to create per call.
#[derive(Debug)]
pub struct Store<'conn, R> {
    pub(super) connection: &'conn Connection,
    pub(super) table: &'static str,
    pub(super) id_column: &'static str,
    record: PhantomData<fn() -> R>,
}

impl<'conn, R: Record> Store<'conn, R> {
    /// Create a store for the records in `table`, identified by `id_column`.
    pub fn new(connection: &'conn Connection, table: &'static str, id_column: &'static str) -> Self {
        Self {
            connection,
            table,
            id_column,
            record: PhantomData,
        }
    }

    /// The name of the table this store reads and writes.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Insert a record built from `fields` and return its generated ID.
    ///
    /// Only the database constraints (e.g., `NOT NULL`) are checked.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::UnknownColumn] if `fields` contains a column that is not writable,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn create(&self, fields: &Fields) -> Result<DatabaseId, Error> {
        self.check_columns(R::WRITABLE_COLUMNS, fields.columns())?;

        let query = if fields.is_empty() {
            format!("INSERT INTO \"{}\" DEFAULT VALUES", self.table)
        } else {
            let columns: Vec<&str> = fields.columns().collect();
            let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{i}")).collect();

            format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                self.table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let result = self
            .connection
            .execute(&query, params_from_iter(fields.values()))
            .map(|_| self.connection.last_insert_rowid());

        match result {
            Ok(id) => {
                tracing::info!(operation = "create", table = self.table, id, "record created");
                Ok(id)
            }
            Err(error) => {
                tracing::error!(operation = "create", table = self.table, %error, "could not create record");
                Err(error.into())
            }
        }
    }

    /// Retrieve the live record with the identity `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a live record,
    /// - [Error::DuplicateRows] if more than one live record has the identity `id`,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn get_by_id(&self, id: DatabaseId) -> Result<R, Error> {
        let query = format!(
            "SELECT {} FROM \"{}\" WHERE {} = ?1 AND is_deleted = 0",
            R::COLUMNS.join(", "),
            self.table,
            self.id_column
        );

        let mut records = self
            .connection
            .prepare(&query)?
            .query_map([id], R::map_row)?
            .collect::<Result<Vec<R>, rusqlite::Error>>()?;

        match records.len() {
            0 => Err(Error::NotFound),
            1 => records.pop().ok_or(Error::NotFound),
            count => {
                tracing::error!(table = self.table, id, count, "identity matched more than one row");
                Err(Error::DuplicateRows {
                    table: self.table,
                    id,
                    count,
                })
            }
        }
    }

    /// Set the columns in `updates` on the live record with the identity
    /// `id` and refresh its `updated_at` timestamp.
    ///
    /// An empty `updates` does nothing. The number of affected rows is not
    /// checked, updating a missing record succeeds without effect.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::UnknownColumn] if `updates` contains a column that is not writable,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn update(&self, id: DatabaseId, updates: &Fields) -> Result<(), Error> {
        if updates.is_empty() {
            return Ok(());
        }

        self.check_columns(R::WRITABLE_COLUMNS, updates.columns())?;

        let assignments: Vec<String> = updates
            .columns()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .collect();
        let query = format!(
            "UPDATE \"{}\" SET {}, updated_at = CURRENT_TIMESTAMP WHERE {} = ?{} AND is_deleted = 0",
            self.table,
            assignments.join(", "),
            self.id_column,
            updates.len() + 1
        );

        let id_value = Value::Integer(id);
        let params = params_from_iter(updates.values().chain(std::iter::once(&id_value)));

        match self.connection.execute(&query, params) {
            Ok(_) => {
                tracing::info!(operation = "update", table = self.table, id, ?updates, "record updated");
                Ok(())
            }
            Err(error) => {
                tracing::error!(operation = "update", table = self.table, id, ?updates, %error, "could not update record");
                Err(error.into())
            }
        }
    }

    /// Mark the record with the identity `id` as deleted.
    ///
    /// The row stays in the table but is excluded from every read. Deleting
    /// a record that is already deleted, or that does not exist, succeeds
    /// and changes nothing.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is an SQL error.
    pub fn soft_delete(&self, id: DatabaseId) -> Result<(), Error> {
        let query = format!(
            "UPDATE \"{}\" SET is_deleted = 1, updated_at = CURRENT_TIMESTAMP WHERE {} = ?1 AND is_deleted = 0",
            self.table, self.id_column
        );

        match self.connection.execute(&query, [id]) {
            Ok(rows_affected) => {
                tracing::info!(operation = "soft_delete", table = self.table, id, rows_affected, "record deleted");
                Ok(())
            }
            Err(error) => {
                tracing::error!(operation = "soft_delete", table = self.table, id, %error, "could not delete record");
                Err(error.into())
            }
        }
    }

    /// Retrieve the live records selected by `options`.
    ///
    /// Returns an empty vector when nothing matches.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::UnknownColumn] if a filter or sort key refers to an unknown column,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn list(&self, options: &ListOptions) -> Result<Vec<R>, Error> {
        self.check_columns(R::COLUMNS, options.columns())?;

        let mut query = format!(
            "SELECT {} FROM \"{}\" WHERE is_deleted = 0",
            R::COLUMNS.join(", "),
            self.table
        );
        let mut params = Vec::new();
        options.push_sql(&mut query, &mut params);

        self.connection
            .prepare(&query)?
            .query_map(params_from_iter(params.iter()), R::map_row)?
            .map(|maybe_record| maybe_record.map_err(Error::from))
            .collect()
    }

    /// Count the live records.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is an SQL error.
    pub fn count(&self) -> Result<usize, Error> {
        let count: i64 = self.connection.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\" WHERE is_deleted = 0", self.table),
            [],
            |row| row.get(0),
        )?;

        // COUNT(*) is never negative.
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn check_columns(
        &self,
        allowed: &[&'static str],
        mut columns: impl Iterator<Item = &'static str>,
    ) -> Result<(), Error> {
        match columns.find(|column| !allowed.contains(column)) {
            Some(column) => Err(Error::UnknownColumn {
                table: self.table,
                column: column.to_owned(),
            }),
            None => Ok(()),
        }
    }
}
