//! Traits that describe how a rust type maps to a table row.

use rusqlite::Row;

/// A type that is stored as one row of a table.
///
/// Every table used with [Store](super::Store) is expected to have the
/// `is_deleted`, `created_at` and `updated_at` columns in addition to the
/// columns listed here.
pub trait Record: Sized {
    /// The columns read by [Record::map_row], in the order they are read.
    ///
    /// These are also the only columns that list filters and sorting may
    /// refer to.
    const COLUMNS: &'static [&'static str];

    /// The columns that callers may set on insert and update.
    ///
    /// Bookkeeping columns such as the ID, the soft delete flag and the
    /// timestamps are managed by the store and must not appear here.
    const WRITABLE_COLUMNS: &'static [&'static str];

    /// Convert a row selected with [Record::COLUMNS] into the record.
    ///
    /// # Errors
    /// Returns an error if a row item cannot be converted into the corresponding rust type.
    fn map_row(row: &Row) -> Result<Self, rusqlite::Error>;
}

/// A record with a dense, zero-based display position.
pub trait Ordered: Record {
    /// The integer column holding the position.
    const POSITION_COLUMN: &'static str;
}
