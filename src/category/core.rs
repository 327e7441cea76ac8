//! Defines the category model, its table and how it maps to the record store.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::{
    Error,
    database_id::CategoryId,
    store::{Ordered, Record, Store},
};

/// The table categories are stored in.
pub const CATEGORY_TABLE: &str = "categories";

/// The name of a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty or just whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A spending category, e.g., 'Groceries', 'Eating Out', 'Bills'.
///
/// Categories form a forest through `parent_id`. Rows are read flat, use
/// [build_forest](super::build_forest) to fill in `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The id of the category.
    pub id: CategoryId,
    /// The name of the category.
    pub name: CategoryName,
    /// The category this one is nested under, `None` for a root category.
    pub parent_id: Option<CategoryId>,
    /// The money left in the category.
    ///
    /// For a category with children this is replaced by the sum of its
    /// children when the forest is aggregated.
    pub amount: Option<f64>,
    /// The zero-based display position among all live categories.
    pub sort_order: i64,
    /// When the category was created (UTC).
    pub created_at: PrimitiveDateTime,
    /// When the category was last changed (UTC).
    pub updated_at: PrimitiveDateTime,
    /// The categories nested directly under this one, in display order.
    #[serde(rename = "categories", default)]
    pub children: Vec<Category>,
}

impl Record for Category {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "parent_id",
        "amount",
        "sort_order",
        "created_at",
        "updated_at",
    ];
    const WRITABLE_COLUMNS: &'static [&'static str] = &["name", "parent_id", "amount", "sort_order"];

    fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let raw_name: String = row.get(1)?;

        Ok(Self {
            id: row.get(0)?,
            name: CategoryName::new_unchecked(&raw_name),
            parent_id: row.get(2)?,
            amount: row.get(3)?,
            sort_order: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            children: Vec::new(),
        })
    }
}

impl Ordered for Category {
    const POSITION_COLUMN: &'static str = "sort_order";
}

/// The record store for categories.
pub fn category_store(connection: &Connection) -> Store<'_, Category> {
    Store::new(connection, CATEGORY_TABLE, "id")
}

/// Create the category table and indexes.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            parent_id INTEGER,
            amount REAL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(parent_id) REFERENCES categories(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_categories_sort_order ON categories(is_deleted, sort_order);",
    )?;

    Ok(())
}

/// Add `delta` to the amount of the live category `category_id`.
///
/// A category without an amount is treated as having zero.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if `category_id` does not refer to a live category,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn adjust_category_amount(
    category_id: CategoryId,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE categories SET amount = COALESCE(amount, 0) + ?1, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2 AND is_deleted = 0",
        (delta, category_id),
    )?;

    if rows_affected == 0 {
        tracing::warn!(category_id, delta, "tried to adjust a category that is not live");
        return Err(Error::InvalidCategory(category_id));
    }

    tracing::debug!(category_id, delta, "category amount adjusted");

    Ok(())
}

#[cfg(test)]
mod category_name_tests {
    use crate::{Error, category::CategoryName};

    #[test]
    fn new_fails_on_empty_string() {
        let category_name = CategoryName::new("");

        assert_eq!(category_name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        let category_name = CategoryName::new("\n\t \r");

        assert_eq!(category_name, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_trims_whitespace() {
        let category_name = CategoryName::new("  Groceries ").unwrap();

        assert_eq!(category_name.as_ref(), "Groceries");
    }
}


#[cfg(test)]
mod adjust_category_amount_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::adjust_category_amount;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn amount_of(id: i64, conn: &Connection) -> Option<f64> {
        conn.query_row("SELECT amount FROM categories WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn adds_delta_to_amount() {
        let conn = get_test_connection();
        conn.execute(
            "INSERT INTO categories (id, name, amount) VALUES (1, 'Food', 200.0)",
            (),
        )
        .unwrap();

        adjust_category_amount(1, -50.0, &conn).unwrap();

        assert_eq!(amount_of(1, &conn), Some(150.0));
    }

    #[test]
    fn treats_null_amount_as_zero() {
        let conn = get_test_connection();
        conn.execute("INSERT INTO categories (id, name) VALUES (1, 'Food')", ())
            .unwrap();

        adjust_category_amount(1, -20.0, &conn).unwrap();

        assert_eq!(amount_of(1, &conn), Some(-20.0));
    }

    #[test]
    fn fails_on_deleted_category() {
        let conn = get_test_connection();
        conn.execute(
            "INSERT INTO categories (id, name, amount, is_deleted) VALUES (1, 'Food', 10.0, 1)",
            (),
        )
        .unwrap();

        let result = adjust_category_amount(1, -5.0, &conn);

        assert_eq!(result, Err(Error::InvalidCategory(1)));
        assert_eq!(amount_of(1, &conn), Some(10.0));
    }
}
