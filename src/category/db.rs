//! Database operations for categories.

use rusqlite::Connection;

use crate::{
    Error,
    database_id::CategoryId,
    store::{Fields, ListOptions, SortOrder, in_unit_of_work},
};

use super::{Category, CategoryName, aggregate, build_forest, category_store};

/// The data needed to create a category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The name of the category.
    pub name: CategoryName,
    /// The category to nest the new category under.
    pub parent_id: Option<CategoryId>,
    /// The starting amount, if any.
    pub amount: Option<f64>,
}

/// The changes to make to a category.
///
/// `None` leaves a field as it is. For the nullable fields, `Some(None)`
/// clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryUpdate {
    /// The new name.
    pub name: Option<CategoryName>,
    /// The new parent, `Some(None)` makes the category a root.
    pub parent_id: Option<Option<CategoryId>>,
    /// The new amount.
    pub amount: Option<Option<f64>>,
}

/// Create a category after the last live category.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidParent] if `parent_id` does not refer to a live category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(category: NewCategory, connection: &Connection) -> Result<Category, Error> {
    in_unit_of_work(connection, |connection| {
        let store = category_store(connection);

        if let Some(parent_id) = category.parent_id {
            get_parent(parent_id, connection)?;
        }

        let fields = Fields::new()
            .set("name", category.name.as_ref().to_owned())
            .set("parent_id", category.parent_id)
            .set("amount", category.amount)
            .set("sort_order", store.next_position()?);
        let id = store.create(&fields)?;

        store.get_by_id(id)
    })
}

/// Retrieve a single live category by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `category_id` does not refer to a live category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    category_store(connection).get_by_id(category_id)
}

/// Retrieve the live categories selected by `options` as flat rows.
///
/// # Errors
/// This function will return an error if `options` refers to an unknown
/// column or if there is an SQL error.
pub fn list_categories(
    options: &ListOptions,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    category_store(connection).list(options)
}

/// Retrieve every live category nested into a forest sorted by position,
/// with the amounts of parent categories replaced by the sum of their
/// children.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_category_forest(connection: &Connection) -> Result<Vec<Category>, Error> {
    let options = ListOptions::default()
        .order_by("sort_order", SortOrder::Ascending)
        .order_by("id", SortOrder::Ascending);
    let categories = category_store(connection).list(&options)?;

    let mut forest = build_forest(categories);
    forest.iter_mut().for_each(|root| {
        aggregate(root);
    });

    Ok(forest)
}

/// Apply `update` to the live category `category_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidParent] if the new parent is not a live category,
/// - [Error::CategoryCycle] if the new parent is the category itself or one of its descendants,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    category_id: CategoryId,
    update: CategoryUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    in_unit_of_work(connection, |connection| {
        if let Some(Some(parent_id)) = update.parent_id {
            check_for_cycle(category_id, parent_id, connection)?;
        }

        let mut fields = Fields::new().set_if_some(
            "name",
            update.name.map(|name| name.as_ref().to_owned()),
        );
        if let Some(parent_id) = update.parent_id {
            fields = fields.set("parent_id", parent_id);
        }
        if let Some(amount) = update.amount {
            fields = fields.set("amount", amount);
        }

        category_store(connection).update(category_id, &fields)
    })
}

/// Soft delete a category and close the gap it leaves in the ordering.
///
/// Children of the category are not deleted, they are shown as root
/// categories until they are moved.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    in_unit_of_work(connection, |connection| {
        let store = category_store(connection);
        store.soft_delete(category_id)?;
        store.compact_positions()
    })
}

/// Move a category from `old_index` to `new_index` in the display order.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `category_id` does not refer to a live category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn reorder_category(
    category_id: CategoryId,
    old_index: i64,
    new_index: i64,
    connection: &Connection,
) -> Result<(), Error> {
    category_store(connection).reorder(category_id, old_index, new_index)
}

fn get_parent(parent_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    category_store(connection)
        .get_by_id(parent_id)
        .map_err(|error| match error {
            Error::NotFound => Error::InvalidParent(parent_id),
            error => error,
        })
}

/// Walk up from `parent_id` and fail if `category_id` is one of the
/// ancestors.
///
/// The walk is bounded by the number of live categories, a longer chain
/// means the stored data already contains a cycle.
fn check_for_cycle(
    category_id: CategoryId,
    parent_id: CategoryId,
    connection: &Connection,
) -> Result<(), Error> {
    let store = category_store(connection);
    let cycle = Error::CategoryCycle {
        category_id,
        parent_id,
    };

    let mut ancestor = Some(get_parent(parent_id, connection)?);

    for _ in 0..=store.count()? {
        let Some(current) = ancestor else {
            return Ok(());
        };

        if current.id == category_id {
            return Err(cycle);
        }

        ancestor = match current.parent_id {
            None => None,
            Some(next_id) => match store.get_by_id(next_id) {
                Ok(next) => Some(next),
                // A dead parent ends the chain, the category is shown as a root.
                Err(Error::NotFound) => None,
                Err(error) => return Err(error),
            },
        };
    }

    tracing::error!(category_id, parent_id, "stored category parents already form a cycle");
    Err(cycle)
}
