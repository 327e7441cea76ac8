//! Maintains the dense display position of ordered records.

use crate::{Error, database_id::DatabaseId};

use super::{Ordered, Store, in_unit_of_work};

impl<R: Ordered> Store<'_, R> {
    /// Move the record `id` from `old_index` to `new_index`, shifting the
    /// live records in between by one to keep positions dense.
    ///
    /// Moving forward closes the gap left behind by decrementing the records
    /// in `old_index + 1..=new_index`; moving backward makes room by
    /// incrementing the records in `new_index..=old_index - 1`. The shift and
    /// the placement happen in one unit of work.
    ///
    /// The indices are trusted to match the stored positions. Indices that
    /// do not will shift the wrong records, or none at all.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a live record, in which
    ///   case nothing is changed,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn reorder(&self, id: DatabaseId, old_index: i64, new_index: i64) -> Result<(), Error> {
        if old_index == new_index {
            return Ok(());
        }

        let position = R::POSITION_COLUMN;
        let (shift, low, high) = if old_index < new_index {
            ("- 1", old_index + 1, new_index)
        } else {
            ("+ 1", new_index, old_index - 1)
        };

        let shift_query = format!(
            "UPDATE \"{}\" SET {position} = {position} {shift} \
            WHERE is_deleted = 0 AND {} != ?1 AND {position} BETWEEN ?2 AND ?3",
            self.table, self.id_column
        );
        let place_query = format!(
            "UPDATE \"{}\" SET {position} = ?1, updated_at = CURRENT_TIMESTAMP \
            WHERE {} = ?2 AND is_deleted = 0",
            self.table, self.id_column
        );

        let result = in_unit_of_work(self.connection, |connection| {
            let shifted = connection.execute(&shift_query, (id, low, high))?;
            let placed = connection.execute(&place_query, (new_index, id))?;

            if placed == 0 {
                return Err(Error::NotFound);
            }

            Ok(shifted)
        });

        match result {
            Ok(shifted) => {
                tracing::info!(
                    operation = "reorder",
                    table = self.table,
                    id,
                    old_index,
                    new_index,
                    shifted,
                    "record moved"
                );
                Ok(())
            }
            Err(error) => {
                tracing::error!(
                    operation = "reorder",
                    table = self.table,
                    id,
                    old_index,
                    new_index,
                    %error,
                    "could not move record"
                );
                Err(error)
            }
        }
    }

    /// The position directly after the last live record, or 0 if there are
    /// no live records.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is an SQL error.
    pub fn next_position(&self) -> Result<i64, Error> {
        let position = R::POSITION_COLUMN;

        self.connection
            .query_row(
                &format!(
                    "SELECT COALESCE(MAX({position}) + 1, 0) FROM \"{}\" WHERE is_deleted = 0",
                    self.table
                ),
                [],
                |row| row.get(0),
            )
            .map_err(|error| error.into())
    }

    /// Renumber the live records `0, 1, 2, ...` in their current order.
    ///
    /// Ties are broken by ID. This repairs gaps left by soft deletes and
    /// duplicate positions left by inconsistent indices.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is an SQL error.
    pub fn compact_positions(&self) -> Result<(), Error> {
        let position = R::POSITION_COLUMN;
        let select_query = format!(
            "SELECT {0}, {position} FROM \"{1}\" WHERE is_deleted = 0 ORDER BY {position} ASC, {0} ASC",
            self.id_column, self.table
        );
        let update_query = format!(
            "UPDATE \"{}\" SET {position} = ?1 WHERE {} = ?2",
            self.table, self.id_column
        );

        let result = in_unit_of_work(self.connection, |connection| {
            let rows = connection
                .prepare(&select_query)?
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<(DatabaseId, i64)>, rusqlite::Error>>()?;

            let mut stmt = connection.prepare(&update_query)?;
            let mut moved = 0;

            for (new_position, (id, old_position)) in (0_i64..).zip(rows) {
                if old_position != new_position {
                    stmt.execute((new_position, id))?;
                    moved += 1;
                }
            }

            Ok(moved)
        });

        match result {
            Ok(moved) => {
                tracing::info!(operation = "compact_positions", table = self.table, moved, "positions compacted");
                Ok(())
            }
            Err(error) => {
                tracing::error!(operation = "compact_positions", table = self.table, %error, "could not compact positions");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::{Connection, Row};

    use crate::{
        Error,
        store::{Fields, Ordered, Record, Store, in_unit_of_work},
    };

    #[derive(Debug, PartialEq)]
    struct Item {
        id: i64,
        position: i64,
    }

    impl Record for Item {
        const COLUMNS: &'static [&'static str] = &["id", "position"];
        const WRITABLE_COLUMNS: &'static [&'static str] = &["position"];

        fn map_row(row: &Row) -> Result<Self, rusqlite::Error> {
            Ok(Self {
                id: row.get(0)?,
                position: row.get(1)?,
            })
        }
    }

    impl Ordered for Item {
        const POSITION_COLUMN: &'static str = "position";
    }

    /// Create a table with five items at positions 0..=4, with IDs 1..=5.
    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(
                "CREATE TABLE item (
                    id INTEGER PRIMARY KEY,
                    position INTEGER NOT NULL,
                    is_deleted INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );",
            )
            .unwrap();

        let store = items(&connection);
        for position in 0..5 {
            store
                .create(&Fields::new().set("position", position))
                .unwrap();
        }

        connection
    }

    fn items(connection: &Connection) -> Store<'_, Item> {
        Store::new(connection, "item", "id")
    }

    /// The IDs of the live items, sorted by position.
    fn ids_by_position(connection: &Connection) -> Vec<(i64, i64)> {
        connection
            .prepare("SELECT id, position FROM item WHERE is_deleted = 0 ORDER BY position, id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .map(|row| row.unwrap())
            .collect()
    }

    #[test]
    fn move_forward_shifts_following_items_down() {
        let connection = get_test_connection();

        // Item 3 is at position 2.
        items(&connection).reorder(3, 2, 4).unwrap();

        assert_eq!(
            ids_by_position(&connection),
            vec![(1, 0), (2, 1), (4, 2), (5, 3), (3, 4)]
        );
    }

    #[test]
    fn move_backward_shifts_preceding_items_up() {
        let connection = get_test_connection();

        // Item 5 is at position 4.
        items(&connection).reorder(5, 4, 1).unwrap();

        assert_eq!(
            ids_by_position(&connection),
            vec![(1, 0), (5, 1), (2, 2), (3, 3), (4, 4)]
        );
    }

    #[test]
    fn move_to_same_index_changes_nothing() {
        let connection = get_test_connection();
        let before = ids_by_position(&connection);

        items(&connection).reorder(3, 2, 2).unwrap();

        assert_eq!(ids_by_position(&connection), before);
    }

    #[test]
    fn move_to_start_and_end() {
        let connection = get_test_connection();
        let store = items(&connection);

        store.reorder(5, 4, 0).unwrap();
        store.reorder(1, 1, 4).unwrap();

        assert_eq!(
            ids_by_position(&connection),
            vec![(5, 0), (2, 1), (3, 2), (4, 3), (1, 4)]
        );
    }

    #[test]
    fn deleted_items_are_not_shifted() {
        let connection = get_test_connection();
        let store = items(&connection);
        store.soft_delete(4).unwrap();

        store.reorder(2, 1, 4).unwrap();

        let deleted_position: i64 = connection
            .query_row("SELECT position FROM item WHERE id = 4", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(deleted_position, 3);
        assert_eq!(
            ids_by_position(&connection),
            vec![(1, 0), (3, 1), (5, 3), (2, 4)]
        );
    }

    #[test]
    fn moving_missing_item_changes_nothing() {
        let connection = get_test_connection();
        let before = ids_by_position(&connection);

        let result = items(&connection).reorder(42, 0, 3);

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(ids_by_position(&connection), before);
    }

    #[test]
    fn moving_missing_item_inside_committed_unit_changes_nothing() {
        let connection = get_test_connection();
        let before = ids_by_position(&connection);

        let result = in_unit_of_work(&connection, |connection| {
            assert_eq!(items(connection).reorder(42, 0, 3), Err(Error::NotFound));
            Ok(())
        });

        assert_eq!(result, Ok(()));
        assert_eq!(ids_by_position(&connection), before);
    }

    #[test]
    fn next_position_follows_last_live_item() {
        let connection = get_test_connection();
        let store = items(&connection);

        assert_eq!(store.next_position(), Ok(5));

        store.soft_delete(5).unwrap();

        assert_eq!(store.next_position(), Ok(4));
    }

    #[test]
    fn next_position_of_empty_table_is_zero() {
        let connection = get_test_connection();
        connection.execute("DELETE FROM item", []).unwrap();

        assert_eq!(items(&connection).next_position(), Ok(0));
    }

    #[test]
    fn compact_positions_closes_gaps() {
        let connection = get_test_connection();
        let store = items(&connection);
        store.soft_delete(2).unwrap();
        store.soft_delete(4).unwrap();
        connection
            .execute("UPDATE item SET position = 7 WHERE id = 5", [])
            .unwrap();

        store.compact_positions().unwrap();

        assert_eq!(ids_by_position(&connection), vec![(1, 0), (3, 1), (5, 2)]);
    }
}
