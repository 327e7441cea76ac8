//! All-or-nothing groups of writes.

use rusqlite::Connection;

use crate::Error;

/// Run `work` so that either all of its writes are committed or none are.
///
/// A transaction is opened on `connection` and committed only if `work`
/// returns `Ok`. If `work` fails, or the commit fails, the transaction is
/// rolled back when it is dropped and the first error is returned.
///
/// If `connection` is already inside a transaction the work runs in a
/// savepoint. A failed inner unit leaves the outer transaction as it was
/// before the inner unit started, and the outer unit of work still decides
/// whether anything is committed.
///
/// # Errors
/// Returns the error from `work`, or [Error::SqlError] if the transaction
/// cannot be opened or committed.
pub fn in_unit_of_work<T>(
    connection: &Connection,
    work: impl FnOnce(&Connection) -> Result<T, Error>,
) -> Result<T, Error> {
    if !connection.is_autocommit() {
        return in_savepoint(connection, work);
    }

    let tx = connection.unchecked_transaction()?;
    let value = work(&tx)?;
    tx.commit()?;

    Ok(value)
}

// `rusqlite::Savepoint` needs `&mut Connection`, the connection here is shared.
fn in_savepoint<T>(
    connection: &Connection,
    work: impl FnOnce(&Connection) -> Result<T, Error>,
) -> Result<T, Error> {
    connection.execute_batch("SAVEPOINT unit_of_work")?;

    match work(connection) {
        Ok(value) => {
            connection.execute_batch("RELEASE unit_of_work")?;
            Ok(value)
        }
        Err(error) => {
            connection.execute_batch("ROLLBACK TO unit_of_work; RELEASE unit_of_work")?;
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::Error;

    use super::in_unit_of_work;

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE counter (value INTEGER NOT NULL)", ())
            .unwrap();
        connection
    }

    fn count_rows(connection: &Connection) -> i64 {
        connection
            .query_row("SELECT COUNT(*) FROM counter", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn commits_on_success() {
        let connection = get_test_connection();

        let result = in_unit_of_work(&connection, |connection| {
            connection.execute("INSERT INTO counter (value) VALUES (1)", ())?;
            connection.execute("INSERT INTO counter (value) VALUES (2)", ())?;
            Ok(())
        });

        assert_eq!(result, Ok(()));
        assert_eq!(count_rows(&connection), 2);
        assert!(connection.is_autocommit());
    }

    #[test]
    fn rolls_back_on_error() {
        let connection = get_test_connection();

        let result: Result<(), Error> = in_unit_of_work(&connection, |connection| {
            connection.execute("INSERT INTO counter (value) VALUES (1)", ())?;
            connection.execute("INSERT INTO counter (value) VALUES (NULL)", ())?;
            Ok(())
        });

        assert!(matches!(result, Err(Error::SqlError(_))), "got {result:?}");
        assert_eq!(count_rows(&connection), 0);
        assert!(connection.is_autocommit());
    }

    #[test]
    fn nested_work_joins_outer_unit() {
        let connection = get_test_connection();

        let result: Result<(), Error> = in_unit_of_work(&connection, |outer| {
            in_unit_of_work(outer, |inner| {
                inner.execute("INSERT INTO counter (value) VALUES (1)", ())?;
                Ok(())
            })?;

            Err(Error::NotFound)
        });

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(count_rows(&connection), 0);
    }

    #[test]
    fn failed_nested_work_is_undone_when_outer_unit_commits() {
        let connection = get_test_connection();

        let result: Result<(), Error> = in_unit_of_work(&connection, |outer| {
            outer.execute("INSERT INTO counter (value) VALUES (1)", ())?;

            let inner: Result<(), Error> = in_unit_of_work(outer, |inner| {
                inner.execute("INSERT INTO counter (value) VALUES (2)", ())?;
                Err(Error::NotFound)
            });
            assert_eq!(inner, Err(Error::NotFound));

            in_unit_of_work(outer, |inner| {
                inner.execute("INSERT INTO counter (value) VALUES (3)", ())?;
                Ok(())
            })
        });

        assert_eq!(result, Ok(()));
        let values: Vec<i64> = connection
            .prepare("SELECT value FROM counter ORDER BY value")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values, vec![1, 3]);
        assert!(connection.is_autocommit());
    }
}
