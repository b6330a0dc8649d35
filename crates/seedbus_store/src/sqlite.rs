//! SQLite row store.

use crate::adapter::StoreAdapter;
use crate::error::{StoreError, StoreResult};
use crate::value::{Row, RowId, Value};
use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A store backed by a SQLite database.
///
/// Identifiers are quoted and every value is bound as a statement
/// parameter, so fixture text never needs escaping.
///
/// # Sharing
///
/// Clones share one connection. Tests keep a clone to run assertions
/// against the same database the datasource writes to.
///
/// # Keys
///
/// `insert_row` returns the value of the table's primary key column. A
/// row that supplies the key gets it back unchanged; otherwise the key is
/// read back through the rowid, so a generated key needs an
/// `INTEGER PRIMARY KEY` column. Tables with a composite key or none at
/// all return the rowid. Sequence names are accepted for interface
/// compatibility and otherwise ignored.
///
/// # Example
///
/// ```rust
/// use seedbus_store::{Row, SqliteStore, StoreAdapter};
///
/// let mut store = SqliteStore::open_in_memory().unwrap();
/// store
///     .execute_batch("CREATE TABLE t_event (id INTEGER PRIMARY KEY, name TEXT)")
///     .unwrap();
/// let id = store.insert_row("t_event", &Row::from_pairs([("name", "Launch")]), None).unwrap();
/// assert_eq!(id.as_i64(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or the database cannot be
    /// created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the database file path, or `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the shared connection for custom queries.
    #[must_use]
    pub fn connection(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    /// Runs a batch of SQL statements, e.g. a fixture schema.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Returns the number of rows in a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist.
    pub fn count(&self, table: &str) -> StoreResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.lock().query_row(&sql, [], |r| r.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Returns every row of a table in rowid order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist.
    pub fn rows(&self, table: &str) -> StoreResult<Vec<Row>> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table));
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        read_rows(&mut stmt, rusqlite::params![])
    }
}

fn read_rows<P: rusqlite::Params>(
    stmt: &mut rusqlite::Statement<'_>,
    params: P,
) -> StoreResult<Vec<Row>> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt.query_map(params, |r| {
        let mut row = Row::new();
        for (i, name) in columns.iter().enumerate() {
            row.insert(name.clone(), r.get::<_, Value>(i)?);
        }
        Ok(row)
    })?;
    let rows = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns the table's primary key column, if it has exactly one.
fn primary_key(conn: &Connection, table: &str) -> StoreResult<Option<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0")?;
    let columns = stmt
        .query_map([table], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match columns.as_slice() {
        [column] => Some(column.clone()),
        _ => None,
    })
}

/// Reads the key of the row just inserted at `rowid`.
///
/// A key that is not an integer removes the row again before failing.
fn read_key(conn: &Connection, table: &str, column: &str, rowid: i64) -> StoreResult<RowId> {
    let sql = format!(
        "SELECT {} FROM {} WHERE rowid = ?1",
        quote_ident(column),
        quote_ident(table)
    );
    match conn.query_row(&sql, [rowid], |r| r.get::<_, Value>(0))? {
        Value::Integer(id) => Ok(RowId(id)),
        other => {
            let sql = format!("DELETE FROM {} WHERE rowid = ?1", quote_ident(table));
            conn.execute(&sql, [rowid])?;
            Err(StoreError::InvalidKey {
                table: table.to_string(),
                column: column.to_string(),
                value: other.to_string(),
            })
        }
    }
}

/// Quotes an identifier for use in a statement.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl StoreAdapter for SqliteStore {
    fn insert_row(
        &mut self,
        table: &str,
        row: &Row,
        _sequence: Option<&str>,
    ) -> StoreResult<RowId> {
        let sql = if row.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table))
        } else {
            let columns: Vec<String> = row.columns().map(quote_ident).collect();
            let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(table),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let conn = self.conn.lock();
        conn.execute(&sql, params_from_iter(row.values()))?;
        let rowid = conn.last_insert_rowid();

        match primary_key(&conn, table)? {
            Some(column) => match row.get(&column) {
                Some(Value::Integer(id)) => Ok(RowId(*id)),
                _ => read_key(&conn, table, &column, rowid),
            },
            None => Ok(RowId(rowid)),
        }
    }

    fn update_row(
        &mut self,
        table: &str,
        row: &Row,
        key_column: &str,
        id: RowId,
    ) -> StoreResult<usize> {
        if row.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = row
            .columns()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(table),
            assignments.join(", "),
            quote_ident(key_column),
            row.len() + 1
        );

        let key = Value::from(id);
        let params = row.values().chain(std::iter::once(&key));
        Ok(self.conn.lock().execute(&sql, params_from_iter(params))?)
    }

    fn delete_row(&mut self, table: &str, key_column: &str, id: RowId) -> StoreResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(key_column)
        );
        Ok(self.conn.lock().execute(&sql, [id.as_i64()])?)
    }

    fn select_where(&self, table: &str, column: &str, value: &Value) -> StoreResult<Vec<Row>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(column)
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        read_rows(&mut stmt, [value])
    }

    fn last_insert_id(&self, _sequence: Option<&str>) -> StoreResult<Option<RowId>> {
        let id = self.conn.lock().last_insert_rowid();
        Ok((id != 0).then_some(RowId(id)))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Self::Null => ValueRef::Null,
            Self::Integer(i) => ValueRef::Integer(*i),
            Self::Real(r) => ValueRef::Real(*r),
            Self::Text(s) => ValueRef::Text(s.as_bytes()),
            Self::Blob(b) => ValueRef::Blob(b),
        }))
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            ValueRef::Text(t) => Self::Text(
                std::str::from_utf8(t)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))?
                    .to_string(),
            ),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use proptest::prelude::*;
    use tempfile::tempdir;

    const SCHEMA: &str = "
        CREATE TABLE t_session (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            \"desc\" TEXT,
            score REAL,
            payload BLOB
        );
    ";

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.execute_batch(SCHEMA).unwrap();
        store
    }

    #[test]
    fn sqlite_insert_returns_rowid() {
        let mut store = store();
        let a = store
            .insert_row("t_session", &Row::from_pairs([("name", "Keynote")]), None)
            .unwrap();
        let b = store
            .insert_row("t_session", &Row::from_pairs([("name", "Panel")]), None)
            .unwrap();

        assert_eq!(a, RowId(1));
        assert_eq!(b, RowId(2));
        assert_eq!(store.last_insert_id(None).unwrap(), Some(b));
        assert_eq!(store.count("t_session").unwrap(), 2);
    }

    #[test]
    fn sqlite_round_trips_every_storage_class() {
        let mut store = store();
        let row = Row::from_pairs([
            ("name", Value::from("Keynote")),
            ("desc", Value::Null),
            ("score", Value::Real(4.5)),
            ("payload", Value::Blob(vec![1, 2, 3])),
        ]);
        let id = store.insert_row("t_session", &row, None).unwrap();

        let rows = store
            .select_where("t_session", "name", &Value::from("Keynote"))
            .unwrap();
        assert_eq!(rows.len(), 1);

        let mut expected = row.clone();
        expected.insert("id", Value::from(id));
        assert_eq!(rows[0], expected);
    }

    #[test]
    fn sqlite_update_touches_only_given_columns() {
        let mut store = store();
        let id = store
            .insert_row(
                "t_session",
                &Row::from_pairs([("name", "Keynote"), ("desc", "Opening")]),
                None,
            )
            .unwrap();

        let changed = store
            .update_row(
                "t_session",
                &Row::from_pairs([("desc", "Updated")]),
                "id",
                id,
            )
            .unwrap();
        assert_eq!(changed, 1);

        let rows = store
            .select_where("t_session", "id", &Value::from(id))
            .unwrap();
        assert_eq!(rows[0].get("desc"), Some(&Value::from("Updated")));
        assert_eq!(rows[0].get("name"), Some(&Value::from("Keynote")));
    }

    #[test]
    fn sqlite_delete_missing_row_is_not_an_error() {
        let mut store = store();
        let id = store
            .insert_row("t_session", &Row::from_pairs([("name", "x")]), None)
            .unwrap();
        assert_eq!(store.delete_row("t_session", "id", id).unwrap(), 1);
        assert_eq!(store.delete_row("t_session", "id", id).unwrap(), 0);
    }

    #[test]
    fn sqlite_insert_with_explicit_key() {
        let mut store = store();
        let row = Row::from_pairs([("id", Value::Integer(17)), ("name", Value::from("x"))]);
        assert_eq!(store.insert_row("t_session", &row, None).unwrap(), RowId(17));
    }

    #[test]
    fn sqlite_insert_returns_declared_key_not_rowid() {
        let mut store = store();
        store
            .execute_batch(
                "CREATE TABLE t_code (code INT PRIMARY KEY, label TEXT);
                 CREATE TABLE t_tag (tag INTEGER PRIMARY KEY, label TEXT) WITHOUT ROWID;",
            )
            .unwrap();

        let first = store
            .insert_row("t_code", &Row::from_pairs([("code", Value::Integer(500)), ("label", Value::from("a"))]), None)
            .unwrap();
        let second = store
            .insert_row("t_code", &Row::from_pairs([("code", Value::from("501")), ("label", Value::from("b"))]), None)
            .unwrap();
        assert_eq!((first, second), (RowId(500), RowId(501)));

        assert_eq!(store.delete_row("t_code", "code", first).unwrap(), 1);
        let left = store.rows("t_code").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].get("label"), Some(&Value::from("b")));

        let tag = store
            .insert_row("t_tag", &Row::from_pairs([("tag", Value::Integer(9)), ("label", Value::from("x"))]), None)
            .unwrap();
        assert_eq!(tag, RowId(9));
    }

    #[test]
    fn sqlite_missing_generated_key_is_rejected_without_effect() {
        let mut store = store();
        store
            .execute_batch("CREATE TABLE t_code (code INT PRIMARY KEY, label TEXT);")
            .unwrap();

        let err = store
            .insert_row("t_code", &Row::from_pairs([("label", "a")]), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
        assert_eq!(store.count("t_code").unwrap(), 0);
    }

    #[test]
    fn sqlite_unknown_table_fails() {
        let mut store = store();
        assert!(store.insert_row("missing", &Row::new(), None).is_err());
        assert!(store
            .select_where("missing", "name", &Value::from("x"))
            .is_err());
    }

    #[test]
    fn sqlite_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("fixtures.db");

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.execute_batch(SCHEMA).unwrap();
            store
                .insert_row("t_session", &Row::from_pairs([("name", "kept")]), None)
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.count("t_session").unwrap(), 1);
    }

    #[test]
    fn sqlite_rows_lists_table_in_rowid_order() {
        let mut store = store();
        for name in ["b", "a"] {
            store
                .insert_row("t_session", &Row::from_pairs([("name", name)]), None)
                .unwrap();
        }
        let names: Vec<_> = store
            .rows("t_session")
            .unwrap()
            .into_iter()
            .map(|r| r.get("name").cloned())
            .collect();
        assert_eq!(names, vec![Some(Value::from("b")), Some(Value::from("a"))]);
    }

    fn name_cell() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            prop::sample::select(vec!["Ann", "Bob", "ann"]).prop_map(Value::from),
        ]
    }

    fn score_cell() -> impl Strategy<Value = Value> {
        prop_oneof![Just(Value::Null), (-1i64..3).prop_map(Value::Integer)]
    }

    fn keys(rows: &[Row]) -> Vec<Option<i64>> {
        let mut keys: Vec<_> = rows.iter().map(|r| r.get("id").and_then(Value::as_i64)).collect();
        keys.sort_unstable();
        keys
    }

    proptest! {
        #[test]
        fn select_where_matches_memory_store(
            rows in prop::collection::vec((name_cell(), score_cell()), 0..12),
            name in name_cell(),
            score in score_cell(),
        ) {
            let mut sqlite = SqliteStore::open_in_memory().unwrap();
            sqlite
                .execute_batch("CREATE TABLE t_mix (id INTEGER PRIMARY KEY, name TEXT, score INTEGER)")
                .unwrap();
            let mut memory = InMemoryStore::new();
            memory.create_table("t_mix", "id");

            for (n, sc) in rows {
                let row = Row::from_pairs([("name", n), ("score", sc)]);
                let a = sqlite.insert_row("t_mix", &row, None).unwrap();
                let b = memory.insert_row("t_mix", &row, None).unwrap();
                prop_assert_eq!(a, b);
            }

            for (column, value) in [("name", &name), ("score", &score)] {
                let expected = memory.select_where("t_mix", column, value).unwrap();
                let actual = sqlite.select_where("t_mix", column, value).unwrap();
                prop_assert_eq!(keys(&actual), keys(&expected));
                if value.is_null() {
                    prop_assert!(actual.is_empty());
                }
            }
        }
    }

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("desc"), "\"desc\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
