//! SQLite-backed key-value store.

use std::path::Path;

use nimbus_core::{DatabaseError, RusqliteErrorExt};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::{KeyValueStore, StoreResult};

/// SQLite key-value store.
///
/// The connection is guarded by a mutex so concurrent callers on the
/// blocking pool serialize per operation.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// Creates parent directories and the schema if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_database_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!("Opened key-value store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (for tests and throwaway sessions).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_database_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                "#,
            )
            .map_err(RusqliteErrorExt::into_database_error)
    }
}

impl KeyValueStore for SqliteStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(RusqliteErrorExt::into_database_error)
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(RusqliteErrorExt::into_database_error)?;
        Ok(())
    }

    fn all_keys(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT key FROM kv")
            .map_err(RusqliteErrorExt::into_database_error)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(RusqliteErrorExt::into_database_error)?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(RusqliteErrorExt::into_database_error)
    }

    fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(RusqliteErrorExt::into_database_error)?;
        {
            let mut stmt = tx
                .prepare("DELETE FROM kv WHERE key = ?1")
                .map_err(RusqliteErrorExt::into_database_error)?;
            for key in keys {
                stmt.execute(params![key])
                    .map_err(RusqliteErrorExt::into_database_error)?;
            }
        }
        tx.commit().map_err(RusqliteErrorExt::into_database_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_item() {
        let store = SqliteStore::in_memory().unwrap();
        store.set_item("greeting", "hello").unwrap();
        assert_eq!(store.get_item("greeting").unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_item("nope").unwrap().is_none());
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let store = SqliteStore::in_memory().unwrap();
        store.set_item("k", "first").unwrap();
        store.set_item("k", "second").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("second"));
        assert_eq!(store.all_keys().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_item_and_absent_remove() {
        let store = SqliteStore::in_memory().unwrap();
        store.set_item("k", "v").unwrap();
        store.remove_item("k").unwrap();
        store.remove_item("k").unwrap();
        assert!(store.get_item("k").unwrap().is_none());
    }

    #[test]
    fn test_multi_remove_only_named_keys() {
        let store = SqliteStore::in_memory().unwrap();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        store.set_item("c", "3").unwrap();

        store
            .multi_remove(&["a".to_string(), "c".to_string(), "missing".to_string()])
            .unwrap();

        let mut keys = store.all_keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["b".to_string()]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_item("weather_cache_all_weather", "{}").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get_item("weather_cache_all_weather").unwrap().as_deref(),
            Some("{}")
        );
    }
}
