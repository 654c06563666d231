//! Durable key-value persistence for Nimbus.
//!
//! This crate provides the `KeyValueStore` trait that higher layers (the
//! weather cache, favorites, recent searches) are written against, with a
//! SQLite implementation for on-device storage and an in-memory one.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use nimbus_core::DatabaseError;

/// Result type for key-value store operations.
pub type StoreResult<T> = Result<T, DatabaseError>;

/// String-keyed, string-valued durable storage.
///
/// Each individual operation is atomic. Writes to the same key are
/// last-write-wins; there is no versioning or merge.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite a value.
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// Every key currently stored, in no particular order.
    fn all_keys(&self) -> StoreResult<Vec<String>>;

    /// Delete several keys as one batch.
    fn multi_remove(&self, keys: &[String]) -> StoreResult<()>;
}
