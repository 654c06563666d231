use std::sync::Arc;

use anyhow::{Context, Result};
use nimbus_storage::{KeyValueStore, StoreResult};

/// Run a key-value operation on the blocking pool.
pub(crate) async fn run_blocking<F, R>(store: &Arc<dyn KeyValueStore>, op: F) -> Result<R>
where
    F: FnOnce(&dyn KeyValueStore) -> StoreResult<R> + Send + 'static,
    R: Send + 'static,
{
    let store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .context("Storage task panicked")?;
    Ok(result?)
}
