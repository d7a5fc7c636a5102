//! List command implementation.

use crate::render::render;
use bookshelf_sync::{CollectionStore, RemoteCollectionClient, StoreResult};

/// Loads the collection and renders it.
pub async fn run<C: RemoteCollectionClient>(store: &CollectionStore<C>) -> StoreResult<String> {
    store.initialize().await?;
    Ok(render(&store.books()))
}
