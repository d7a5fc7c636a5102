//! Add command implementation.

use crate::render::render;
use bookshelf_sync::{CollectionStore, RemoteCollectionClient, StoreResult};

/// Creates a book and renders the updated collection.
pub async fn run<C: RemoteCollectionClient>(
    store: &CollectionStore<C>,
    title: &str,
) -> StoreResult<String> {
    store.initialize().await?;
    store.create(title).await?;
    Ok(render(&store.books()))
}
