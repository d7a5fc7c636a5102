//! Rename command implementation.

use super::describe;
use crate::render::render;
use bookshelf_protocol::BookId;
use bookshelf_sync::{CollectionStore, RemoteCollectionClient, StoreResult};

/// Renames a book and renders the updated collection.
pub async fn run<C: RemoteCollectionClient>(
    store: &CollectionStore<C>,
    id: &BookId,
    title: &str,
) -> StoreResult<String> {
    store.initialize().await?;
    let outcome = store.update(id, title).await?;
    Ok(format!(
        "{}\n{}",
        describe("renamed", &outcome),
        render(&store.books())
    ))
}
