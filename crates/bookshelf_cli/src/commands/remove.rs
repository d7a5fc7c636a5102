//! Remove command implementation.

use super::describe;
use crate::render::render;
use bookshelf_protocol::BookId;
use bookshelf_sync::{CollectionStore, RemoteCollectionClient, StoreResult};

/// Deletes a book and renders the updated collection.
pub async fn run<C: RemoteCollectionClient>(
    store: &CollectionStore<C>,
    id: &BookId,
) -> StoreResult<String> {
    store.initialize().await?;
    let outcome = store.remove(id).await?;
    Ok(format!(
        "{}\n{}",
        describe("removed", &outcome),
        render(&store.books())
    ))
}
