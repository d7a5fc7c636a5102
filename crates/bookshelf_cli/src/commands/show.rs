//! Show command implementation.

use crate::render::render_book;
use bookshelf_protocol::BookId;
use bookshelf_sync::{CollectionStore, RemoteCollectionClient, StoreResult};

/// Fetches a single book straight from the server.
pub async fn run<C: RemoteCollectionClient>(
    store: &CollectionStore<C>,
    id: &BookId,
) -> StoreResult<String> {
    let book = store.client().get_by_id(id).await?;
    Ok(render_book(&book))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_protocol::BookRecord;
    use bookshelf_sync::MockCollectionClient;

    #[tokio::test]
    async fn shows_one_book() {
        let store = CollectionStore::new(MockCollectionClient::with_books(vec![
            BookRecord::new(1u64, "Dune"),
            BookRecord::new(2u64, "Foundation"),
        ]));

        let out = run(&store, &BookId::from(2u64)).await.unwrap();
        assert_eq!(out, "  [2] Foundation");
        // Showing does not load the mirror.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = CollectionStore::new(MockCollectionClient::new());
        let err = run(&store, &BookId::from(9u64)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
