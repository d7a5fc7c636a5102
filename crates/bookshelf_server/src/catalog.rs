//! Server-side book catalog.

use crate::error::{ServerError, ServerResult};
use bookshelf_protocol::{BookId, BookPatch, BookRecord, NewBook};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// On-disk layout, compatible with a `json-server` `db.json`.
///
/// Collections other than `books` are kept as read and written back
/// unchanged.
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    books: Vec<Map<String, Value>>,
    #[serde(flatten)]
    collections: Map<String, Value>,
}

/// A book as held by the catalog.
#[derive(Debug, Clone)]
struct StoredBook {
    record: BookRecord,
    /// Set when the id is written as a JSON number.
    id_number: Option<u64>,
    /// Fields besides `id` and `title`, written back untouched.
    extra: Map<String, Value>,
}

impl StoredBook {
    fn assigned(id: u64, title: String) -> Self {
        Self {
            record: BookRecord::new(id, title),
            id_number: Some(id),
            extra: Map::new(),
        }
    }

    fn from_record(record: BookRecord) -> Self {
        let id_number = record.id.as_str().parse().ok();
        Self {
            record,
            id_number,
            extra: Map::new(),
        }
    }

    fn from_json(mut fields: Map<String, Value>) -> serde_json::Result<Self> {
        let id_number = fields.get("id").and_then(Value::as_u64);
        let record = BookRecord::deserialize(Value::Object(fields.clone()))?;
        fields.remove("id");
        fields.remove("title");
        Ok(Self {
            record,
            id_number,
            extra: fields,
        })
    }

    fn to_json(&self) -> Value {
        let id = match self.id_number {
            Some(n) => Value::from(n),
            None => Value::from(self.record.id.as_str()),
        };
        let mut fields = self.extra.clone();
        fields.insert("id".to_string(), id);
        fields.insert("title".to_string(), Value::from(self.record.title.as_str()));
        Value::Object(fields)
    }
}

#[derive(Clone)]
struct CatalogState {
    /// Books in insertion order.
    books: Vec<StoredBook>,
    /// Next id to assign. Ids are never reused.
    next_id: u64,
}

impl CatalogState {
    fn position(&self, id: &BookId) -> ServerResult<usize> {
        self.books
            .iter()
            .position(|b| &b.record.id == id)
            .ok_or_else(|| ServerError::NotFound(id.clone()))
    }
}

/// The authoritative book collection.
///
/// The catalog maintains:
/// - All books in insertion order
/// - A monotonically increasing id counter
/// - Optionally, a JSON file rewritten after every mutation
///
/// Mutations are serialised by a write gate. The file is written on the
/// blocking pool and the new state is committed to memory only after the
/// write succeeded, so a failed write leaves the catalog unchanged. Reads
/// never wait on the file.
///
/// A mutation whose caller goes away mid-write still finishes: the gate
/// travels with the blocking write and is released once memory matches
/// the file.
pub struct BookCatalog {
    state: Arc<RwLock<CatalogState>>,
    writer: Arc<Mutex<()>>,
    db_path: Option<PathBuf>,
    collections: Map<String, Value>,
}

impl BookCatalog {
    /// Creates an empty in-memory catalog.
    pub fn new() -> Self {
        Self::from_state(
            CatalogState {
                books: Vec::new(),
                next_id: 1,
            },
            None,
            Map::new(),
        )
    }

    /// Creates an in-memory catalog holding `books`.
    pub fn with_books(books: Vec<BookRecord>) -> ServerResult<Self> {
        let books = books.into_iter().map(StoredBook::from_record).collect();
        Ok(Self::from_state(seed(books)?, None, Map::new()))
    }

    /// Opens a catalog backed by a JSON file.
    ///
    /// A missing file starts an empty catalog; the file is created on the
    /// first mutation.
    pub fn open(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let unreadable = |e: serde_json::Error| {
            ServerError::Storage(format!("cannot parse {}: {}", path.display(), e))
        };

        let file = if path.exists() {
            let bytes = fs::read(path)?;
            serde_json::from_slice::<CatalogFile>(&bytes).map_err(unreadable)?
        } else {
            CatalogFile::default()
        };
        let books = file
            .books
            .into_iter()
            .map(StoredBook::from_json)
            .collect::<Result<Vec<_>, _>>()
            .map_err(unreadable)?;

        let catalog =
            Self::from_state(seed(books)?, Some(path.to_path_buf()), file.collections);
        info!(
            path = %path.display(),
            count = catalog.len(),
            collections = catalog.collections.len(),
            "catalog opened"
        );
        Ok(catalog)
    }

    fn from_state(
        state: CatalogState,
        db_path: Option<PathBuf>,
        collections: Map<String, Value>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            writer: Arc::new(Mutex::new(())),
            db_path,
            collections,
        }
    }

    /// Returns the backing file, if any.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Returns all books in insertion order.
    pub fn list(&self) -> Vec<BookRecord> {
        self.state
            .read()
            .books
            .iter()
            .map(|b| b.record.clone())
            .collect()
    }

    /// Returns the number of books.
    pub fn len(&self) -> usize {
        self.state.read().books.len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().books.is_empty()
    }

    /// Returns a single book.
    pub fn get(&self, id: &BookId) -> ServerResult<BookRecord> {
        let state = self.state.read();
        let pos = state.position(id)?;
        Ok(state.books[pos].record.clone())
    }

    /// Appends a book under a fresh id.
    pub async fn insert(&self, book: NewBook) -> ServerResult<BookRecord> {
        let gate = Arc::clone(&self.writer).lock_owned().await;
        let mut next = self.state.read().clone();

        let stored = StoredBook::assigned(next.next_id, book.title.into_string());
        let record = stored.record.clone();
        next.books.push(stored);
        next.next_id += 1;

        self.commit(gate, next).await?;
        debug!(id = %record.id, "book inserted");
        Ok(record)
    }

    /// Replaces a book's title.
    pub async fn update(&self, id: &BookId, patch: BookPatch) -> ServerResult<BookRecord> {
        let gate = Arc::clone(&self.writer).lock_owned().await;
        let mut next = self.state.read().clone();

        let pos = next.position(id)?;
        next.books[pos].record.title = patch.title.into_string();
        let record = next.books[pos].record.clone();

        self.commit(gate, next).await?;
        debug!(%id, "book updated");
        Ok(record)
    }

    /// Removes a book, returning its last state.
    pub async fn remove(&self, id: &BookId) -> ServerResult<BookRecord> {
        let gate = Arc::clone(&self.writer).lock_owned().await;
        let mut next = self.state.read().clone();

        let pos = next.position(id)?;
        let record = next.books.remove(pos).record;

        self.commit(gate, next).await?;
        debug!(%id, "book removed");
        Ok(record)
    }

    /// Writes `next` to the backing file, if there is one, then makes it
    /// the current state.
    async fn commit(&self, gate: OwnedMutexGuard<()>, next: CatalogState) -> ServerResult<()> {
        let Some(path) = self.db_path.clone() else {
            *self.state.write() = next;
            return Ok(());
        };

        let json = self.encode(&next.books)?;
        let state = Arc::clone(&self.state);
        tokio::task::spawn_blocking(move || -> ServerResult<()> {
            let _gate = gate;
            // Write next to the target and rename, so a crash never leaves
            // a half-written database.
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, json)?;
            fs::rename(&tmp, &path)?;
            *state.write() = next;
            Ok(())
        })
        .await
        .map_err(|e| ServerError::Storage(format!("database write did not finish: {e}")))?
    }

    fn encode(&self, books: &[StoredBook]) -> ServerResult<Vec<u8>> {
        let mut file = self.collections.clone();
        file.insert(
            "books".to_string(),
            Value::Array(books.iter().map(StoredBook::to_json).collect()),
        );
        serde_json::to_vec_pretty(&Value::Object(file))
            .map_err(|e| ServerError::Storage(e.to_string()))
    }
}

impl Default for BookCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks `books` for duplicate ids and picks the first free numeric id.
fn seed(books: Vec<StoredBook>) -> ServerResult<CatalogState> {
    let mut seen = HashSet::with_capacity(books.len());
    for book in &books {
        if !seen.insert(&book.record.id) {
            return Err(ServerError::Storage(format!(
                "duplicate book id {}",
                book.record.id
            )));
        }
    }

    let next_id = books
        .iter()
        .filter_map(|b| b.record.id.as_str().parse::<u64>().ok())
        .max()
        .map_or(1, |max| max + 1);
    Ok(CatalogState { books, next_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_protocol::Title;
    use serde_json::json;
    use std::time::Duration;

    fn new_book(title: &str) -> NewBook {
        NewBook::new(Title::parse(title).unwrap())
    }

    fn patch(title: &str) -> BookPatch {
        BookPatch::new(Title::parse(title).unwrap())
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let catalog = BookCatalog::new();
        let a = catalog.insert(new_book("Dune")).await.unwrap();
        let b = catalog.insert(new_book("Emma")).await.unwrap();

        assert_eq!(a.id, BookId::from(1u64));
        assert_eq!(b.id, BookId::from(2u64));
        assert_eq!(catalog.list(), vec![a, b]);
    }

    #[tokio::test]
    async fn ids_are_not_reused() {
        let catalog = BookCatalog::new();
        let a = catalog.insert(new_book("Dune")).await.unwrap();
        catalog.remove(&a.id).await.unwrap();

        let b = catalog.insert(new_book("Emma")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn update_keeps_position() {
        let catalog = BookCatalog::new();
        catalog.insert(new_book("Dune")).await.unwrap();
        let emma = catalog.insert(new_book("Emma")).await.unwrap();
        catalog.insert(new_book("Ulysses")).await.unwrap();

        let updated = catalog.update(&emma.id, patch("Persuasion")).await.unwrap();
        assert_eq!(updated.title, "Persuasion");
        assert_eq!(catalog.list()[1], updated);
    }

    #[tokio::test]
    async fn unknown_id() {
        let catalog = BookCatalog::new();
        let id = BookId::from(3u64);

        assert!(matches!(catalog.get(&id), Err(ServerError::NotFound(_))));
        assert!(matches!(
            catalog.update(&id, patch("x")).await,
            Err(ServerError::NotFound(_))
        ));
        assert!(matches!(
            catalog.remove(&id).await,
            Err(ServerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn seeded_catalog_continues_numbering() {
        let catalog = BookCatalog::with_books(vec![
            BookRecord::new(9u64, "Dune"),
            BookRecord::new("isbn-1", "Emma"),
        ])
        .unwrap();

        let created = catalog.insert(new_book("Ulysses")).await.unwrap();
        assert_eq!(created.id, BookId::from(10u64));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = BookCatalog::with_books(vec![
            BookRecord::new(1u64, "Dune"),
            BookRecord::new("1", "Emma"),
        ]);
        assert!(matches!(result, Err(ServerError::Storage(_))));
    }

    #[tokio::test]
    async fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let catalog = BookCatalog::open(&path).unwrap();
        assert!(catalog.is_empty());
        assert!(!path.exists());

        catalog.insert(new_book("Dune")).await.unwrap();
        catalog.insert(new_book("Emma")).await.unwrap();
        catalog.remove(&BookId::from(1u64)).await.unwrap();
        drop(catalog);

        let reopened = BookCatalog::open(&path).unwrap();
        assert_eq!(reopened.list(), vec![BookRecord::new(2u64, "Emma")]);
        assert_eq!(reopened.db_path(), Some(path.as_path()));

        let next = reopened.insert(new_book("Ulysses")).await.unwrap();
        assert_eq!(next.id, BookId::from(3u64));
    }

    #[tokio::test]
    async fn opens_json_server_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(
            &path,
            r#"{"books":[{"id":1,"title":"Dune"},{"id":4,"title":"Emma"}],"authors":[]}"#,
        )
        .unwrap();

        let catalog = BookCatalog::open(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.insert(new_book("Ulysses")).await.unwrap().id,
            BookId::from(5u64)
        );
    }

    #[tokio::test]
    async fn rewrite_keeps_other_collections_and_id_forms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(
            &path,
            r#"{
                "books": [
                    {"id": 1, "title": "Dune", "author": "Herbert"},
                    {"id": "isbn-9", "title": "Emma"}
                ],
                "authors": [{"id": 1, "name": "Austen"}],
                "profile": {"name": "reader"}
            }"#,
        )
        .unwrap();

        let catalog = BookCatalog::open(&path).unwrap();
        catalog
            .update(&BookId::from(1u64), patch("Dune Messiah"))
            .await
            .unwrap();
        catalog.insert(new_book("Ulysses")).await.unwrap();

        assert_eq!(
            read_json(&path),
            json!({
                "books": [
                    {"id": 1, "title": "Dune Messiah", "author": "Herbert"},
                    {"id": "isbn-9", "title": "Emma"},
                    {"id": 2, "title": "Ulysses"}
                ],
                "authors": [{"id": 1, "name": "Austen"}],
                "profile": {"name": "reader"}
            })
        );
    }

    #[test]
    fn corrupt_database_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            BookCatalog::open(&path),
            Err(ServerError::Storage(_))
        ));
    }

    #[test]
    fn book_without_title_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, r#"{"books":[{"id":1}]}"#).unwrap();

        assert!(matches!(
            BookCatalog::open(&path),
            Err(ServerError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn failed_write_leaves_catalog_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let catalog = BookCatalog::open(&path).unwrap();
        catalog.insert(new_book("Dune")).await.unwrap();

        // Removing the directory makes every later write fail.
        drop(dir);

        assert!(catalog.insert(new_book("Emma")).await.is_err());
        assert!(catalog.remove(&BookId::from(1u64)).await.is_err());
        assert_eq!(catalog.list(), vec![BookRecord::new(1u64, "Dune")]);
    }

    #[tokio::test]
    async fn abandoned_write_still_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let catalog = BookCatalog::open(&path).unwrap();

        // The caller gives up while the file is being written.
        let _ = tokio::time::timeout(Duration::ZERO, catalog.insert(new_book("Dune"))).await;
        catalog.insert(new_book("Emma")).await.unwrap();

        let expected = vec![
            BookRecord::new(1u64, "Dune"),
            BookRecord::new(2u64, "Emma"),
        ];
        assert_eq!(catalog.list(), expected);
        assert_eq!(BookCatalog::open(&path).unwrap().list(), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_are_serialised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let catalog = Arc::new(BookCatalog::open(&path).unwrap());

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..8 {
            let catalog = Arc::clone(&catalog);
            tasks.spawn(async move { catalog.insert(new_book(&format!("Book {n}"))).await });
        }
        let mut ids = HashSet::new();
        while let Some(result) = tasks.join_next().await {
            ids.insert(result.unwrap().unwrap().id);
        }

        assert_eq!(ids.len(), 8);
        assert_eq!(catalog.len(), 8);
        assert_eq!(BookCatalog::open(&path).unwrap().list(), catalog.list());
    }
}
