//! Transport layer abstraction for the remote book collection.

use crate::error::{TransportError, TransportResult};
use async_trait::async_trait;
use bookshelf_protocol::{BookId, BookPatch, BookRecord, NewBook};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A client for the remote book collection.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-memory mock for testing, etc.).
///
/// Every call makes exactly one attempt and either resolves or fails once.
/// Failures are returned as-is; retry policy, if any, belongs to the caller.
#[async_trait]
pub trait RemoteCollectionClient: Send + Sync {
    /// Fetches the full current collection, in server order.
    async fn list(&self) -> TransportResult<Vec<BookRecord>>;

    /// Fetches a single book.
    async fn get_by_id(&self, id: &BookId) -> TransportResult<BookRecord>;

    /// Creates a book and returns it with its server-assigned id.
    async fn create(&self, book: NewBook) -> TransportResult<BookRecord>;

    /// Updates a book and returns the record as persisted.
    async fn update_by_id(&self, id: &BookId, patch: BookPatch) -> TransportResult<BookRecord>;

    /// Deletes a book and returns its last known state.
    async fn delete_by_id(&self, id: &BookId) -> TransportResult<BookRecord>;
}

#[async_trait]
impl<C: RemoteCollectionClient + ?Sized> RemoteCollectionClient for Arc<C> {
    async fn list(&self) -> TransportResult<Vec<BookRecord>> {
        (**self).list().await
    }

    async fn get_by_id(&self, id: &BookId) -> TransportResult<BookRecord> {
        (**self).get_by_id(id).await
    }

    async fn create(&self, book: NewBook) -> TransportResult<BookRecord> {
        (**self).create(book).await
    }

    async fn update_by_id(&self, id: &BookId, patch: BookPatch) -> TransportResult<BookRecord> {
        (**self).update_by_id(id, patch).await
    }

    async fn delete_by_id(&self, id: &BookId) -> TransportResult<BookRecord> {
        (**self).delete_by_id(id).await
    }
}

/// The kind of a transport call, as recorded by [`MockCollectionClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `list`
    List,
    /// `get_by_id`
    Get,
    /// `create`
    Create,
    /// `update_by_id`
    Update,
    /// `delete_by_id`
    Delete,
}

type TitleNormalizer = Box<dyn Fn(&str) -> String + Send + Sync>;

/// An in-memory remote collection for testing.
///
/// Behaves like a well-formed server (ids assigned from a counter, not
/// found on unknown ids) and adds failure injection, disconnects,
/// per-call latency and a call log.
pub struct MockCollectionClient {
    books: Mutex<Vec<BookRecord>>,
    next_id: AtomicU64,
    connected: AtomicBool,
    failures: Mutex<HashMap<CallKind, VecDeque<TransportError>>>,
    latency: Mutex<HashMap<CallKind, Duration>>,
    normalizer: Mutex<Option<TitleNormalizer>>,
    calls: Mutex<Vec<CallKind>>,
}

impl MockCollectionClient {
    /// Creates an empty remote collection.
    pub fn new() -> Self {
        Self {
            books: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            failures: Mutex::new(HashMap::new()),
            latency: Mutex::new(HashMap::new()),
            normalizer: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a remote collection holding `books`.
    ///
    /// New ids continue after the largest numeric id present.
    pub fn with_books(books: Vec<BookRecord>) -> Self {
        let next = books
            .iter()
            .filter_map(|b| b.id.as_str().parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        let mock = Self::new();
        *mock.books.lock() = books;
        mock.next_id.store(next, Ordering::SeqCst);
        mock
    }

    /// Makes the next call of `kind` fail with `error`.
    ///
    /// Several failures for the same kind are consumed in order.
    pub fn fail_next(&self, kind: CallKind, error: TransportError) {
        self.failures.lock().entry(kind).or_default().push_back(error);
    }

    /// Sets the connected state. A disconnected mock fails every call
    /// with [`TransportError::Unreachable`].
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Checks if the mock is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Delays every call of `kind` by `delay` before it is answered.
    pub fn set_latency(&self, kind: CallKind, delay: Duration) {
        self.latency.lock().insert(kind, delay);
    }

    /// Installs a server-side title normalizer applied on create and update.
    pub fn set_normalizer(&self, normalizer: impl Fn(&str) -> String + Send + Sync + 'static) {
        *self.normalizer.lock() = Some(Box::new(normalizer));
    }

    /// Adds a book directly to the remote side, bypassing the call log.
    pub fn insert_remote(&self, title: impl Into<String>) -> BookRecord {
        let record = BookRecord::new(self.next_id.fetch_add(1, Ordering::SeqCst), title);
        self.books.lock().push(record.clone());
        record
    }

    /// Removes a book directly from the remote side, bypassing the call log.
    pub fn remove_remote(&self, id: &BookId) -> Option<BookRecord> {
        let mut books = self.books.lock();
        let pos = books.iter().position(|b| &b.id == id)?;
        Some(books.remove(pos))
    }

    /// Returns the remote collection.
    pub fn remote_books(&self) -> Vec<BookRecord> {
        self.books.lock().clone()
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<CallKind> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn begin(&self, kind: CallKind) -> TransportResult<()> {
        self.calls.lock().push(kind);

        let delay = self.latency.lock().get(&kind).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if !self.is_connected() {
            return Err(TransportError::unreachable("mock transport disconnected"));
        }
        let injected = self
            .failures
            .lock()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn normalize(&self, title: &str) -> String {
        match self.normalizer.lock().as_ref() {
            Some(normalize) => normalize(title),
            None => title.to_string(),
        }
    }
}

impl Default for MockCollectionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteCollectionClient for MockCollectionClient {
    async fn list(&self) -> TransportResult<Vec<BookRecord>> {
        self.begin(CallKind::List).await?;
        Ok(self.remote_books())
    }

    async fn get_by_id(&self, id: &BookId) -> TransportResult<BookRecord> {
        self.begin(CallKind::Get).await?;
        self.books
            .lock()
            .iter()
            .find(|b| &b.id == id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(id.clone()))
    }

    async fn create(&self, book: NewBook) -> TransportResult<BookRecord> {
        self.begin(CallKind::Create).await?;
        let title = self.normalize(book.title.as_str());
        Ok(self.insert_remote(title))
    }

    async fn update_by_id(&self, id: &BookId, patch: BookPatch) -> TransportResult<BookRecord> {
        self.begin(CallKind::Update).await?;
        let title = self.normalize(patch.title.as_str());
        let mut books = self.books.lock();
        let book = books
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| TransportError::NotFound(id.clone()))?;
        book.title = title;
        Ok(book.clone())
    }

    async fn delete_by_id(&self, id: &BookId) -> TransportResult<BookRecord> {
        self.begin(CallKind::Delete).await?;
        self.remove_remote(id)
            .ok_or_else(|| TransportError::NotFound(id.clone()))
    }
}
