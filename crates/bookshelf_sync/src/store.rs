//! Client-side mirror of the remote book collection.
//!
//! The [`CollectionStore`] is the single source of truth for which books
//! exist, as far as the Renderer is concerned. Every mutation intent goes
//! through exactly one transport call, and the mirror is patched only
//! after that call succeeds, using the record the server returned.
//!
//! # Consistency
//!
//! - The mirror is never touched before a transport call settles, so a
//!   failed call leaves it exactly as it was (the same snapshot `Arc`).
//! - Patches are keyed by id against the mirror current at resume time;
//!   intents on different ids may complete in any order.
//! - Two intents on the same id race; whichever resumes last wins.
//! - Dropping an intent future before its call settles leaves the mirror
//!   untouched. The remote side may still have applied the change.

use crate::error::{StoreError, StoreResult, TransportError};
use crate::transport::RemoteCollectionClient;
use bookshelf_protocol::{BookId, BookPatch, BookRecord, NewBook, Title};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// An immutable view of the mirror at one point in time.
pub type Snapshot = Arc<Vec<BookRecord>>;

/// Lifecycle of the store's initial load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// `initialize` has not been called.
    Unloaded,
    /// The list call is in flight.
    Loading,
    /// The mirror holds the server's collection.
    Ready,
    /// The last load failed; the mirror is unchanged from before it.
    Failed,
}

impl LoadState {
    /// Returns true once a load has succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }
}

/// Kind of a mutation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    /// Create a book.
    Create,
    /// Rename a book.
    Update,
    /// Delete a book.
    Remove,
}

/// Phase of a single intent: `Idle -> Pending -> Applied | Rejected -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentPhase {
    /// No call in flight.
    Idle,
    /// The transport call is in flight.
    Pending,
    /// The call succeeded and the mirror was patched (or the target was
    /// already gone from the mirror).
    Applied,
    /// The intent failed; the mirror is unchanged.
    Rejected,
}

/// Result of a successful update or remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    /// The mirror entry was patched.
    Applied(BookRecord),
    /// The remote call succeeded but the id was not in the mirror, so the
    /// mirror was left alone.
    Stale(BookRecord),
}

impl IntentOutcome {
    /// Returns the record the server returned.
    pub fn record(&self) -> &BookRecord {
        match self {
            IntentOutcome::Applied(record) | IntentOutcome::Stale(record) => record,
        }
    }

    /// Consumes the outcome, returning the server's record.
    pub fn into_record(self) -> BookRecord {
        match self {
            IntentOutcome::Applied(record) | IntentOutcome::Stale(record) => record,
        }
    }

    /// Returns true if the mirror was patched.
    pub fn is_applied(&self) -> bool {
        matches!(self, IntentOutcome::Applied(_))
    }
}

/// Statistics about store activity.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Successful loads.
    pub loads: u64,
    /// Intents that patched the mirror.
    pub intents_applied: u64,
    /// Intents whose target was no longer in the mirror.
    pub intents_stale: u64,
    /// Intents that failed after reaching the transport.
    pub intents_rejected: u64,
    /// Intents rejected locally before any transport call.
    pub validation_rejections: u64,
    /// Time of the last successful load.
    pub last_load_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Decrements the in-flight counter when the intent settles or is dropped.
struct PendingIntent<'a> {
    pending: &'a AtomicUsize,
}

impl<'a> PendingIntent<'a> {
    fn start(pending: &'a AtomicUsize) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self { pending }
    }
}

impl Drop for PendingIntent<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The client-side mirror of the remote collection.
///
/// Owned by the application's composition root and shared by reference
/// (or `Arc`) with whatever renders it. The mirror itself is private;
/// readers get [`Snapshot`]s and subscribers are woken on every change.
pub struct CollectionStore<C: RemoteCollectionClient> {
    client: Arc<C>,
    mirror: watch::Sender<Snapshot>,
    load_state: RwLock<LoadState>,
    stats: RwLock<StoreStats>,
    pending: AtomicUsize,
}

impl<C: RemoteCollectionClient> CollectionStore<C> {
    /// Creates an empty store over `client`.
    pub fn new(client: C) -> Self {
        Self::with_shared_client(Arc::new(client))
    }

    /// Creates an empty store over a shared client.
    pub fn with_shared_client(client: Arc<C>) -> Self {
        let (mirror, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            client,
            mirror,
            load_state: RwLock::new(LoadState::Unloaded),
            stats: RwLock::new(StoreStats::default()),
            pending: AtomicUsize::new(0),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the current mirror.
    pub fn books(&self) -> Snapshot {
        self.mirror.borrow().clone()
    }

    /// Returns the mirror entry with the given id.
    pub fn get(&self, id: &BookId) -> Option<BookRecord> {
        self.mirror.borrow().iter().find(|b| &b.id == id).cloned()
    }

    /// Returns the number of books in the mirror.
    pub fn len(&self) -> usize {
        self.mirror.borrow().len()
    }

    /// Returns true if the mirror is empty.
    pub fn is_empty(&self) -> bool {
        self.mirror.borrow().is_empty()
    }

    /// Subscribes to mirror changes.
    ///
    /// The receiver always holds the latest snapshot; it is marked changed
    /// after every load and every patch.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.mirror.subscribe()
    }

    /// Returns the load state.
    pub fn load_state(&self) -> LoadState {
        *self.load_state.read()
    }

    /// Returns the current stats.
    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }

    /// Returns the number of intents whose transport call is in flight.
    pub fn pending_intents(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Replaces the mirror with the server's full collection.
    ///
    /// Returns the number of books loaded. On failure the mirror is left
    /// as it was and the load state becomes [`LoadState::Failed`].
    pub async fn initialize(&self) -> StoreResult<usize> {
        *self.load_state.write() = LoadState::Loading;
        debug!("loading collection");

        let books = match self.client.list().await.and_then(check_unique) {
            Ok(books) => books,
            Err(e) => {
                *self.load_state.write() = LoadState::Failed;
                self.stats.write().last_error = Some(e.to_string());
                warn!(error = %e, "collection load failed");
                return Err(e.into());
            }
        };

        let count = books.len();
        self.mirror.send_replace(Arc::new(books));
        *self.load_state.write() = LoadState::Ready;
        {
            let mut stats = self.stats.write();
            stats.loads += 1;
            stats.last_load_time = Some(Instant::now());
            stats.last_error = None;
        }
        info!(count, "collection loaded");
        Ok(count)
    }

    /// Creates a book and appends the server's record to the mirror.
    ///
    /// A blank title is rejected without any transport call.
    pub async fn create(&self, title: &str) -> StoreResult<BookRecord> {
        let title = self.validate(IntentKind::Create, title)?;
        let _pending = PendingIntent::start(&self.pending);
        self.trace_phase(IntentKind::Create, None, IntentPhase::Pending);

        let record = match self.client.create(NewBook::new(title)).await {
            Ok(record) => record,
            Err(e) => return Err(self.reject(IntentKind::Create, None, e)),
        };

        let mut duplicate = false;
        self.mirror.send_if_modified(|books| {
            if books.iter().any(|b| b.id == record.id) {
                duplicate = true;
                return false;
            }
            Arc::make_mut(books).push(record.clone());
            true
        });
        if duplicate {
            let e = TransportError::Malformed(format!(
                "server assigned id {} which is already in use",
                record.id
            ));
            return Err(self.reject(IntentKind::Create, Some(&record.id), e));
        }

        self.settle(IntentKind::Create, &record.id, true);
        Ok(record)
    }

    /// Renames a book and replaces its mirror entry in place.
    ///
    /// If the id is no longer in the mirror the server's record is
    /// discarded and the outcome is [`IntentOutcome::Stale`].
    pub async fn update(&self, id: &BookId, title: &str) -> StoreResult<IntentOutcome> {
        let title = self.validate(IntentKind::Update, title)?;
        let _pending = PendingIntent::start(&self.pending);
        self.trace_phase(IntentKind::Update, Some(id), IntentPhase::Pending);

        let record = match self.client.update_by_id(id, BookPatch::new(title)).await {
            Ok(record) if &record.id != id => {
                let e = TransportError::Malformed(format!(
                    "update of {} returned book {}",
                    id, record.id
                ));
                return Err(self.reject(IntentKind::Update, Some(id), e));
            }
            Ok(record) => record,
            Err(e) => return Err(self.reject(IntentKind::Update, Some(id), e)),
        };

        let applied = self.mirror.send_if_modified(|books| {
            match books.iter().position(|b| &b.id == id) {
                Some(pos) => {
                    Arc::make_mut(books)[pos] = record.clone();
                    true
                }
                None => false,
            }
        });

        self.settle(IntentKind::Update, id, applied);
        Ok(if applied {
            IntentOutcome::Applied(record)
        } else {
            IntentOutcome::Stale(record)
        })
    }

    /// Deletes a book and removes its mirror entry.
    ///
    /// If the id is no longer in the mirror this is a no-op beyond the
    /// remote deletion, and the outcome is [`IntentOutcome::Stale`].
    pub async fn remove(&self, id: &BookId) -> StoreResult<IntentOutcome> {
        let _pending = PendingIntent::start(&self.pending);
        self.trace_phase(IntentKind::Remove, Some(id), IntentPhase::Pending);

        let record = match self.client.delete_by_id(id).await {
            Ok(record) => record,
            Err(e) => return Err(self.reject(IntentKind::Remove, Some(id), e)),
        };

        let mut removed = None;
        let applied = self.mirror.send_if_modified(|books| {
            match books.iter().position(|b| &b.id == id) {
                Some(pos) => {
                    removed = Some(Arc::make_mut(books).remove(pos));
                    true
                }
                None => false,
            }
        });

        self.settle(IntentKind::Remove, id, applied);
        Ok(match removed {
            // The server answered without a record; report the last state
            // the mirror held.
            Some(last) if record.title.is_empty() => IntentOutcome::Applied(last),
            Some(_) => IntentOutcome::Applied(record),
            None => IntentOutcome::Stale(record),
        })
    }

    fn validate(&self, kind: IntentKind, raw: &str) -> StoreResult<Title> {
        Title::parse(raw).map_err(|e| {
            debug!(intent = ?kind, "intent dropped: blank title");
            self.stats.write().validation_rejections += 1;
            StoreError::from(e)
        })
    }

    fn trace_phase(&self, kind: IntentKind, id: Option<&BookId>, phase: IntentPhase) {
        match id {
            Some(id) => debug!(intent = ?kind, %id, ?phase, "intent"),
            None => debug!(intent = ?kind, ?phase, "intent"),
        }
    }

    fn reject(&self, kind: IntentKind, id: Option<&BookId>, error: TransportError) -> StoreError {
        self.trace_phase(kind, id, IntentPhase::Rejected);
        warn!(intent = ?kind, error = %error, "intent rejected");
        {
            let mut stats = self.stats.write();
            stats.intents_rejected += 1;
            stats.last_error = Some(error.to_string());
        }
        StoreError::Transport(error)
    }

    fn settle(&self, kind: IntentKind, id: &BookId, applied: bool) {
        self.trace_phase(kind, Some(id), IntentPhase::Applied);
        let mut stats = self.stats.write();
        if applied {
            stats.intents_applied += 1;
        } else {
            warn!(intent = ?kind, %id, "book not in mirror; server record discarded");
            stats.intents_stale += 1;
        }
    }
}

fn check_unique(books: Vec<BookRecord>) -> Result<Vec<BookRecord>, TransportError> {
    let mut seen = HashSet::with_capacity(books.len());
    for book in &books {
        if !seen.insert(&book.id) {
            return Err(TransportError::Malformed(format!(
                "collection lists id {} more than once",
                book.id
            )));
        }
    }
    Ok(books)
}
