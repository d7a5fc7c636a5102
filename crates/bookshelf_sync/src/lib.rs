//! # Bookshelf Sync
//!
//! Client-side synchronization between a Renderer and the remote book
//! collection.
//!
//! This crate provides:
//! - `RemoteCollectionClient`, the transport abstraction (list, get,
//!   create, update, delete)
//! - `HttpCollectionClient`, a JSON-over-HTTP implementation
//! - `MockCollectionClient`, an in-memory remote with failure injection
//! - `CollectionStore`, the in-memory mirror every Renderer reads from
//!
//! ## Architecture
//!
//! The store implements a **wait-for-ack** model:
//! 1. The Renderer submits an intent (create, update, remove)
//! 2. The store makes exactly one transport call
//! 3. On success the mirror is patched with the server's record
//! 4. Subscribers are woken and re-render from the new snapshot
//!
//! ## Key Invariants
//!
//! - The server is authoritative for every record's final shape
//! - Blank titles never reach the transport
//! - A failed intent leaves the mirror unchanged
//! - Ids are unique within the mirror
//! - New books are appended; display order is arrival order

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod store;
mod transport;

pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{StoreError, StoreResult, TransportError, TransportResult};
pub use http::HttpCollectionClient;
pub use store::{
    CollectionStore, IntentKind, IntentOutcome, IntentPhase, LoadState, Snapshot, StoreStats,
};
pub use transport::{CallKind, MockCollectionClient, RemoteCollectionClient};
