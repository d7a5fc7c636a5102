//! # Bookshelf Server
//!
//! Reference JSON collection server for Bookshelf.
//!
//! This crate provides:
//! - The `/books` collection resource (list, get, create, update, delete)
//! - A `/health` endpoint
//! - Optional persistence to a `json-server` compatible `db.json`
//!
//! # Architecture
//!
//! The server is the authority for ids and titles. It assigns ids from a
//! counter that never goes backwards, trims titles and rejects blank ones
//! with `400`. Clients mirror whatever it answers.
//!
//! ```no_run
//! use bookshelf_server::{BookServer, ServerConfig};
//!
//! # async fn run() -> bookshelf_server::ServerResult<()> {
//! let config = ServerConfig::default().with_db_path("db.json");
//! BookServer::new(config)?.bind().await?.run().await
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod catalog;
mod config;
mod error;
mod handler;
mod server;

pub use catalog::BookCatalog;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::router;
pub use server::{BookServer, BoundServer};
