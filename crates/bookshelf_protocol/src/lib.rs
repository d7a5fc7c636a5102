//! # Bookshelf Protocol
//!
//! Wire types for the Bookshelf book collection API.
//!
//! This crate provides:
//! - `BookId`, the opaque server-assigned identifier
//! - `BookRecord`, the sole persisted entity
//! - `NewBook` / `BookPatch` request bodies
//! - `Title`, the trimmed, non-blank title every request carries
//! - Route constants shared by client and server
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Wire shape
//!
//! | Method   | Path          | Body      | Response          |
//! |----------|---------------|-----------|-------------------|
//! | `GET`    | `/books`      |           | `[{id, title}]`   |
//! | `GET`    | `/books/{id}` |           | `{id, title}`     |
//! | `POST`   | `/books`      | `{title}` | `{id, title}`     |
//! | `PUT`    | `/books/{id}` | `{title}` | `{id, title}`     |
//! | `DELETE` | `/books/{id}` |           | `{id, title}`     |

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod book;
mod error;
mod routes;
mod title;

pub use book::{BookId, BookPatch, BookRecord, NewBook};
pub use error::{ValidationError, ValidationResult};
pub use routes::{BOOKS_COLLECTION, BOOKS_PATH, HEALTH_PATH};
pub use title::Title;
