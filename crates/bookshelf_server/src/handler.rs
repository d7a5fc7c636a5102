//! HTTP handlers for the book collection.
//!
//! ## Routes
//!
//! - `GET /health`: `{ "ok": true, "books": n }`
//! - `GET /books`: every book, in insertion order
//! - `POST /books`: create from `{ "title": .. }`, answers `201`
//! - `GET /books/:id`: a single book
//! - `PUT /books/:id`: replace the title from `{ "title": .. }`
//! - `DELETE /books/:id`: remove, answering with the removed book
//!
//! Errors are answered as `{ "error": message }` with the status from
//! [`ServerError::status_code`].

use crate::catalog::BookCatalog;
use crate::error::{ServerError, ServerResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bookshelf_protocol::{BookId, BookPatch, BookRecord, NewBook, BOOKS_PATH, HEALTH_PATH};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds the collection router over `catalog`.
pub fn router(catalog: Arc<BookCatalog>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(BOOKS_PATH, get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(catalog)
}

async fn health(State(catalog): State<Arc<BookCatalog>>) -> impl IntoResponse {
    Json(json!({ "ok": true, "books": catalog.len() }))
}

async fn list_books(State(catalog): State<Arc<BookCatalog>>) -> Json<Vec<BookRecord>> {
    let books = catalog.list();
    debug!(count = books.len(), "list books");
    Json(books)
}

async fn get_book(
    State(catalog): State<Arc<BookCatalog>>,
    Path(id): Path<String>,
) -> ServerResult<Json<BookRecord>> {
    catalog.get(&BookId::new(id)).map(Json)
}

async fn create_book(
    State(catalog): State<Arc<BookCatalog>>,
    body: Result<Json<NewBook>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<BookRecord>)> {
    let Json(book) = body.map_err(reject_body)?;
    let record = catalog.insert(book).await?;
    info!(id = %record.id, title = %record.title, "book created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_book(
    State(catalog): State<Arc<BookCatalog>>,
    Path(id): Path<String>,
    body: Result<Json<BookPatch>, JsonRejection>,
) -> ServerResult<Json<BookRecord>> {
    let Json(patch) = body.map_err(reject_body)?;
    let record = catalog.update(&BookId::new(id), patch).await?;
    info!(id = %record.id, title = %record.title, "book updated");
    Ok(Json(record))
}

async fn delete_book(
    State(catalog): State<Arc<BookCatalog>>,
    Path(id): Path<String>,
) -> ServerResult<Json<BookRecord>> {
    let record = catalog.remove(&BookId::new(id)).await?;
    info!(id = %record.id, "book deleted");
    Ok(Json(record))
}

fn reject_body(rejection: JsonRejection) -> ServerError {
    let message = rejection.body_text();
    warn!(%message, "rejected request body");
    ServerError::InvalidRequest(message)
}
