//! Text rendering of the book collection.

use bookshelf_protocol::BookRecord;
use std::fmt::Write;

/// Renders the collection as shown to the user.
///
/// ```text
/// My Books (2)
///   [1] Dune
///   [2] Foundation
/// ```
pub fn render(books: &[BookRecord]) -> String {
    let mut out = format!("My Books ({})", books.len());
    if books.is_empty() {
        out.push_str("\n  (no books yet)");
    }
    for book in books {
        let _ = write!(out, "\n{}", render_book(book));
    }
    out
}

/// Renders a single book line.
pub fn render_book(book: &BookRecord) -> String {
    format!("  [{}] {}", book.id, book.title)
}
