//! Book records and request bodies.

use crate::error::ValidationError;
use crate::title::Title;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier of a persisted book.
///
/// Ids are assigned by the server and carry no meaning to the client.
/// On the wire an id may be a JSON string or a JSON integer; both forms
/// name the same record (`1` and `"1"` are equal). Ids are always written
/// back as strings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookId(String);

impl BookId {
    /// Creates an id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the textual form of the id.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for BookId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BookId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl FromStr for BookId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Debug for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BookId({})", self.0)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for BookId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct BookIdVisitor;

impl Visitor<'_> for BookIdVisitor {
    type Value = BookId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer book id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<BookId, E> {
        Ok(BookId(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<BookId, E> {
        Ok(BookId(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<BookId, E> {
        Ok(BookId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<BookId, E> {
        Ok(BookId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BookIdVisitor)
    }
}

/// A persisted book, as returned by the server.
///
/// The title is whatever the server stored; the server is authoritative
/// for the final shape and may normalize what the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Server-assigned id.
    pub id: BookId,
    /// Title as persisted.
    pub title: String,
}

impl BookRecord {
    /// Creates a record.
    pub fn new(id: impl Into<BookId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Body of a create request: a book without an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    /// Title of the new book.
    pub title: Title,
}

impl NewBook {
    /// Creates a create-request body.
    pub fn new(title: Title) -> Self {
        Self { title }
    }
}

/// Body of an update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    /// Replacement title.
    pub title: Title,
}

impl BookPatch {
    /// Creates an update-request body.
    pub fn new(title: Title) -> Self {
        Self { title }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_accepts_numbers_and_strings() {
        let numeric: BookId = serde_json::from_str("7").unwrap();
        let textual: BookId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(numeric, textual);
        assert_eq!(numeric, BookId::from(7u64));
    }

    #[test]
    fn id_accepts_negative_numbers() {
        let id: BookId = serde_json::from_str("-3").unwrap();
        assert_eq!(id.as_str(), "-3");
    }

    #[test]
    fn id_rejects_other_json() {
        assert!(serde_json::from_str::<BookId>("true").is_err());
        assert!(serde_json::from_str::<BookId>("[1]").is_err());
    }

    #[test]
    fn id_serializes_as_string() {
        assert_eq!(serde_json::to_string(&BookId::from(12u64)).unwrap(), "\"12\"");
    }

    #[test]
    fn id_from_str() {
        assert_eq!(" 4a ".parse::<BookId>().unwrap(), BookId::from("4a"));
        assert_eq!("  ".parse::<BookId>(), Err(ValidationError::EmptyId));
    }

    #[test]
    fn record_from_json_server_shape() {
        let json = r#"[{"id":1,"title":"Dune"},{"id":"x2","title":"Foundation"}]"#;
        let books: Vec<BookRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(
            books,
            vec![
                BookRecord::new(1u64, "Dune"),
                BookRecord::new("x2", "Foundation"),
            ]
        );
    }

    #[test]
    fn record_ignores_unknown_fields() {
        let json = r#"{"id":3,"title":"Emma","author":"Austen","rating":4}"#;
        let book: BookRecord = serde_json::from_str(json).unwrap();
        assert_eq!(book, BookRecord::new(3u64, "Emma"));
    }

    #[test]
    fn new_book_body_has_no_id() {
        let body = NewBook::new(Title::parse("  Dune ").unwrap());
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"title":"Dune"}"#);
    }

    #[test]
    fn patch_rejects_blank_title() {
        assert!(serde_json::from_str::<BookPatch>(r#"{"title":" "}"#).is_err());
        assert!(serde_json::from_str::<BookPatch>(r#"{}"#).is_err());
    }
}
