//! Route constants.

/// Name of the collection resource, used as a single URL path segment.
pub const BOOKS_COLLECTION: &str = "books";

/// Path of the collection resource.
pub const BOOKS_PATH: &str = "/books";

/// Liveness probe served by the reference server.
pub const HEALTH_PATH: &str = "/health";
