//! CLI command implementations.
//!
//! One-shot commands take a store and return the text to print, so they
//! can run against any `RemoteCollectionClient`.

pub mod add;
pub mod list;
pub mod remove;
pub mod rename;
pub mod serve;
pub mod shell;
pub mod show;

use bookshelf_sync::{
    ClientConfig, CollectionStore, HttpCollectionClient, IntentOutcome, TransportResult,
};
use std::time::Duration;

/// Builds a store talking HTTP to `url`.
pub fn connect(
    url: &str,
    timeout: Option<Duration>,
) -> TransportResult<CollectionStore<HttpCollectionClient>> {
    let mut config = ClientConfig::new(url);
    if let Some(timeout) = timeout {
        config = config.with_timeout(timeout);
    }
    let client = HttpCollectionClient::new(config)?;
    Ok(CollectionStore::new(client))
}

/// Describes a settled update or remove for the user.
fn describe(verb: &str, outcome: &IntentOutcome) -> String {
    let book = outcome.record();
    if outcome.is_applied() {
        format!("{} [{}] {}", verb, book.id, book.title)
    } else {
        format!(
            "{} [{}] on the server, but it was no longer listed here",
            verb, book.id
        )
    }
}
