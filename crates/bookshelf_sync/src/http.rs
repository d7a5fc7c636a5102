//! HTTP transport implementation.
//!
//! Talks JSON to a collection resource at `{base_url}/books`, one request
//! per call. Status codes are mapped as follows:
//!
//! - 2xx: body decoded as the expected record(s), otherwise `Malformed`
//! - 404 on an id-addressed call: `NotFound`
//! - any other non-2xx: `Status`
//! - no response at all: `Unreachable`

use crate::config::ClientConfig;
use crate::error::{TransportError, TransportResult};
use crate::transport::RemoteCollectionClient;
use async_trait::async_trait;
use bookshelf_protocol::{BookId, BookPatch, BookRecord, NewBook, BOOKS_COLLECTION};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// HTTP-based remote collection client.
#[derive(Debug, Clone)]
pub struct HttpCollectionClient {
    config: ClientConfig,
    collection_url: Url,
    http: reqwest::Client,
}

impl HttpCollectionClient {
    /// Creates a client for the server named in `config`.
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        let mut collection_url = Url::parse(&config.base_url).map_err(|e| {
            TransportError::InvalidConfig(format!("invalid base URL {:?}: {}", config.base_url, e))
        })?;
        collection_url
            .path_segments_mut()
            .map_err(|()| {
                TransportError::InvalidConfig(format!(
                    "{:?} cannot be used as a base URL",
                    config.base_url
                ))
            })?
            .pop_if_empty()
            .push(BOOKS_COLLECTION);

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config,
            collection_url,
            http,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the URL of the collection resource.
    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    /// Returns the URL of a single book.
    pub fn book_url(&self, id: &BookId) -> Url {
        let mut url = self.collection_url.clone();
        // `new` rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id.as_str());
        }
        url
    }

    /// Sends a request and decodes a JSON body.
    ///
    /// `target` is the id the request addresses; a 404 on such a request
    /// becomes `NotFound`.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        target: Option<&BookId>,
    ) -> TransportResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::unreachable(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response received");

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = target {
                return Err(TransportError::NotFound(id.clone()));
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::status(status.as_u16(), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::unreachable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

/// Body of a delete response.
///
/// Some collection servers answer a delete with `{}`; missing fields are
/// filled from the request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeletedBook {
    id: Option<BookId>,
    title: Option<String>,
}

#[async_trait]
impl RemoteCollectionClient for HttpCollectionClient {
    async fn list(&self) -> TransportResult<Vec<BookRecord>> {
        debug!(url = %self.collection_url, "GET collection");
        self.send_json(self.http.get(self.collection_url.clone()), None)
            .await
    }

    async fn get_by_id(&self, id: &BookId) -> TransportResult<BookRecord> {
        let url = self.book_url(id);
        debug!(%url, "GET book");
        self.send_json(self.http.get(url), Some(id)).await
    }

    async fn create(&self, book: NewBook) -> TransportResult<BookRecord> {
        debug!(url = %self.collection_url, title = %book.title, "POST book");
        let request = self.http.post(self.collection_url.clone()).json(&book);
        self.send_json(request, None).await
    }

    async fn update_by_id(&self, id: &BookId, patch: BookPatch) -> TransportResult<BookRecord> {
        let url = self.book_url(id);
        debug!(%url, title = %patch.title, "PUT book");
        self.send_json(self.http.put(url).json(&patch), Some(id))
            .await
    }

    async fn delete_by_id(&self, id: &BookId) -> TransportResult<BookRecord> {
        let url = self.book_url(id);
        debug!(%url, "DELETE book");
        let deleted: DeletedBook = self.send_json(self.http.delete(url), Some(id)).await?;
        if deleted.title.is_none() {
            debug!(%id, "delete response carried no record");
        }
        Ok(BookRecord {
            id: deleted.id.unwrap_or_else(|| id.clone()),
            title: deleted.title.unwrap_or_default(),
        })
    }
}
