//! Server lifecycle.

use crate::catalog::BookCatalog;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The book collection server.
///
/// # Example
///
/// ```no_run
/// use bookshelf_server::{BookServer, ServerConfig};
///
/// # async fn run() -> bookshelf_server::ServerResult<()> {
/// let server = BookServer::new(ServerConfig::default())?;
/// server.bind().await?.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct BookServer {
    config: ServerConfig,
    catalog: Arc<BookCatalog>,
}

impl BookServer {
    /// Creates a server, opening the database file if one is configured.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let catalog = match &config.db_path {
            Some(path) => BookCatalog::open(path)?,
            None => BookCatalog::new(),
        };
        Ok(Self::with_catalog(config, Arc::new(catalog)))
    }

    /// Creates a server over an existing catalog.
    ///
    /// `config.db_path` is ignored; the catalog decides where it persists.
    pub fn with_catalog(config: ServerConfig, catalog: Arc<BookCatalog>) -> Self {
        Self { config, catalog }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &Arc<BookCatalog> {
        &self.catalog
    }

    /// Returns the HTTP router.
    pub fn router(&self) -> Router {
        handler::router(Arc::clone(&self.catalog))
    }

    /// Binds the listening socket.
    pub async fn bind(&self) -> ServerResult<BoundServer> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, books = self.catalog.len(), "book server listening");
        Ok(BoundServer {
            listener,
            router: self.router(),
            local_addr,
        })
    }
}

/// A server with its socket bound, ready to accept connections.
pub struct BoundServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl BoundServer {
    /// Returns the bound address. Useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the base URL clients should use.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Serves until the process is stopped.
    pub async fn run(self) -> ServerResult<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Serves until `shutdown` completes, then drains open connections.
    pub async fn run_until<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!(local_addr = %self.local_addr, "book server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_protocol::BookRecord;
    use serde_json::{json, Value};

    async fn start(server: BookServer) -> String {
        let bound = server.bind().await.unwrap();
        let base = bound.base_url();
        tokio::spawn(bound.run());
        base
    }

    fn ephemeral() -> ServerConfig {
        ServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    #[tokio::test]
    async fn health_check() {
        let base = start(BookServer::new(ephemeral()).unwrap()).await;

        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "ok": true, "books": 0 }));
    }

    #[tokio::test]
    async fn crud_flow() {
        let base = start(BookServer::new(ephemeral()).unwrap()).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/books"))
            .json(&json!({ "title": "  Dune  " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let created: BookRecord = resp.json().await.unwrap();
        assert_eq!(created, BookRecord::new(1u64, "Dune"));

        let resp = client
            .put(format!("{base}/books/1"))
            .json(&json!({ "id": 1, "title": "Dune Messiah" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let updated: BookRecord = resp.json().await.unwrap();
        assert_eq!(updated.title, "Dune Messiah");

        let fetched: BookRecord = client
            .get(format!("{base}/books/1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched, updated);

        let resp = client.delete(format!("{base}/books/1")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let deleted: BookRecord = resp.json().await.unwrap();
        assert_eq!(deleted, updated);

        let books: Vec<BookRecord> = client
            .get(format!("{base}/books"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn blank_title_is_bad_request() {
        let base = start(BookServer::new(ephemeral()).unwrap()).await;
        let client = reqwest::Client::new();

        for body in [json!({ "title": "   " }), json!({}), json!({ "title": 5 })] {
            let resp = client
                .post(format!("{base}/books"))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 400, "body {body}");
            let error: Value = resp.json().await.unwrap();
            assert!(error["error"].is_string());
        }

        let resp = client
            .post(format!("{base}/books"))
            .header("content-type", "application/json")
            .body("{ not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let base = start(BookServer::new(ephemeral()).unwrap()).await;
        let client = reqwest::Client::new();

        let resp = client.get(format!("{base}/books/42")).send().await.unwrap();
        assert_eq!(resp.status(), 404);
        let error: Value = resp.json().await.unwrap();
        assert_eq!(error["error"], "book 42 not found");

        let resp = client
            .put(format!("{base}/books/42"))
            .json(&json!({ "title": "Emma" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        let resp = client.delete(format!("{base}/books/42")).send().await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn shared_catalog() {
        let catalog =
            Arc::new(BookCatalog::with_books(vec![BookRecord::new(3u64, "Emma")]).unwrap());
        let server = BookServer::with_catalog(ephemeral(), Arc::clone(&catalog));
        let base = start(server).await;

        reqwest::Client::new()
            .post(format!("{base}/books"))
            .json(&json!({ "title": "Persuasion" }))
            .send()
            .await
            .unwrap();

        assert_eq!(
            catalog.list(),
            vec![
                BookRecord::new(3u64, "Emma"),
                BookRecord::new(4u64, "Persuasion")
            ]
        );
    }

    #[tokio::test]
    async fn database_file_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let base = start(BookServer::new(ephemeral().with_db_path(&path)).unwrap()).await;
        reqwest::Client::new()
            .post(format!("{base}/books"))
            .json(&json!({ "title": "Dune" }))
            .send()
            .await
            .unwrap();

        let restarted = BookServer::new(ephemeral().with_db_path(&path)).unwrap();
        assert_eq!(restarted.catalog().list(), vec![BookRecord::new(1u64, "Dune")]);
    }

    #[tokio::test]
    async fn graceful_shutdown() {
        let bound = BookServer::new(ephemeral()).unwrap().bind().await.unwrap();
        let addr = bound.local_addr();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(bound.run_until(async move {
            let _ = rx.await;
        }));

        let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
