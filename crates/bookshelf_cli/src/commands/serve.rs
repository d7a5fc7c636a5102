//! Serve command implementation.

use bookshelf_server::{BookServer, ServerConfig, ServerResult};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

/// Runs the reference server until Ctrl-C.
pub async fn run(bind: SocketAddr, db: Option<PathBuf>) -> ServerResult<()> {
    let mut config = ServerConfig::new(bind);
    if let Some(db) = db {
        config = config.with_db_path(db);
    }

    let bound = BookServer::new(config)?.bind().await?;
    println!("Serving books at {}", bound.base_url());
    bound.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => warn!(error = %e, "cannot listen for Ctrl-C; shutting down"),
    }
}
