//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for the collection server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// JSON database file. `None` keeps the collection in memory only.
    pub db_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            db_path: None,
        }
    }

    /// Persists the collection to `path`, loading it from there at start-up.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 3001)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3001);
        assert!(config.bind_addr.ip().is_loopback());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("0.0.0.0:9000".parse().unwrap()).with_db_path("db.json");

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.db_path, Some(PathBuf::from("db.json")));
    }
}
