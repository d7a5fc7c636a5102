//! Configuration for the collection client.

use std::time::Duration;

/// Base URL of a locally running book server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Configuration for [`HttpCollectionClient`](crate::HttpCollectionClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL, without the collection path.
    pub base_url: String,
    /// Whole-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    /// Connection timeout. `None` keeps the transport default.
    pub connect_timeout: Option<Duration>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the given server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            connect_timeout: None,
            user_agent: format!("bookshelf/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:3001");
        assert!(config.timeout.is_none());
        assert!(config.connect_timeout.is_none());
        assert!(config.user_agent.starts_with("bookshelf/"));
    }

    #[test]
    fn config_builder() {
        let config = ClientConfig::new("http://books.internal:8080")
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(1))
            .with_user_agent("shelf-test");

        assert_eq!(config.base_url, "http://books.internal:8080");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(1)));
        assert_eq!(config.user_agent, "shelf-test");
    }
}
