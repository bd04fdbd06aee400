//! Server configuration types.
//!
//! Configuration is assembled with a builder and is immutable once the
//! server is built.
//!
//! # Example
//!
//! ```rust
//! use hermes_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:0")
//!     .request_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:0");
//! assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
//! ```

use std::time::Duration;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default timeout for reading request headers.
pub const DEFAULT_READ_HEADER_TIMEOUT: Duration = Duration::from_secs(1);

/// Default handler deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default graceful shutdown budget.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address; host names are resolved and port 0 picks a free port
    http_addr: String,

    /// HTTP/1 header read timeout
    read_header_timeout: Duration,

    /// Handler deadline unless a route overrides it
    request_timeout: Duration,

    /// How long in-flight requests may take to drain on shutdown
    shutdown_timeout: Duration,

    /// HTTP/1 keep-alive
    keep_alive: bool,

    /// Whether inbound request id headers are honoured
    trust_request_id: bool,

    /// Largest request body read into memory, in bytes
    max_body_size: usize,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the listen address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Returns the header read timeout.
    #[must_use]
    pub fn read_header_timeout(&self) -> Duration {
        self.read_header_timeout
    }

    /// Returns the default handler deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the graceful shutdown budget.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns whether keep-alive is enabled.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Returns whether inbound request ids are honoured.
    #[must_use]
    pub fn trust_request_id(&self) -> bool {
        self.trust_request_id
    }

    /// Returns the request body limit in bytes.
    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    read_header_timeout: Duration,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    keep_alive: bool,
    trust_request_id: bool,
    max_body_size: usize,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            read_header_timeout: DEFAULT_READ_HEADER_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            keep_alive: true,
            trust_request_id: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Sets the listen address (e.g., "0.0.0.0:8080", "localhost:0").
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the header read timeout.
    #[must_use]
    pub fn read_header_timeout(mut self, timeout: Duration) -> Self {
        self.read_header_timeout = timeout;
        self
    }

    /// Sets the handler deadline applied to routes without their own.
    ///
    /// The same bound applies to reading the request body.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long in-flight requests may take to drain on shutdown.
    ///
    /// Exceeding it makes `listen_and_serve` report a forced shutdown.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Enables or disables HTTP/1 keep-alive.
    #[must_use]
    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    /// Sets whether `Request-Id` / `X-Request-Id` from the client are kept.
    ///
    /// When disabled every request gets a freshly generated id.
    #[must_use]
    pub fn trust_request_id(mut self, trust: bool) -> Self {
        self.trust_request_id = trust;
        self
    }

    /// Sets the request body limit. Larger bodies are answered with
    /// `413 Payload Too Large` before any route runs.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            read_header_timeout: self.read_header_timeout,
            request_timeout: self.request_timeout,
            shutdown_timeout: self.shutdown_timeout,
            keep_alive: self.keep_alive,
            trust_request_id: self.trust_request_id,
            max_body_size: self.max_body_size,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.read_header_timeout(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert!(config.keep_alive());
        assert!(config.trust_request_id());
        assert_eq!(config.max_body_size(), 1024 * 1024);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::builder()
            .http_addr("localhost:0")
            .read_header_timeout(Duration::from_millis(500))
            .request_timeout(Duration::from_secs(2))
            .shutdown_timeout(Duration::from_secs(1))
            .keep_alive(false)
            .trust_request_id(false)
            .max_body_size(512)
            .build();

        assert_eq!(config.http_addr(), "localhost:0");
        assert_eq!(config.read_header_timeout(), Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(1));
        assert!(!config.keep_alive());
        assert!(!config.trust_request_id());
        assert_eq!(config.max_body_size(), 512);
    }

    #[test]
    fn test_config_clone() {
        let config = ServerConfig::builder().http_addr("192.168.1.1:8080").build();
        assert_eq!(config.clone(), config);
    }
}
