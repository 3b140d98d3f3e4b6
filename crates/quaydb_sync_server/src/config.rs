//! Server configuration.

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of meta records accepted per `put-meta`.
    pub max_meta_batch: usize,
    /// Largest content payload inlined (base64) into a `get-content`
    /// reply; larger payloads get a download location instead.
    pub inline_content_max: usize,
    /// Pointer name used when a request names none.
    pub default_pointer: String,
    /// Path of the raw content endpoint, used to build locations.
    pub content_endpoint: String,
    /// Whether requests must carry a bearer credential.
    pub require_auth: bool,
    /// Secret key for token validation (if auth enabled).
    pub auth_secret: Option<Vec<u8>>,
}

impl ServerConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_meta_batch: 100,
            inline_content_max: 16 * 1024,
            default_pointer: "main".into(),
            content_endpoint: "/content".into(),
            require_auth: false,
            auth_secret: None,
        }
    }

    /// Sets the maximum `put-meta` batch size.
    pub fn with_max_meta_batch(mut self, max: usize) -> Self {
        self.max_meta_batch = max;
        self
    }

    /// Sets the inline content threshold.
    pub fn with_inline_content_max(mut self, max: usize) -> Self {
        self.inline_content_max = max;
        self
    }

    /// Sets the default pointer name.
    pub fn with_default_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.default_pointer = pointer.into();
        self
    }

    /// Sets the raw content endpoint path.
    pub fn with_content_endpoint(mut self, path: impl Into<String>) -> Self {
        self.content_endpoint = path.into();
        self
    }

    /// Enables authentication with the given secret.
    pub fn with_auth(mut self, secret: Vec<u8>) -> Self {
        self.require_auth = true;
        self.auth_secret = Some(secret);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.default_pointer, "main");
        assert!(!config.require_auth);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new()
            .with_max_meta_batch(10)
            .with_inline_content_max(512)
            .with_default_pointer("trunk")
            .with_auth(vec![1, 2, 3]);

        assert_eq!(config.max_meta_batch, 10);
        assert_eq!(config.inline_content_max, 512);
        assert_eq!(config.default_pointer, "trunk");
        assert!(config.require_auth);
        assert_eq!(config.auth_secret, Some(vec![1, 2, 3]));
    }
}
