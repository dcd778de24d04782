//! Tracer middleware configuration.

use http::header::{HeaderName, InvalidHeaderName};

use crate::request_id::{uuid_factory, RequestIdFactory};

/// Default correlation header.
pub const DEFAULT_HEADER_NAME: &str = "x-request-id";

/// Configuration for the request tracer middleware.
#[derive(Clone)]
pub struct TracerConfig {
    /// Read the identifier from the inbound header instead of always
    /// generating one. The header is only preferred when present and
    /// non-empty; otherwise the factory applies.
    pub use_header: bool,
    /// Header carrying the correlation identifier, inbound and (when
    /// `echo_header` is set) outbound.
    pub header_name: HeaderName,
    /// Write the resolved identifier back onto the response.
    pub echo_header: bool,
    /// Generates an identifier when none is taken from the header.
    /// Uniqueness is entirely this function's responsibility.
    pub id_factory: RequestIdFactory,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            use_header: false,
            header_name: HeaderName::from_static(DEFAULT_HEADER_NAME),
            echo_header: false,
            id_factory: uuid_factory(),
        }
    }
}

impl TracerConfig {
    /// Replaces the correlation header, parsing `name` as a header name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeaderName`] when `name` is not a
    /// valid HTTP header name.
    pub fn with_header_name(mut self, name: &str) -> Result<Self, ConfigError> {
        self.header_name = name
            .parse::<HeaderName>()
            .map_err(|source| ConfigError::InvalidHeaderName {
                name: name.to_owned(),
                source,
            })?;
        Ok(self)
    }
}

impl std::fmt::Debug for TracerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerConfig")
            .field("use_header", &self.use_header)
            .field("header_name", &self.header_name)
            .field("echo_header", &self.echo_header)
            .finish_non_exhaustive()
    }
}

/// Errors from building a [`TracerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid header name: {name}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TracerConfig::default();
        assert!(!config.use_header);
        assert!(!config.echo_header);
        assert_eq!(config.header_name.as_str(), "x-request-id");
    }

    #[test]
    fn with_header_name_parses_custom_header() {
        let config = TracerConfig::default()
            .with_header_name("X-Correlation-Id")
            .unwrap();
        assert_eq!(config.header_name.as_str(), "x-correlation-id");
    }

    #[test]
    fn with_header_name_rejects_invalid_names() {
        let err = TracerConfig::default()
            .with_header_name("not a header\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeaderName { .. }));
    }
}
