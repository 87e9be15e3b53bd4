use http::HeaderValue;

use crate::Result;

/// Default `Content-Type` of response bodies.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json-rpc";

/// Default cap on the inflated size of a gzip request body.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;

/// Settings of the HTTP exchange itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Sent as `Content-Type` whenever a body is written
    pub content_type: HeaderValue,
    /// Gzip responses for clients that accept it
    pub allow_compression: bool,
    /// Largest accepted body after gzip inflation
    pub max_decompressed_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            content_type: HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            allow_compression: false,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = content_type;
        self
    }

    /// Parse `content_type` as a header value before accepting it.
    pub fn try_content_type(self, content_type: &str) -> Result<Self> {
        Ok(self.content_type(HeaderValue::from_str(content_type)?))
    }

    pub fn allow_compression(mut self, allow: bool) -> Self {
        self.allow_compression = allow;
        self
    }

    pub fn max_decompressed_size(mut self, size: usize) -> Self {
        self.max_decompressed_size = size;
        self
    }
}
