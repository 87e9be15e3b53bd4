//! # Reflex HTTP JSON-RPC
//!
//! HTTP transport for the [`reflex_json_rpc_server`] engine.
//!
//! - [`HttpAdapter`] turns one `http::Request<Bytes>` into one
//!   `http::Response<Bytes>`: query-string or body decoding, gzip in both
//!   directions, status selection and the configured `Content-Type`.
//! - [`JsonRpcHttpServer`] runs the adapter behind a hyper HTTP/1.1 accept
//!   loop, with body size limits and optional CORS.

pub mod adapter;
pub mod compression;
pub mod config;
pub mod cors;
pub mod prelude;
pub mod server;
pub mod status;

#[cfg(test)]
mod tests;

// Re-export main types
pub use adapter::HttpAdapter;
pub use config::TransportConfig;
pub use cors::CorsLayer;
pub use server::{JsonRpcHttpServer, JsonRpcHttpServerBuilder, ServerConfig};
pub use status::{DefaultStatusCodeProvider, HttpStatusCodeProvider};

// Re-export foundational types
pub use reflex_json_rpc_server::{DispatchEngine, EngineConfig, Service};

/// Result type for HTTP JSON-RPC operations
pub type Result<T> = std::result::Result<T, HttpRpcError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpRpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Response build error: {0}")]
    Response(#[from] http::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Compression error: {0}")]
    Compression(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dispatch worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid Content-Type: {0}")]
    InvalidContentType(#[from] http::header::InvalidHeaderValue),

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}
