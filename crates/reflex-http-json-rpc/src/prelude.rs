//! Commonly used types in one import.
//!
//! ```rust
//! use reflex_http_json_rpc::prelude::*;
//! ```

pub use crate::{
    DefaultStatusCodeProvider, HttpAdapter, HttpRpcError, HttpStatusCodeProvider,
    JsonRpcHttpServer, JsonRpcHttpServerBuilder, ServerConfig, TransportConfig,
};
pub use reflex_json_rpc_server::prelude::*;
