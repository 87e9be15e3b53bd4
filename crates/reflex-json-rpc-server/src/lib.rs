//! # Reflex JSON-RPC Server
//!
//! A transport-agnostic JSON-RPC 2.0 engine that exposes the operations of
//! plain Rust handler objects.
//!
//! The pipeline is split into small pieces that can be used on their own:
//! - [`decode`]: request bodies and query strings to [`RpcMessage`]
//! - [`operation`]: the [`Service`] registry built from typed closures
//! - [`resolve`]: overload resolution and parameter binding
//! - [`invoke`]: running a bound call, catching panics
//! - [`classify`]: turning any failure into `(code, message, data)`
//! - [`response`]: response envelopes and their wire form
//! - [`dispatch`]: the [`DispatchEngine`] tying it all together
//!
//! ```rust
//! use std::convert::Infallible;
//! use reflex_json_rpc_server::prelude::*;
//!
//! struct Calculator;
//!
//! let service = Service::builder(Calculator)
//!     .method("add", &["a", "b"], |_: &Calculator, a: i64, b: i64| -> Result<i64, Infallible> {
//!         Ok(a + b)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let engine = DispatchEngine::new(service);
//! let outcome = engine.dispatch_body(br#"{"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}"#);
//! let body = ResponseEncoder.encode(&outcome).unwrap().unwrap();
//! assert_eq!(body, br#"{"jsonrpc":"2.0","id":1,"result":5}"#);
//! ```

pub mod classify;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod invoke;
pub mod operation;
pub mod prelude;
pub mod request;
pub mod resolve;
pub mod response;
pub mod types;

// Re-export main types
pub use classify::{ClassifierChain, ErrorClassifier, ErrorMapping, Failure};
pub use decode::{ParamsDecoder, QueryRequest};
pub use dispatch::{DispatchEngine, DispatchEngineBuilder, EngineConfig};
pub use error::{
    ClassifiedError, DecodeErrorKind, DecodeFailure, HandlerError, JsonRpcErrorCode,
    RegistryError, ResolutionFailure, ToJsonRpcError,
};
pub use invoke::{InvocationListener, Invoker};
pub use operation::{OperationDescriptor, ParamDescriptor, Service, ServiceBuilder};
pub use request::{RequestParams, RpcMessage, RpcRequest};
pub use resolve::MethodResolver;
pub use response::{DispatchOutcome, InvocationOutcome, ResponseEncoder, ResponseEnvelope};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
