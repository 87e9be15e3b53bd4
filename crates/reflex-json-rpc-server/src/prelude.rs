//! Commonly used types in one import.
//!
//! ```rust
//! use reflex_json_rpc_server::prelude::*;
//! ```

pub use crate::classify::{ClassifierChain, ErrorClassifier, ErrorMapping, Failure};
pub use crate::dispatch::{DispatchEngine, EngineConfig};
pub use crate::error::{ClassifiedError, HandlerError, JsonRpcErrorCode, ToJsonRpcError};
pub use crate::invoke::InvocationListener;
pub use crate::operation::{Service, ServiceBuilder};
pub use crate::request::RequestParams;
pub use crate::response::{DispatchOutcome, ResponseEncoder};
pub use crate::types::RequestId;

pub use crate::error_codes::*;
