use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error_codes::{INTERNAL_ERROR, PARSE_ERROR, SERVER_ERROR_END, SERVER_ERROR_START};
use crate::types::RequestId;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
            JsonRpcErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
        }
    }

    /// Map a numeric code back onto a known variant.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(JsonRpcErrorCode::ParseError),
            -32600 => Some(JsonRpcErrorCode::InvalidRequest),
            -32601 => Some(JsonRpcErrorCode::MethodNotFound),
            -32602 => Some(JsonRpcErrorCode::InvalidParams),
            -32603 => Some(JsonRpcErrorCode::InternalError),
            SERVER_ERROR_START..=SERVER_ERROR_END => Some(JsonRpcErrorCode::ServerError(code)),
            _ => None,
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The `error` member of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ClassifiedError {
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        // `data: null` carries nothing, so it is never emitted.
        let data = data.filter(|value| !value.is_null());
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn from_code(code: JsonRpcErrorCode, data: Option<Value>) -> Self {
        Self::new(code.code(), code.message(), data)
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::from_code(JsonRpcErrorCode::ParseError, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::from_code(JsonRpcErrorCode::InvalidRequest, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound.code(),
            format!("Method '{}' not found", method),
            None,
        )
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::from_code(JsonRpcErrorCode::InvalidParams, data)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::from_code(JsonRpcErrorCode::InternalError, data)
    }

    /// True for the protocol-level codes, `-32700` through `-32603`.
    pub fn is_protocol_error(&self) -> bool {
        (PARSE_ERROR..=INTERNAL_ERROR).contains(&self.code)
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

/// Kinds of transport payload failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    ParseError,
    /// A query-string request that names no method.
    MethodNotFound,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::ParseError => write!(f, "parse error"),
            DecodeErrorKind::MethodNotFound => write!(f, "method not found"),
        }
    }
}

/// The transport payload could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {detail}")]
pub struct DecodeFailure {
    pub kind: DecodeErrorKind,
    pub detail: String,
    /// Id recovered from the transport, echoed in the error envelope.
    pub id: Option<RequestId>,
}

impl DecodeFailure {
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::ParseError,
            detail: detail.into(),
            id: None,
        }
    }

    pub fn method_not_found(detail: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::MethodNotFound,
            detail: detail.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }
}

/// The envelope was well-formed JSON but could not be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method '{0}' not found")]
    MethodNotFound(String),

    #[error("invalid params for '{method}': {detail}")]
    InvalidParams { method: String, detail: String },
}

/// Errors that know their own JSON-RPC representation.
pub trait ToJsonRpcError: StdError + Send + Sync + 'static {
    /// Convert this error to a JSON-RPC error object
    fn to_error_object(&self) -> ClassifiedError;
}

/// Anything a handler operation raised.
///
/// Built from any `std::error::Error` with `?`. It deliberately does not
/// implement `Error` itself, which is what makes the blanket `From` possible.
pub struct HandlerError {
    cause: Box<dyn StdError + Send + Sync + 'static>,
    declared: Option<ClassifiedError>,
}

impl HandlerError {
    pub fn new<E>(cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            cause: Box::new(cause),
            declared: None,
        }
    }

    /// Wrap an error that declares its own code and message.
    pub fn declared<E: ToJsonRpcError>(cause: E) -> Self {
        let declared = Some(cause.to_error_object());
        Self {
            cause: Box::new(cause),
            declared,
        }
    }

    /// Build from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Build from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new(PanicError(message))
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.cause
    }

    pub fn declared_error(&self) -> Option<&ClassifiedError> {
        self.declared.as_ref()
    }

    /// Walk the cause and its `source()` chain.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        let first: &(dyn StdError + 'static) = &*self.cause;
        std::iter::successors(Some(first), |err| (*err).source())
    }

    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.chain().any(|err| err.is::<E>())
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.chain().find_map(|err| err.downcast_ref::<E>())
    }
}

impl<E> From<E> for HandlerError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(cause: E) -> Self {
        Self::new(cause)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.cause, f)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("cause", &self.cause)
            .field("declared", &self.declared)
            .finish()
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct MessageError(String);

/// A handler panicked; the payload message is kept.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PanicError(pub String);

/// Invalid declarations caught while building a service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("operation name must not be empty")]
    EmptyName,

    #[error("operation '{name}' declares {declared} parameter names but takes {arity} arguments")]
    ArityMismatch {
        name: String,
        declared: usize,
        arity: usize,
    },

    #[error("operation '{name}' declares parameter '{param}' more than once")]
    DuplicateParameter { name: String, param: String },

    #[error("error mapping declared before any operation")]
    DanglingErrorMapping,
}
