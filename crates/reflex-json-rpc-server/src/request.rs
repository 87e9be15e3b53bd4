use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::RequestId;

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Get a parameter by name (for object params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (for array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }
}

impl<'de> Deserialize<'de> for RequestParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => Ok(RequestParams::Array(items)),
            Value::Object(map) => Ok(RequestParams::Object(map)),
            _ => Err(serde::de::Error::custom("params must be an array or an object")),
        }
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

/// Structural problem found while reading an envelope.
///
/// Defects are not decode failures: the envelope was valid JSON, so it is
/// answered with `Invalid Request` by the resolver instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeDefect {
    NotAnObject,
    MissingMethod,
    InvalidMethod,
    InvalidParams,
    InvalidId,
}

impl EnvelopeDefect {
    pub fn describe(&self) -> &'static str {
        match self {
            EnvelopeDefect::NotAnObject => "request must be a JSON object",
            EnvelopeDefect::MissingMethod => "missing 'method' member",
            EnvelopeDefect::InvalidMethod => "'method' must be a non-empty string",
            EnvelopeDefect::InvalidParams => "'params' must be an array or an object",
            EnvelopeDefect::InvalidId => "'id' must be a number, a string or null",
        }
    }
}

/// A normalized JSON-RPC request, as produced by the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Text of the `jsonrpc` member, when present.
    pub version: Option<String>,
    /// `None` marks a notification.
    pub id: Option<RequestId>,
    pub method: Option<String>,
    pub params: Option<RequestParams>,
    pub defect: Option<EnvelopeDefect>,
}

impl RpcRequest {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: Some(crate::JSONRPC_VERSION.to_string()),
            id,
            method: Some(method.into()),
            params,
            defect: None,
        }
    }

    /// Read an envelope out of an arbitrary JSON value. Never fails; problems
    /// are recorded in [`RpcRequest::defect`].
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Self {
                version: None,
                id: None,
                method: None,
                params: None,
                defect: Some(EnvelopeDefect::NotAnObject),
            };
        };

        let mut defect = None;

        let version = match obj.remove("jsonrpc") {
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
            None => None,
        };

        let id = match obj.remove("id") {
            Some(raw) => match RequestId::from_value(&raw) {
                Some(id) => Some(id),
                None => {
                    defect.get_or_insert(EnvelopeDefect::InvalidId);
                    Some(RequestId::Null)
                }
            },
            None => None,
        };

        let method = match obj.remove("method") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(_) => {
                defect.get_or_insert(EnvelopeDefect::InvalidMethod);
                None
            }
            None => {
                defect.get_or_insert(EnvelopeDefect::MissingMethod);
                None
            }
        };

        let params = match obj.remove("params") {
            Some(Value::Array(items)) => Some(RequestParams::Array(items)),
            Some(Value::Object(map)) => Some(RequestParams::Object(map)),
            Some(Value::Null) | None => None,
            Some(_) => {
                defect.get_or_insert(EnvelopeDefect::InvalidParams);
                None
            }
        };

        Self {
            version,
            id,
            method,
            params,
            defect,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn method_name(&self) -> &str {
        self.method.as_deref().unwrap_or("")
    }
}

/// Output of the decoder: one request or a batch of them.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    Single(RpcRequest),
    Batch(Vec<RpcRequest>),
}
