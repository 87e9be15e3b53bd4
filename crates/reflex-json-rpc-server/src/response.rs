use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::ClassifiedError;
use crate::types::{JsonRpcVersion, RequestId};

/// Result of running one request.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Success(Value),
    Failure(ClassifiedError),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            InvocationOutcome::Failure(error) => Some(error),
            InvocationOutcome::Success(_) => None,
        }
    }
}

/// A JSON-RPC response envelope.
///
/// Serialized with its members in the order `jsonrpc`, `id`, then `result`
/// or `error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub outcome: InvocationOutcome,
}

impl ResponseEnvelope {
    pub fn new(id: RequestId, outcome: InvocationOutcome) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            outcome,
        }
    }

    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(id, InvocationOutcome::Success(result))
    }

    pub fn error(id: RequestId, error: ClassifiedError) -> Self {
        Self::new(id, InvocationOutcome::Failure(error))
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", &self.version)?;
        map.serialize_entry("id", &self.id)?;
        match &self.outcome {
            InvocationOutcome::Success(result) => map.serialize_entry("result", result)?,
            InvocationOutcome::Failure(error) => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}

/// Everything a dispatch produced, ready to be written back.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Single(ResponseEnvelope),
    /// Envelopes of the non-notification batch elements, in request order.
    Batch(Vec<ResponseEnvelope>),
    /// Nothing to send (notifications only).
    Silent,
}

impl DispatchOutcome {
    /// Wrap per-element envelopes of a batch; no envelopes means no body.
    pub fn batch(envelopes: Vec<ResponseEnvelope>) -> Self {
        if envelopes.is_empty() {
            DispatchOutcome::Silent
        } else {
            DispatchOutcome::Batch(envelopes)
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, DispatchOutcome::Silent)
    }

    /// The error of a single, non-batch response.
    pub fn top_level_error(&self) -> Option<&ClassifiedError> {
        match self {
            DispatchOutcome::Single(envelope) => envelope.outcome.error(),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Option<Value> {
        match self {
            DispatchOutcome::Single(envelope) => serde_json::to_value(envelope).ok(),
            DispatchOutcome::Batch(envelopes) => serde_json::to_value(envelopes).ok(),
            DispatchOutcome::Silent => None,
        }
    }
}

/// Writes dispatch outcomes as JSON text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    /// Serialized body, or `None` when nothing is to be sent.
    pub fn encode(&self, outcome: &DispatchOutcome) -> Result<Option<Vec<u8>>, serde_json::Error> {
        match outcome {
            DispatchOutcome::Single(envelope) => serde_json::to_vec(envelope).map(Some),
            DispatchOutcome::Batch(envelopes) => serde_json::to_vec(envelopes).map(Some),
            DispatchOutcome::Silent => Ok(None),
        }
    }

    /// Envelope for a request, or `None` for a notification.
    pub fn envelope(&self, id: Option<RequestId>, outcome: InvocationOutcome) -> Option<ResponseEnvelope> {
        id.map(|id| ResponseEnvelope::new(id, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(outcome: &DispatchOutcome) -> String {
        String::from_utf8(ResponseEncoder.encode(outcome).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_success_key_order() {
        let outcome = DispatchOutcome::Single(ResponseEnvelope::success(RequestId::from(123), json!("Forest")));
        assert_eq!(text(&outcome), r#"{"jsonrpc":"2.0","id":123,"result":"Forest"}"#);
    }

    #[test]
    fn test_error_key_order() {
        let outcome = DispatchOutcome::Single(ResponseEnvelope::error(
            RequestId::from("abc"),
            ClassifiedError::invalid_params(Some(json!("bad"))),
        ));
        assert_eq!(
            text(&outcome),
            r#"{"jsonrpc":"2.0","id":"abc","error":{"code":-32602,"message":"Invalid params","data":"bad"}}"#
        );
        assert_eq!(outcome.top_level_error().map(|e| e.code), Some(-32602));
    }

    #[test]
    fn test_null_result_is_kept() {
        let outcome = DispatchOutcome::Single(ResponseEnvelope::success(RequestId::Null, Value::Null));
        assert_eq!(text(&outcome), r#"{"jsonrpc":"2.0","id":null,"result":null}"#);
    }

    #[test]
    fn test_batch_bodies() {
        let outcome = DispatchOutcome::batch(vec![
            ResponseEnvelope::success(RequestId::from(1), json!(2)),
            ResponseEnvelope::error(RequestId::Null, ClassifiedError::invalid_request(None)),
        ]);
        assert_eq!(
            text(&outcome),
            r#"[{"jsonrpc":"2.0","id":1,"result":2},{"jsonrpc":"2.0","id":null,"error":{"code":-32600,"message":"Invalid Request"}}]"#
        );
        assert!(outcome.top_level_error().is_none());

        let empty = DispatchOutcome::batch(Vec::new());
        assert!(empty.is_silent());
        assert_eq!(ResponseEncoder.encode(&empty).unwrap(), None);
    }

    #[test]
    fn test_notifications_get_no_envelope() {
        assert!(ResponseEncoder.envelope(None, InvocationOutcome::Success(json!(1))).is_none());
        assert!(ResponseEncoder
            .envelope(Some(RequestId::from(1)), InvocationOutcome::Success(json!(1)))
            .is_some());
    }
}
