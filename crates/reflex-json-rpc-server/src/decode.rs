//! Request decoding strategies.
//!
//! Two transport shapes are supported. A request body holds a JSON object
//! (single request) or a JSON array (batch). A query string carries `id`,
//! `method` and `params` as named values. For query-string `params` the
//! decoder tries an ordered list of [`ParamsDecoder`] attempts (raw JSON
//! first, then base64). Each one is a pure function, so fallback order can
//! be tested on its own.

use base64::Engine;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::alphabet;
use serde_json::Value;
use tracing::debug;

use crate::error::DecodeFailure;
use crate::request::{RequestParams, RpcMessage, RpcRequest};
use crate::types::RequestId;

const LENIENT_PADDING: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_PADDING);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_PADDING);

/// One way of reading the `params` query value as a JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsDecoder {
    /// The value is JSON text.
    RawJson,
    /// The value is base64 (standard alphabet) of JSON text.
    Base64,
    /// The value is base64 (URL-safe alphabet) of JSON text.
    Base64UrlSafe,
}

impl ParamsDecoder {
    /// Attempts in the order the decoder tries them.
    pub const ORDER: [ParamsDecoder; 3] = [
        ParamsDecoder::RawJson,
        ParamsDecoder::Base64,
        ParamsDecoder::Base64UrlSafe,
    ];

    pub fn attempt(&self, text: &str) -> Option<Vec<Value>> {
        match self {
            ParamsDecoder::RawJson => parse_array(text.as_bytes()),
            ParamsDecoder::Base64 => {
                // Form decoding turns an unescaped '+' into a space.
                let restored: String = text
                    .trim()
                    .chars()
                    .map(|c| if c == ' ' { '+' } else { c })
                    .collect();
                let bytes = STANDARD_LENIENT.decode(restored).ok()?;
                parse_array(&bytes)
            }
            ParamsDecoder::Base64UrlSafe => {
                let bytes = URL_SAFE_LENIENT.decode(text.trim()).ok()?;
                parse_array(&bytes)
            }
        }
    }
}

fn parse_array(bytes: &[u8]) -> Option<Vec<Value>> {
    match serde_json::from_slice::<Value>(bytes).ok()? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Decode the `params` query value, trying each [`ParamsDecoder`] in order.
pub fn decode_query_params(text: &str) -> Result<Vec<Value>, DecodeFailure> {
    for decoder in ParamsDecoder::ORDER {
        if let Some(params) = decoder.attempt(text) {
            debug!(?decoder, "decoded query params");
            return Ok(params);
        }
    }
    Err(DecodeFailure::parse_error(
        "'params' is neither a JSON array nor base64-encoded JSON array",
    ))
}

/// Decode a request body.
pub fn decode_body(bytes: &[u8]) -> Result<RpcMessage, DecodeFailure> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeFailure::parse_error("empty request"));
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| DecodeFailure::parse_error(e.to_string()))?;

    match value {
        Value::Array(items) => Ok(RpcMessage::Batch(
            items.into_iter().map(RpcRequest::from_value).collect(),
        )),
        object @ Value::Object(_) => Ok(RpcMessage::Single(RpcRequest::from_value(object))),
        _ => Err(DecodeFailure::parse_error(
            "request must be a JSON object or array",
        )),
    }
}

/// Named values of a query-string request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub id: Option<String>,
    pub method: Option<String>,
    pub params: Option<String>,
}

impl QueryRequest {
    /// Read `id`, `method` and `params` from a raw (still encoded) query
    /// string. The first occurrence of each name wins; other names are
    /// ignored.
    pub fn parse(query: &str) -> Self {
        let mut request = QueryRequest::default();
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match name.as_ref() {
                "id" => &mut request.id,
                "method" => &mut request.method,
                "params" => &mut request.params,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        request
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.method.is_none() && self.params.is_none()
    }
}

/// Decode a query-string request.
pub fn decode_query(query: &QueryRequest) -> Result<RpcMessage, DecodeFailure> {
    if query.is_empty() {
        return Err(DecodeFailure::parse_error("empty request"));
    }

    let id = query.id.as_deref().map(RequestId::from_token);

    let method = match query.method.as_deref() {
        Some(method) if !method.is_empty() => method.to_string(),
        _ => {
            return Err(DecodeFailure::method_not_found("no 'method' query parameter").with_id(id));
        }
    };

    let params = match query.params.as_deref() {
        Some(text) => Some(RequestParams::Array(
            decode_query_params(text).map_err(|e| e.with_id(id.clone()))?,
        )),
        None => None,
    };

    Ok(RpcMessage::Single(RpcRequest::new(id, method, params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    #[test]
    fn test_body_single_and_batch() {
        let single = decode_body(br#"{"jsonrpc":"2.0","id":1,"method":"a"}"#).unwrap();
        assert!(matches!(single, RpcMessage::Single(ref r) if r.method.as_deref() == Some("a")));

        let batch = decode_body(br#"[{"id":1,"method":"a"},{"method":"b"},3]"#).unwrap();
        let RpcMessage::Batch(items) = batch else {
            panic!("expected batch");
        };
        assert_eq!(items.len(), 3);
        assert!(items[1].is_notification());
        assert!(items[2].defect.is_some());
    }

    #[test]
    fn test_body_parse_errors() {
        let bodies: [&[u8]; 6] = [b"{BROKEN}", b"", b"   ", b"42", b"\"text\"", b"null"];
        for body in bodies {
            let err = decode_body(body).unwrap_err();
            assert_eq!(err.kind, DecodeErrorKind::ParseError, "body {:?}", body);
        }
    }

    #[test]
    fn test_params_attempt_order() {
        let encoded = STANDARD.encode(r#"["Whir?inaki"]"#);

        assert_eq!(ParamsDecoder::RawJson.attempt(r#"["x"]"#), Some(vec![json!("x")]));
        assert_eq!(ParamsDecoder::RawJson.attempt(&encoded), None);
        assert_eq!(ParamsDecoder::Base64.attempt(&encoded), Some(vec![json!("Whir?inaki")]));
        assert_eq!(ParamsDecoder::Base64.attempt("{BROKEN}"), None);

        assert_eq!(decode_query_params(&encoded).unwrap(), vec![json!("Whir?inaki")]);
        assert_eq!(decode_query_params(r#"["Whir?inaki"]"#).unwrap(), vec![json!("Whir?inaki")]);
    }

    #[test]
    fn test_base64_survives_form_decoding() {
        // "[\"~~~>\"]" encodes with a '+' in standard base64.
        let encoded = STANDARD.encode(r#"["~~~>"]"#);
        assert!(encoded.contains('+'));
        let mangled = encoded.replace('+', " ");
        assert_eq!(ParamsDecoder::Base64.attempt(&mangled), Some(vec![json!("~~~>")]));

        let url_safe = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(r#"["~~~>"]"#);
        assert_eq!(decode_query_params(&url_safe).unwrap(), vec![json!("~~~>")]);
    }

    #[test]
    fn test_base64_of_non_array_is_rejected() {
        let encoded = STANDARD.encode(r#"{"a":1}"#);
        assert!(decode_query_params(&encoded).is_err());
        assert!(decode_query_params("{BROKEN}").is_err());
    }

    #[test]
    fn test_query_parse() {
        let query = QueryRequest::parse("id=123&method=testMethod&params=%5B%22x%22%5D&other=1");
        assert_eq!(query.id.as_deref(), Some("123"));
        assert_eq!(query.method.as_deref(), Some("testMethod"));
        assert_eq!(query.params.as_deref(), Some(r#"["x"]"#));
        assert!(QueryRequest::parse("").is_empty());
    }

    #[test]
    fn test_query_decoding() {
        let query = QueryRequest::parse("id=123&method=testMethod&params=%5B%22x%22%5D");
        let RpcMessage::Single(request) = decode_query(&query).unwrap() else {
            panic!("expected single request");
        };
        assert_eq!(request.id.as_ref().and_then(RequestId::as_i64), Some(123));
        assert_eq!(request.method.as_deref(), Some("testMethod"));
        assert_eq!(request.params, Some(RequestParams::Array(vec![json!("x")])));
    }

    #[test]
    fn test_query_without_params_has_no_params() {
        let query = QueryRequest::parse("id=1&method=ping");
        let RpcMessage::Single(request) = decode_query(&query).unwrap() else {
            panic!("expected single request");
        };
        assert!(request.params.is_none());
    }

    #[test]
    fn test_query_failures() {
        let empty = decode_query(&QueryRequest::default()).unwrap_err();
        assert_eq!(empty.kind, DecodeErrorKind::ParseError);

        let no_method = decode_query(&QueryRequest::parse("id=123&params=%5B%5D")).unwrap_err();
        assert_eq!(no_method.kind, DecodeErrorKind::MethodNotFound);
        assert_eq!(no_method.id.as_ref().and_then(RequestId::as_i64), Some(123));

        let broken = decode_query(&QueryRequest::parse("id=1&method=m&params=%7BBROKEN%7D")).unwrap_err();
        assert_eq!(broken.kind, DecodeErrorKind::ParseError);
        assert_eq!(broken.id, Some(RequestId::from(1)));
    }
}
