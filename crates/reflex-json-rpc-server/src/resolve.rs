//! Overload resolution.
//!
//! Matches a decoded [`RpcRequest`] against the operations of a [`Service`]
//! and binds its parameters, producing a call the invoker can run.

use serde_json::Value;
use tracing::debug;

use crate::error::ResolutionFailure;
use crate::operation::{BoundCall, OperationDescriptor, Service};
use crate::request::{RequestParams, RpcRequest};

/// A request bound to one concrete operation.
pub struct Resolved<'a> {
    pub call: BoundCall,
    pub operation: &'a OperationDescriptor,
}

impl std::fmt::Debug for Resolved<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("operation", &self.operation.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MethodResolver<'a> {
    service: &'a Service,
    require_version: bool,
}

impl<'a> MethodResolver<'a> {
    pub fn new(service: &'a Service) -> Self {
        Self {
            service,
            require_version: false,
        }
    }

    /// Reject envelopes whose `jsonrpc` member is not exactly `"2.0"`.
    pub fn require_version(mut self, require: bool) -> Self {
        self.require_version = require;
        self
    }

    pub fn resolve(&self, request: &RpcRequest) -> Result<Resolved<'a>, ResolutionFailure> {
        if let Some(defect) = &request.defect {
            return Err(ResolutionFailure::InvalidRequest(defect.describe().to_string()));
        }
        if self.require_version && request.version.as_deref() != Some(crate::JSONRPC_VERSION) {
            return Err(ResolutionFailure::InvalidRequest(
                "'jsonrpc' must be \"2.0\"".to_string(),
            ));
        }
        let method = match request.method.as_deref() {
            Some(method) if !method.is_empty() => method,
            _ => {
                return Err(ResolutionFailure::InvalidRequest(
                    "missing 'method' member".to_string(),
                ));
            }
        };

        let candidates = self.service.candidates(method);
        if candidates.is_empty() {
            return Err(ResolutionFailure::MethodNotFound(method.to_string()));
        }

        let mut last_error = None;
        for operation in candidates {
            let Some(args) = arrange(operation.descriptor(), request.params.as_ref()) else {
                continue;
            };
            match operation.bind(args) {
                Ok(call) => {
                    debug!(
                        method,
                        params = ?operation.descriptor().parameter_types().collect::<Vec<_>>(),
                        "resolved operation"
                    );
                    return Ok(Resolved {
                        call,
                        operation: operation.descriptor(),
                    });
                }
                Err(e) => {
                    debug!(method, error = %e, "candidate rejected its arguments");
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(ResolutionFailure::InvalidParams {
            method: method.to_string(),
            detail: last_error.unwrap_or_else(|| no_shape_match(method, request.params.as_ref())),
        })
    }
}

/// Lay out request params in the candidate's positional order, or `None`
/// when their shape cannot fit the candidate at all.
fn arrange(descriptor: &OperationDescriptor, params: Option<&RequestParams>) -> Option<Vec<Value>> {
    match params {
        None => (descriptor.arity() == 0).then(Vec::new),
        Some(RequestParams::Array(items)) => {
            (items.len() == descriptor.arity()).then(|| items.clone())
        }
        Some(RequestParams::Object(map)) => {
            if !map.keys().all(|key| descriptor.has_parameter(key)) {
                return None;
            }
            descriptor
                .parameter_names()
                .map(|name| map.get(name).cloned())
                .collect()
        }
    }
}

fn no_shape_match(method: &str, params: Option<&RequestParams>) -> String {
    match params {
        None => format!("'{}' requires parameters", method),
        Some(RequestParams::Array(items)) => {
            format!("no '{}' operation takes {} parameters", method, items.len())
        }
        Some(RequestParams::Object(map)) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("no '{}' operation takes parameters named {:?}", method, keys)
        }
    }
}
