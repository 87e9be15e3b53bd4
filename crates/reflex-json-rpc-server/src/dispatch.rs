//! Request orchestration: decode, resolve, invoke, classify, encode.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::classify::{ClassifierChain, Failure};
use crate::decode::{QueryRequest, decode_body, decode_query};
use crate::error::{ClassifiedError, DecodeFailure, ResolutionFailure};
use crate::invoke::{InvocationListener, Invoker};
use crate::operation::Service;
use crate::request::{RpcMessage, RpcRequest};
use crate::resolve::MethodResolver;
use crate::response::{DispatchOutcome, InvocationOutcome, ResponseEnvelope};
use crate::types::RequestId;

/// Engine behaviour switches.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reject requests whose `jsonrpc` member is not `"2.0"`.
    pub require_version: bool,
    /// Log handler errors at `error` level before they are classified.
    pub log_invocation_errors: bool,
    /// Largest accepted batch; larger batches are rejected as a whole.
    pub max_batch_size: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_version: false,
            log_invocation_errors: true,
            max_batch_size: None,
        }
    }
}

impl EngineConfig {
    pub fn require_version(mut self, require: bool) -> Self {
        self.require_version = require;
        self
    }

    pub fn log_invocation_errors(mut self, log: bool) -> Self {
        self.log_invocation_errors = log;
        self
    }

    pub fn max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = Some(max);
        self
    }
}

/// Stateless JSON-RPC dispatcher over one [`Service`].
///
/// Everything it holds is read-only, so a single engine can serve any
/// number of concurrent requests.
#[derive(Debug, Clone)]
pub struct DispatchEngine {
    service: Arc<Service>,
    classifiers: Arc<ClassifierChain>,
    invoker: Invoker,
    config: EngineConfig,
}

impl DispatchEngine {
    /// Engine with the default classifier chain and configuration.
    pub fn new(service: Service) -> Self {
        Self::builder(service).build()
    }

    pub fn builder(service: Service) -> DispatchEngineBuilder {
        DispatchEngineBuilder::new(Arc::new(service))
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Dispatch a request body (a JSON object or a batch array).
    pub fn dispatch_body(&self, body: &[u8]) -> DispatchOutcome {
        self.dispatch_decoded(decode_body(body))
    }

    /// Dispatch a query-string request.
    pub fn dispatch_query(&self, query: &QueryRequest) -> DispatchOutcome {
        self.dispatch_decoded(decode_query(query))
    }

    pub fn dispatch_decoded(&self, decoded: Result<RpcMessage, DecodeFailure>) -> DispatchOutcome {
        match decoded {
            Ok(message) => self.dispatch(message),
            Err(failure) => {
                warn!(error = %failure, "failed to decode request");
                let error = self.classifiers.classify(&Failure::Decode(&failure));
                DispatchOutcome::Single(ResponseEnvelope::error(
                    failure.id.unwrap_or(RequestId::Null),
                    error,
                ))
            }
        }
    }

    pub fn dispatch(&self, message: RpcMessage) -> DispatchOutcome {
        match message {
            RpcMessage::Single(request) => match self.handle(&request) {
                Some(envelope) => DispatchOutcome::Single(envelope),
                None => DispatchOutcome::Silent,
            },
            RpcMessage::Batch(requests) => self.dispatch_batch(requests),
        }
    }

    fn dispatch_batch(&self, requests: Vec<RpcRequest>) -> DispatchOutcome {
        if requests.is_empty() {
            return self.reject_batch("empty batch".to_string());
        }
        if let Some(max) = self.config.max_batch_size {
            if requests.len() > max {
                return self.reject_batch(format!(
                    "batch of {} requests exceeds the limit of {}",
                    requests.len(),
                    max
                ));
            }
        }

        debug!(size = requests.len(), "dispatching batch");
        let envelopes = requests
            .iter()
            .filter_map(|request| self.handle(request))
            .collect();
        DispatchOutcome::batch(envelopes)
    }

    fn reject_batch(&self, detail: String) -> DispatchOutcome {
        warn!(%detail, "rejected batch");
        let failure = ResolutionFailure::InvalidRequest(detail);
        let error = self.classifiers.classify(&Failure::Resolution(&failure));
        DispatchOutcome::Single(ResponseEnvelope::error(RequestId::Null, error))
    }

    /// Run one request. Returns `None` when nothing is to be sent back.
    pub fn handle(&self, request: &RpcRequest) -> Option<ResponseEnvelope> {
        let resolver = MethodResolver::new(&self.service).require_version(self.config.require_version);

        let outcome = match resolver.resolve(request) {
            Ok(resolved) => {
                debug!(method = %resolved.operation.name, id = ?request.id, "invoking operation");
                match self.invoker.invoke(resolved.call, resolved.operation) {
                    Ok(value) => InvocationOutcome::Success(value),
                    Err(handler_error) => {
                        if self.config.log_invocation_errors {
                            error!(
                                method = %resolved.operation.name,
                                error = %handler_error,
                                "operation failed"
                            );
                        }
                        InvocationOutcome::Failure(self.classifiers.classify(&Failure::Handler {
                            error: &handler_error,
                            operation: resolved.operation,
                        }))
                    }
                }
            }
            Err(failure) => {
                debug!(method = request.method_name(), error = %failure, "request not resolved");
                // Malformed envelopes are always answered, with a null id if
                // none could be read.
                let always_answer = matches!(failure, ResolutionFailure::InvalidRequest(_));
                if request.is_notification() && !always_answer {
                    return None;
                }
                let error = self.classifiers.classify(&Failure::Resolution(&failure));
                return Some(ResponseEnvelope::error(
                    request.id.clone().unwrap_or(RequestId::Null),
                    error,
                ));
            }
        };

        request
            .id
            .clone()
            .map(|id| ResponseEnvelope::new(id, outcome))
    }

    /// Classify an arbitrary failure with this engine's chain.
    pub fn classify(&self, failure: &Failure<'_>) -> ClassifiedError {
        self.classifiers.classify(failure)
    }
}

pub struct DispatchEngineBuilder {
    service: Arc<Service>,
    classifiers: ClassifierChain,
    listener: Option<Arc<dyn InvocationListener>>,
    config: EngineConfig,
}

impl DispatchEngineBuilder {
    pub fn new(service: Arc<Service>) -> Self {
        Self {
            service,
            classifiers: ClassifierChain::default(),
            listener: None,
            config: EngineConfig::default(),
        }
    }

    pub fn classifiers(mut self, classifiers: ClassifierChain) -> Self {
        self.classifiers = classifiers;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn InvocationListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> DispatchEngine {
        let invoker = match self.listener {
            Some(listener) => Invoker::with_listener(listener),
            None => Invoker::new(),
        };
        DispatchEngine {
            service: self.service,
            classifiers: Arc::new(self.classifiers),
            invoker,
            config: self.config,
        }
    }
}
