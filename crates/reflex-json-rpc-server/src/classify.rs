//! Error classification.
//!
//! Every failure, whether a bad payload, an undispatchable envelope or an
//! error raised by a handler, goes through a [`ClassifierChain`]. Classifiers
//! are consulted in order and the first one returning `Some` decides the
//! `(code, message, data)` triple. The chain ends with a catch-all, so
//! [`ClassifierChain::classify`] always produces an answer.
//!
//! Default order:
//! 1. [`MetadataClassifier`]: codes declared by the error itself
//!    ([`ToJsonRpcError`](crate::error::ToJsonRpcError)) or by an
//!    [`ErrorMapping`] on the failing operation.
//! 2. Custom classifiers added through [`ClassifierChainBuilder::classifier`].
//! 3. [`DefaultClassifier`]: the reserved protocol codes.
//! 4. [`CatchAllClassifier`]: `-32603 Internal error`.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{
    ClassifiedError, DecodeErrorKind, DecodeFailure, HandlerError, JsonRpcErrorCode,
    ResolutionFailure,
};
use crate::operation::OperationDescriptor;

/// Any failure the engine may need to report.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    Decode(&'a DecodeFailure),
    Resolution(&'a ResolutionFailure),
    Handler {
        error: &'a HandlerError,
        operation: &'a OperationDescriptor,
    },
}

impl fmt::Display for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Decode(failure) => fmt::Display::fmt(failure, f),
            Failure::Resolution(failure) => fmt::Display::fmt(failure, f),
            Failure::Handler { error, .. } => fmt::Display::fmt(error, f),
        }
    }
}

/// One link of the chain. Returns `None` to pass the failure on.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, failure: &Failure<'_>) -> Option<ClassifiedError>;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&Failure<'_>) -> Option<ClassifiedError> + Send + Sync,
{
    fn classify(&self, failure: &Failure<'_>) -> Option<ClassifiedError> {
        self(failure)
    }
}

fn is_type<E: StdError + 'static>(err: &(dyn StdError + 'static)) -> bool {
    err.is::<E>()
}

/// Declares the code used when an operation fails with a given error type.
///
/// The cause and its `source()` chain are searched for the type. Without an
/// explicit message the error's own `Display` text is used.
#[derive(Clone)]
pub struct ErrorMapping {
    matcher: fn(&(dyn StdError + 'static)) -> bool,
    type_name: &'static str,
    code: i64,
    message: Option<String>,
    data: Option<Value>,
}

impl ErrorMapping {
    pub fn for_type<E: StdError + 'static>(code: i64) -> Self {
        Self {
            matcher: is_type::<E>,
            type_name: std::any::type_name::<E>(),
            code,
            message: None,
            data: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    /// The classified error for `error`, if this mapping covers it.
    pub fn apply(&self, error: &HandlerError) -> Option<ClassifiedError> {
        let matched = error.chain().find(|err| (self.matcher)(*err))?;
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| matched.to_string());
        Some(ClassifiedError::new(self.code, message, self.data.clone()))
    }
}

impl fmt::Debug for ErrorMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMapping")
            .field("type_name", &self.type_name)
            .field("code", &self.code)
            .field("message", &self.message)
            .field("data", &self.data)
            .finish()
    }
}

/// Honours codes declared by handler authors.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataClassifier;

impl ErrorClassifier for MetadataClassifier {
    fn classify(&self, failure: &Failure<'_>) -> Option<ClassifiedError> {
        let Failure::Handler { error, operation } = failure else {
            return None;
        };
        if let Some(declared) = error.declared_error() {
            return Some(declared.clone());
        }
        operation
            .error_mappings
            .iter()
            .find_map(|mapping| mapping.apply(error))
    }
}

/// Maps decode and resolution failures onto the reserved codes.
///
/// Handler errors are left to the catch-all.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, failure: &Failure<'_>) -> Option<ClassifiedError> {
        match failure {
            Failure::Decode(decode) => {
                let code = match decode.kind {
                    DecodeErrorKind::ParseError => JsonRpcErrorCode::ParseError,
                    DecodeErrorKind::MethodNotFound => JsonRpcErrorCode::MethodNotFound,
                };
                Some(ClassifiedError::from_code(
                    code,
                    Some(Value::String(decode.detail.clone())),
                ))
            }
            Failure::Resolution(ResolutionFailure::InvalidRequest(detail)) => Some(
                ClassifiedError::invalid_request(Some(Value::String(detail.clone()))),
            ),
            Failure::Resolution(ResolutionFailure::MethodNotFound(method)) => {
                Some(ClassifiedError::method_not_found(method))
            }
            Failure::Resolution(ResolutionFailure::InvalidParams { detail, .. }) => Some(
                ClassifiedError::invalid_params(Some(Value::String(detail.clone()))),
            ),
            Failure::Handler { .. } => None,
        }
    }
}

/// Terminal link: everything becomes `Internal error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatchAllClassifier;

impl CatchAllClassifier {
    fn classify_any(&self, failure: &Failure<'_>) -> ClassifiedError {
        ClassifiedError::internal_error(Some(Value::String(failure.to_string())))
    }
}

impl ErrorClassifier for CatchAllClassifier {
    fn classify(&self, failure: &Failure<'_>) -> Option<ClassifiedError> {
        Some(self.classify_any(failure))
    }
}

/// Ordered classifiers with a guaranteed terminal catch-all.
#[derive(Clone)]
pub struct ClassifierChain {
    classifiers: Vec<Arc<dyn ErrorClassifier>>,
    catch_all: CatchAllClassifier,
}

impl ClassifierChain {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ClassifierChainBuilder {
        ClassifierChainBuilder::default()
    }

    pub fn classify(&self, failure: &Failure<'_>) -> ClassifiedError {
        self.classifiers
            .iter()
            .find_map(|classifier| classifier.classify(failure))
            .unwrap_or_else(|| self.catch_all.classify_any(failure))
    }

    /// Number of links, including the catch-all.
    pub fn len(&self) -> usize {
        self.classifiers.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for ClassifierChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassifierChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierChain")
            .field("len", &self.len())
            .finish()
    }
}

/// Builds a [`ClassifierChain`]; custom classifiers run after the metadata
/// classifier and before the defaults.
#[derive(Default)]
pub struct ClassifierChainBuilder {
    custom: Vec<Arc<dyn ErrorClassifier>>,
    skip_metadata: bool,
}

impl ClassifierChainBuilder {
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: ErrorClassifier + 'static,
    {
        self.custom.push(Arc::new(classifier));
        self
    }

    /// Ignore declared error metadata.
    pub fn without_metadata(mut self) -> Self {
        self.skip_metadata = true;
        self
    }

    pub fn build(self) -> ClassifierChain {
        let mut classifiers: Vec<Arc<dyn ErrorClassifier>> = Vec::with_capacity(self.custom.len() + 2);
        if !self.skip_metadata {
            classifiers.push(Arc::new(MetadataClassifier));
        }
        classifiers.extend(self.custom);
        classifiers.push(Arc::new(DefaultClassifier));
        ClassifierChain {
            classifiers,
            catch_all: CatchAllClassifier,
        }
    }
}
