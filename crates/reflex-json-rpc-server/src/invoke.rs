use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::HandlerError;
use crate::operation::{BoundCall, OperationDescriptor};

/// Observer around each handler call.
pub trait InvocationListener: Send + Sync {
    fn will_invoke(&self, operation: &OperationDescriptor);

    fn did_invoke(
        &self,
        operation: &OperationDescriptor,
        result: Result<&Value, &HandlerError>,
        elapsed: Duration,
    );
}

/// Runs bound calls. The cause of a failure is passed through untouched;
/// panics are caught here and reported as handler errors.
#[derive(Clone, Default)]
pub struct Invoker {
    listener: Option<Arc<dyn InvocationListener>>,
}

impl Invoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: Arc<dyn InvocationListener>) -> Self {
        Self {
            listener: Some(listener),
        }
    }

    pub fn invoke(&self, call: BoundCall, operation: &OperationDescriptor) -> Result<Value, HandlerError> {
        if let Some(listener) = &self.listener {
            listener.will_invoke(operation);
        }

        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| Err(HandlerError::from_panic(payload)));

        if let Some(listener) = &self.listener {
            listener.did_invoke(operation, result.as_ref(), started.elapsed());
        }
        result
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
