//! Operation registry.
//!
//! A [`Service`] is the ordered set of operations a handler object exposes.
//! It is built once with a [`ServiceBuilder`] and shared read-only between
//! requests. Each operation is a typed closure over the handler; the
//! builder derives its [`OperationDescriptor`] (name, parameter names,
//! parameter types) at bind time.
//!
//! ```rust
//! use std::convert::Infallible;
//! use reflex_json_rpc_server::Service;
//!
//! struct Greeter;
//!
//! let service = Service::builder(Greeter)
//!     .method("greet", &["name"], |_: &Greeter, name: String| -> Result<String, Infallible> {
//!         Ok(format!("Hello, {}", name))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(service.method_names(), vec!["greet"]);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::classify::ErrorMapping;
use crate::error::{HandlerError, RegistryError};

/// A fully bound call, ready for the invoker.
pub type BoundCall = Box<dyn FnOnce() -> Result<Value, HandlerError> + Send>;

/// Converts positional JSON arguments into a [`BoundCall`].
pub type OperationBinder =
    Box<dyn Fn(Vec<Value>) -> Result<BoundCall, serde_json::Error> + Send + Sync>;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: String,
    pub type_name: &'static str,
}

/// Static metadata describing one exposed operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    /// Error declarations consulted by the metadata classifier.
    pub error_mappings: Vec<ErrorMapping>,
}

impl OperationDescriptor {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn parameter_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().map(|p| p.type_name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }
}

/// A registered operation: descriptor plus argument binder.
pub struct Operation {
    descriptor: OperationDescriptor,
    binder: OperationBinder,
}

impl Operation {
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Convert positional arguments to the declared types.
    ///
    /// A conversion error only disqualifies this operation; the resolver
    /// moves on to the next candidate.
    pub fn bind(&self, args: Vec<Value>) -> Result<BoundCall, serde_json::Error> {
        (self.binder)(args)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Return values an operation may produce.
pub trait IntoRpcResult {
    fn into_rpc_result(self) -> Result<Value, HandlerError>;
}

impl<T, E> IntoRpcResult for Result<T, E>
where
    T: Serialize,
    E: Into<HandlerError>,
{
    fn into_rpc_result(self) -> Result<Value, HandlerError> {
        let value = self.map_err(Into::into)?;
        Ok(serde_json::to_value(value)?)
    }
}

/// Closures over a handler `H` that can be exposed as operations.
///
/// Implemented for `Fn(&H, A1, .., An) -> Result<T, E>` up to eight
/// arguments, where every `Ai: DeserializeOwned` and `T: Serialize`.
pub trait IntoOperation<H, Args>: Send + Sync + Sized + 'static {
    fn parameter_types() -> Vec<&'static str>;

    fn into_binder(self, handler: Arc<H>) -> OperationBinder;
}

macro_rules! impl_into_operation {
    ($($arg:ident),*) => {
        impl<H, F, R, $($arg,)*> IntoOperation<H, ($($arg,)*)> for F
        where
            H: Send + Sync + 'static,
            F: Fn(&H, $($arg),*) -> R + Send + Sync + 'static,
            R: IntoRpcResult,
            $($arg: DeserializeOwned + Send + 'static,)*
        {
            fn parameter_types() -> Vec<&'static str> {
                vec![$(std::any::type_name::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_binder(self, handler: Arc<H>) -> OperationBinder {
                let operation = Arc::new(self);
                Box::new(move |args: Vec<Value>| {
                    let mut args = args.into_iter();
                    $(
                        let $arg: $arg = serde_json::from_value(args.next().unwrap_or(Value::Null))?;
                    )*
                    let operation = Arc::clone(&operation);
                    let handler = Arc::clone(&handler);
                    let call: BoundCall =
                        Box::new(move || (*operation)(&*handler, $($arg),*).into_rpc_result());
                    Ok(call)
                })
            }
        }
    };
}

impl_into_operation!();
impl_into_operation!(A1);
impl_into_operation!(A1, A2);
impl_into_operation!(A1, A2, A3);
impl_into_operation!(A1, A2, A3, A4);
impl_into_operation!(A1, A2, A3, A4, A5);
impl_into_operation!(A1, A2, A3, A4, A5, A6);
impl_into_operation!(A1, A2, A3, A4, A5, A6, A7);
impl_into_operation!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Ordered operation registry for one endpoint.
#[derive(Debug, Default)]
pub struct Service {
    operations: Vec<Operation>,
}

impl Service {
    /// Start binding operations of `handler`.
    pub fn builder<H>(handler: H) -> ServiceBuilder<H>
    where
        H: Send + Sync + 'static,
    {
        ServiceBuilder::new(handler)
    }

    /// Operations named `method`, in declaration order.
    pub fn candidates(&self, method: &str) -> Vec<&Operation> {
        self.operations
            .iter()
            .filter(|op| op.descriptor.name == method)
            .collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.iter().map(|op| &op.descriptor)
    }

    /// Distinct method names, first declaration first.
    pub fn method_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.operations
            .iter()
            .map(|op| op.descriptor.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Builder binding closures over a handler object.
///
/// Overloads are allowed: several operations may share a name, and the
/// resolver tries them in the order they were declared here.
pub struct ServiceBuilder<H> {
    handler: Arc<H>,
    operations: Vec<Operation>,
    problems: Vec<RegistryError>,
}

impl<H> ServiceBuilder<H>
where
    H: Send + Sync + 'static,
{
    pub fn new(handler: H) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    /// Bind a handler that is already shared elsewhere.
    pub fn from_arc(handler: Arc<H>) -> Self {
        Self {
            handler,
            operations: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Expose `f` as operation `name`, with parameters named `param_names`
    /// in positional order.
    pub fn method<F, Args>(mut self, name: &str, param_names: &[&str], f: F) -> Self
    where
        F: IntoOperation<H, Args>,
    {
        let types = F::parameter_types();

        if name.is_empty() {
            self.problems.push(RegistryError::EmptyName);
            return self;
        }
        if param_names.len() != types.len() {
            self.problems.push(RegistryError::ArityMismatch {
                name: name.to_string(),
                declared: param_names.len(),
                arity: types.len(),
            });
            return self;
        }
        let mut seen = HashSet::new();
        if let Some(dup) = param_names.iter().find(|p| !seen.insert(**p)) {
            self.problems.push(RegistryError::DuplicateParameter {
                name: name.to_string(),
                param: dup.to_string(),
            });
            return self;
        }

        let params = param_names
            .iter()
            .zip(types)
            .map(|(name, type_name)| ParamDescriptor {
                name: name.to_string(),
                type_name,
            })
            .collect();

        self.operations.push(Operation {
            descriptor: OperationDescriptor {
                name: name.to_string(),
                params,
                error_mappings: Vec::new(),
            },
            binder: f.into_binder(Arc::clone(&self.handler)),
        });
        self
    }

    /// Declare an error mapping on the most recently added operation.
    pub fn on_error(mut self, mapping: ErrorMapping) -> Self {
        match self.operations.last_mut() {
            Some(op) => op.descriptor.error_mappings.push(mapping),
            None => self.problems.push(RegistryError::DanglingErrorMapping),
        }
        self
    }

    /// Continue declaring operations against another handler object.
    pub fn handler<H2>(self, handler: H2) -> ServiceBuilder<H2>
    where
        H2: Send + Sync + 'static,
    {
        ServiceBuilder {
            handler: Arc::new(handler),
            operations: self.operations,
            problems: self.problems,
        }
    }

    pub fn build(self) -> Result<Service, RegistryError> {
        if let Some(problem) = self.problems.into_iter().next() {
            return Err(problem);
        }
        Ok(Service {
            operations: self.operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::convert::Infallible;

    struct Calculator;

    impl Calculator {
        fn add(&self, a: i64, b: i64) -> i64 {
            a + b
        }
    }

    fn calculator() -> Service {
        Service::builder(Calculator)
            .method("add", &["a", "b"], |c: &Calculator, a: i64, b: i64| -> Result<i64, Infallible> {
                Ok(c.add(a, b))
            })
            .method("add", &["a", "b"], |_: &Calculator, a: String, b: String| -> Result<String, Infallible> {
                Ok(a + &b)
            })
            .method("ping", &[], |_: &Calculator| -> Result<(), Infallible> { Ok(()) })
            .build()
            .unwrap()
    }

    #[test]
    fn test_descriptors_are_derived_from_closures() {
        let service = calculator();
        let first = service.descriptors().next().unwrap();

        assert_eq!(first.name, "add");
        assert_eq!(first.arity(), 2);
        assert_eq!(first.parameter_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(first.parameter_types().collect::<Vec<_>>(), vec!["i64", "i64"]);
        assert_eq!(service.len(), 3);
        assert_eq!(service.method_names(), vec!["add", "ping"]);
        assert_eq!(service.candidates("add").len(), 2);
    }

    #[test]
    fn test_bind_and_call() {
        let service = calculator();
        let add = service.candidates("add")[0];

        let call = add.bind(vec![json!(2), json!(3)]).unwrap();
        assert_eq!(call().unwrap(), json!(5));

        assert!(add.bind(vec![json!("x"), json!(3)]).is_err());
    }

    #[test]
    fn test_unit_return_is_null() {
        let service = calculator();
        let ping = service.candidates("ping")[0];
        let call = ping.bind(vec![]).unwrap();
        assert_eq!(call().unwrap(), Value::Null);
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let result = Service::builder(Calculator)
            .method("add", &["a"], |_: &Calculator, a: i64, b: i64| -> Result<i64, Infallible> {
                Ok(a + b)
            })
            .build();

        assert_eq!(
            result.unwrap_err(),
            RegistryError::ArityMismatch {
                name: "add".to_string(),
                declared: 1,
                arity: 2,
            }
        );
    }

    #[test]
    fn test_duplicate_parameter_is_rejected() {
        let result = Service::builder(Calculator)
            .method("add", &["a", "a"], |_: &Calculator, a: i64, b: i64| -> Result<i64, Infallible> {
                Ok(a + b)
            })
            .build();

        assert!(matches!(result, Err(RegistryError::DuplicateParameter { .. })));
    }

    #[test]
    fn test_dangling_error_mapping_is_rejected() {
        let result = Service::builder(Calculator)
            .on_error(ErrorMapping::for_type::<std::fmt::Error>(1))
            .build();

        assert_eq!(result.unwrap_err(), RegistryError::DanglingErrorMapping);
    }

    #[test]
    fn test_switching_handlers_keeps_operations() {
        struct Other;

        let service = Service::builder(Calculator)
            .method("ping", &[], |_: &Calculator| -> Result<(), Infallible> { Ok(()) })
            .handler(Other)
            .method("other", &[], |_: &Other| -> Result<&'static str, Infallible> { Ok("other") })
            .build()
            .unwrap();

        assert_eq!(service.method_names(), vec!["ping", "other"]);
    }
}
