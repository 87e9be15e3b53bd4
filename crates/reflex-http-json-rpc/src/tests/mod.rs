//! Test modules for reflex-http-json-rpc crate
//!
//! Scenario tests drive `HttpAdapter::handle` directly with in-memory
//! requests; no sockets are involved.

pub mod server_config_tests;
