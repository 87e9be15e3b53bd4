//! One HTTP exchange in, one HTTP response out.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use reflex_json_rpc_server::{
    DecodeFailure, DispatchEngine, DispatchOutcome, QueryRequest, ResponseEncoder,
};

use crate::compression::{self, InflateError};
use crate::config::TransportConfig;
use crate::status::{DefaultStatusCodeProvider, HttpStatusCodeProvider};
use crate::{HttpRpcError, Result};

/// Runs JSON-RPC exchanges against a [`DispatchEngine`].
///
/// `handle` is synchronous: handler operations run on the calling thread.
#[derive(Clone)]
pub struct HttpAdapter {
    engine: Arc<DispatchEngine>,
    transport: TransportConfig,
    status: Arc<dyn HttpStatusCodeProvider>,
}

impl HttpAdapter {
    pub fn new(engine: DispatchEngine) -> Self {
        Self::with_config(Arc::new(engine), TransportConfig::default())
    }

    pub fn with_config(engine: Arc<DispatchEngine>, transport: TransportConfig) -> Self {
        Self {
            engine,
            transport,
            status: Arc::new(DefaultStatusCodeProvider),
        }
    }

    /// Replace the HTTP status policy.
    pub fn status_provider(mut self, provider: Arc<dyn HttpStatusCodeProvider>) -> Self {
        self.status = provider;
        self
    }

    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub fn handle(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let outcome = if *request.method() == Method::GET {
            let query = QueryRequest::parse(request.uri().query().unwrap_or(""));
            debug!(?query, "decoding query-string request");
            self.engine.dispatch_query(&query)
        } else {
            let body = request.body();
            if compression::is_gzip_encoded(request.headers()) {
                match compression::inflate(body, self.transport.max_decompressed_size) {
                    Ok(inflated) => self.engine.dispatch_body(&inflated),
                    Err(InflateError::TooLarge { limit }) => {
                        warn!(limit, "inflated request body too large");
                        return plain(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large");
                    }
                    Err(InflateError::Corrupt(e)) => {
                        warn!(error = %e, "failed to inflate request body");
                        self.engine
                            .dispatch_decoded(Err(DecodeFailure::parse_error(format!(
                                "corrupt gzip body: {}",
                                e
                            ))))
                    }
                }
            } else {
                self.engine.dispatch_body(body)
            }
        };

        self.write(&request, &outcome)
    }

    fn write(&self, request: &Request<Bytes>, outcome: &DispatchOutcome) -> Result<Response<Bytes>> {
        let status = self.status.status_for(outcome);
        debug!(status = status.as_u16(), "writing response");

        let Some(body) = ResponseEncoder.encode(outcome)? else {
            return Ok(Response::builder().status(status).body(Bytes::new())?);
        };

        let mut response = Response::builder()
            .status(status)
            .header(CONTENT_TYPE, self.transport.content_type.clone());

        let body = if self.transport.allow_compression && compression::accepts_gzip(request.headers()) {
            response = response.header(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            compression::gzip(&body).map_err(HttpRpcError::Compression)?
        } else {
            body
        };

        Ok(response.body(Bytes::from(body))?)
    }
}

impl std::fmt::Debug for HttpAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdapter")
            .field("engine", &self.engine)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

fn plain(status: StatusCode, text: &'static str) -> Result<Response<Bytes>> {
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
        .body(Bytes::from_static(text.as_bytes()))?)
}
