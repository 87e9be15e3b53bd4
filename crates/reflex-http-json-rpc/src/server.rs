//! HTTP JSON-RPC server
//!
//! A hyper HTTP/1.1 accept loop in front of an [`HttpAdapter`]. Each
//! connection gets its own task; each exchange is collected into memory and
//! dispatched on a blocking worker, since handler operations are synchronous.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use reflex_json_rpc_server::DispatchEngine;

use crate::{CorsLayer, HttpAdapter, HttpRpcError, HttpStatusCodeProvider, Result, TransportConfig};

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path of the JSON-RPC endpoint
    pub rpc_path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size, before any gzip inflation
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            rpc_path: "/rpc".to_string(),
            enable_cors: false,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Builder for the HTTP JSON-RPC server
pub struct JsonRpcHttpServerBuilder {
    config: ServerConfig,
    transport: TransportConfig,
    engine: DispatchEngine,
    status: Option<Arc<dyn HttpStatusCodeProvider>>,
}

impl JsonRpcHttpServerBuilder {
    pub fn new(engine: DispatchEngine) -> Self {
        Self {
            config: ServerConfig::default(),
            transport: TransportConfig::default(),
            engine,
            status: None,
        }
    }

    /// Replace the whole server configuration
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the JSON-RPC endpoint path
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.rpc_path = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Set the response `Content-Type`
    pub fn content_type(mut self, content_type: HeaderValue) -> Self {
        self.transport.content_type = content_type;
        self
    }

    /// Set the response `Content-Type` from text, rejecting invalid header values
    pub fn try_content_type(mut self, content_type: &str) -> Result<Self> {
        self.transport = self.transport.try_content_type(content_type)?;
        Ok(self)
    }

    /// Gzip responses for clients that accept it
    pub fn allow_compression(mut self, allow: bool) -> Self {
        self.transport.allow_compression = allow;
        self
    }

    pub fn status_provider(mut self, provider: Arc<dyn HttpStatusCodeProvider>) -> Self {
        self.status = Some(provider);
        self
    }

    pub fn build(self) -> JsonRpcHttpServer {
        let mut adapter = HttpAdapter::with_config(Arc::new(self.engine), self.transport);
        if let Some(provider) = self.status {
            adapter = adapter.status_provider(provider);
        }
        JsonRpcHttpServer {
            config: Arc::new(self.config),
            adapter: Arc::new(adapter),
        }
    }
}

/// HTTP JSON-RPC server
#[derive(Clone)]
pub struct JsonRpcHttpServer {
    config: Arc<ServerConfig>,
    adapter: Arc<HttpAdapter>,
}

impl JsonRpcHttpServer {
    pub fn builder(engine: DispatchEngine) -> JsonRpcHttpServerBuilder {
        JsonRpcHttpServerBuilder::new(engine)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn adapter(&self) -> &HttpAdapter {
        &self.adapter
    }

    /// Bind the configured address and serve until an accept error
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("HTTP JSON-RPC server listening on {}", local_addr);
        info!("JSON-RPC endpoint available at: {}", self.config.rpc_path);
        info!(
            "Operations: {}",
            self.adapter.engine().service().method_names().join(", ")
        );

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let server = self.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| handle_request(req, server.clone()));

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Filter out common client disconnection errors that aren't actual problems
                    if err.is_incomplete_message() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    server: JsonRpcHttpServer,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("Handling {} {}", method, path);

    let mut response = if path != server.config.rpc_path {
        plain_response(StatusCode::NOT_FOUND, "Not Found")
    } else if method == Method::OPTIONS && server.config.enable_cors {
        CorsLayer::preflight().map(Full::new)
    } else {
        match exchange(req, &server).await {
            Ok(response) => response.map(Full::new),
            Err(HttpRpcError::BodyTooLarge { limit }) => {
                warn!("Request body exceeds {} bytes", limit);
                plain_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
            }
            Err(err) => {
                error!("Request handling error: {}", err);
                plain_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal Server Error: {}", err),
                )
            }
        }
    };

    if server.config.enable_cors {
        CorsLayer::apply_cors_headers(response.headers_mut());
    }
    Ok(response)
}

async fn exchange(req: Request<hyper::body::Incoming>, server: &JsonRpcHttpServer) -> Result<Response<Bytes>> {
    let (parts, body) = req.into_parts();
    let limit = server.config.max_body_size;

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(HttpRpcError::BodyTooLarge { limit });
        }
        Err(err) => match err.downcast::<hyper::Error>() {
            Ok(hyper_err) => return Err(HttpRpcError::Http(*hyper_err)),
            Err(other) => return Err(HttpRpcError::Io(std::io::Error::other(other))),
        },
    };

    let request = Request::from_parts(parts, body);
    let adapter = Arc::clone(&server.adapter);
    tokio::task::spawn_blocking(move || adapter.handle(request)).await?
}

fn plain_response(status: StatusCode, text: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(text.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.rpc_path, "/rpc");
        assert!(!config.enable_cors);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_plain_response() {
        let response = plain_response(StatusCode::NOT_FOUND, "Not Found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
