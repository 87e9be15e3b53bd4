//! Server Tests
//!
//! Builder wiring plus a few raw HTTP/1.1 exchanges against a live listener.

use std::convert::Infallible;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use reflex_json_rpc_server::{DispatchEngine, Service};

use crate::server::{JsonRpcHttpServer, JsonRpcHttpServerBuilder, ServerConfig};

struct Echo;

fn engine() -> DispatchEngine {
    let service = Service::builder(Echo)
        .method("echo", &["text"], |_: &Echo, text: String| -> Result<String, Infallible> { Ok(text) })
        .build()
        .unwrap();
    DispatchEngine::new(service)
}

async fn start(builder: JsonRpcHttpServerBuilder) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = builder.build();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

async fn exchange(addr: std::net::SocketAddr, raw: String) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn post(path: &str, body: &str) -> String {
    format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path,
        body.len(),
        body
    )
}

/// Test basic server configuration
#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_server_config_customization() {
        let config = ServerConfig {
            enable_cors: true,
            rpc_path: "/custom".to_string(),
            max_body_size: 2 * 1024 * 1024,
            ..Default::default()
        };

        assert!(config.enable_cors);
        assert_eq!(config.rpc_path, "/custom");
        assert_eq!(config.max_body_size, 2 * 1024 * 1024);
    }

    #[test]
    fn test_builder_carries_transport_settings() {
        let server = JsonRpcHttpServer::builder(engine())
            .rpc_path("/api")
            .cors(true)
            .try_content_type("flip/flop")
            .unwrap()
            .allow_compression(true)
            .build();

        assert_eq!(server.config().rpc_path, "/api");
        assert!(server.config().enable_cors);
        assert_eq!(server.adapter().transport().content_type, "flip/flop");
        assert!(server.adapter().transport().allow_compression);
        assert_eq!(server.adapter().engine().service().method_names(), vec!["echo"]);
    }
}

/// Live listener exchanges
#[cfg(test)]
mod live_tests {
    use super::*;

    #[tokio::test]
    async fn test_post_round_trip() {
        let addr = start(JsonRpcHttpServer::builder(engine())).await;
        let response = exchange(addr, post("/rpc", r#"{"jsonrpc":"2.0","id":1,"method":"echo","params":["hi"]}"#)).await;

        assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
        assert!(response.contains("content-type: application/json-rpc"), "{}", response);
        assert!(response.ends_with(r#"{"jsonrpc":"2.0","id":1,"result":"hi"}"#), "{}", response);
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let addr = start(JsonRpcHttpServer::builder(engine())).await;
        let response = exchange(addr, post("/elsewhere", "{}")).await;

        assert!(response.starts_with("HTTP/1.1 404"), "{}", response);
        assert!(response.ends_with("Not Found"), "{}", response);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let addr = start(JsonRpcHttpServer::builder(engine()).max_body_size(16)).await;
        let response = exchange(addr, post("/rpc", r#"{"jsonrpc":"2.0","id":1,"method":"echo","params":["a long enough text"]}"#)).await;

        assert!(response.starts_with("HTTP/1.1 413"), "{}", response);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let addr = start(JsonRpcHttpServer::builder(engine()).cors(true)).await;
        let response = exchange(
            addr,
            "OPTIONS /rpc HTTP/1.1\r\nHost: localhost\r\nOrigin: http://example.com\r\nConnection: close\r\n\r\n".to_string(),
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 204"), "{}", response);
        assert!(response.contains("access-control-allow-origin: *"), "{}", response);
    }
}
