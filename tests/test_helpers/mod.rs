//! Test Helpers for Reflex Integration Tests
//!
//! Starts a real server on an ephemeral port around a small handler object.

#![allow(dead_code)]

use std::convert::Infallible;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use reflex_http_json_rpc::{JsonRpcHttpServer, JsonRpcHttpServerBuilder};
use reflex_json_rpc_server::{DispatchEngine, ErrorMapping, HandlerError, Service};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub species: String,
    pub height: f64,
}

#[derive(Debug, thiserror::Error)]
#[error("no tree of species {0}")]
pub struct NoSuchTree(pub String);

#[derive(Debug, Default)]
pub struct Forest {
    planted: AtomicUsize,
}

impl Forest {
    pub fn planted(&self) -> usize {
        self.planted.load(Ordering::SeqCst)
    }
}

pub fn forest_service(forest: Arc<Forest>) -> Service {
    reflex_json_rpc_server::ServiceBuilder::from_arc(forest)
        .method("testMethod", &["param1"], |_: &Forest, param: String| -> Result<String, Infallible> {
            Ok(match param.as_str() {
                "Whirinaki" => "Forest".to_string(),
                "Whir?inaki" => "For?est".to_string(),
                other => other.to_string(),
            })
        })
        .method("plant", &["tree"], |f: &Forest, _tree: Tree| -> Result<usize, Infallible> {
            Ok(f.planted.fetch_add(1, Ordering::SeqCst) + 1)
        })
        .method("tallest", &["trees"], |_: &Forest, trees: Vec<Tree>| -> Result<Option<Tree>, Infallible> {
            Ok(trees.into_iter().max_by(|a, b| a.height.total_cmp(&b.height)))
        })
        .method("find", &["species"], |_: &Forest, species: String| -> Result<Tree, NoSuchTree> {
            if species == "kauri" {
                Ok(Tree { species, height: 50.0 })
            } else {
                Err(NoSuchTree(species))
            }
        })
        .on_error(ErrorMapping::for_type::<NoSuchTree>(-32004).message("No such tree"))
        .method("fell", &[], |_: &Forest| -> Result<(), HandlerError> {
            Err(HandlerError::msg("felling is not permitted"))
        })
        .build()
        .expect("forest service")
}

pub fn forest_engine(forest: Arc<Forest>) -> DispatchEngine {
    DispatchEngine::new(forest_service(forest))
}

/// A running server and the URL of its endpoint.
pub struct TestServer {
    pub addr: SocketAddr,
    pub url: String,
    pub forest: Arc<Forest>,
    pub client: reqwest::Client,
}

pub async fn start_server() -> TestServer {
    start_server_with(|builder| builder).await
}

pub async fn start_server_with(
    configure: impl FnOnce(JsonRpcHttpServerBuilder) -> JsonRpcHttpServerBuilder,
) -> TestServer {
    let forest = Arc::new(Forest::default());
    start(forest.clone(), configure(JsonRpcHttpServer::builder(forest_engine(forest)))).await
}

/// Serve `builder` on an ephemeral port.
pub async fn start(forest: Arc<Forest>, builder: JsonRpcHttpServerBuilder) -> TestServer {
    init_tracing();

    let server = builder.build();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{}{}", addr, server.config().rpc_path);

    tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            tracing::error!("test server stopped: {}", e);
        }
    });

    TestServer {
        addr,
        url,
        forest,
        client: reqwest::Client::new(),
    }
}

impl TestServer {
    /// `url` with a form-encoded query string.
    pub fn query_url(&self, pairs: &[(&str, &str)]) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in pairs {
            serializer.append_pair(name, value);
        }
        format!("{}?{}", self.url, serializer.finish())
    }

    pub async fn post(&self, body: impl Into<String>) -> reqwest::Response {
        self.client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body.into())
            .send()
            .await
            .unwrap()
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn gunzip(data: &[u8]) -> String {
    let mut text = String::new();
    GzDecoder::new(data).read_to_string(&mut text).unwrap();
    text
}
