//! # Calculator Server Example
//!
//! Exposes a small calculator over JSON-RPC 2.0 on HTTP.
//!
//! ```text
//! curl -s localhost:8080/rpc -d '{"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}'
//! curl -s 'localhost:8080/rpc?id=1&method=divide&params=%5B1,0%5D'
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use tracing::info;

use reflex_http_json_rpc::JsonRpcHttpServer;
use reflex_json_rpc_server::{DispatchEngine, ErrorMapping, Service};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Path of the JSON-RPC endpoint
    #[arg(long, default_value = "/rpc")]
    path: String,

    /// Gzip responses for clients that accept it
    #[arg(long, default_value = "false")]
    compression: bool,

    /// Content-Type of response bodies
    #[arg(long, default_value = "application/json-rpc")]
    content_type: String,
}

#[derive(Debug, thiserror::Error)]
#[error("division by zero")]
struct DivisionByZero;

#[derive(Default)]
struct Calculator {
    calls: AtomicU64,
}

impl Calculator {
    fn count(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let service = Service::builder(Calculator::default())
        .method("add", &["a", "b"], |c: &Calculator, a: i64, b: i64| -> Result<i64, Infallible> {
            c.count();
            Ok(a + b)
        })
        .method("add", &["a", "b"], |c: &Calculator, a: f64, b: f64| -> Result<f64, Infallible> {
            c.count();
            Ok(a + b)
        })
        .method("divide", &["dividend", "divisor"], |c: &Calculator, dividend: i64, divisor: i64| {
            c.count();
            if divisor == 0 {
                Err(DivisionByZero)
            } else {
                Ok(dividend / divisor)
            }
        })
        .on_error(ErrorMapping::for_type::<DivisionByZero>(-32001))
        .method("calls", &[], |c: &Calculator| -> Result<u64, Infallible> {
            Ok(c.calls.load(Ordering::Relaxed))
        })
        .build()?;

    let server = JsonRpcHttpServer::builder(DispatchEngine::new(service))
        .bind_address(args.bind)
        .rpc_path(args.path)
        .allow_compression(args.compression)
        .try_content_type(&args.content_type)?
        .build();

    info!("Starting calculator server");
    server.run().await?;
    Ok(())
}
