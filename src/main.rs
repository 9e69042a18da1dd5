//! Gateway entry point: flags, logging, assembly, serve, drain.

use clap::Parser;
use portcullis::config::GatewayConfig;
use portcullis::gateway::Gateway;
use portcullis::routes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portcullis", about = "API gateway for the service fleet")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = GatewayConfig::from_env();

    let gateway = Arc::new(Gateway::new(config).expect("gateway assembly failed"));
    gateway.start_background();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .expect("invalid bind address");
    let listener = TcpListener::bind(addr).await.expect("bind error");
    tracing::info!("listening on http://{addr}");

    let app = routes::router(Arc::clone(&gateway))
        .into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // In-flight requests have drained; now stop the background tasks.
    gateway.shutdown().await;
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received, draining");
}
