//! SCGI gateway server.
//!
//! # Architecture Overview
//!
//! ```text
//!   front-end web server
//!          │ SCGI over TCP
//!          ▼
//!   ┌───────────────────────── dispatching process ─────────────────────────┐
//!   │  net::listener ──▶ dispatcher (epoll) ◀── lifecycle::signals (signalfd) │
//!   │                        │                                                │
//!   │                        ▼                                                │
//!   │                  net::acceptor ── accept until EAGAIN                   │
//!   └────────────────────────┼────────────────────────────────────────────────┘
//!                            │ fork (or thread), one per connection
//!                            ▼
//!   worker: protocol::scgi read → routing::Router → handler → Response::send → exit
//! ```

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use scgi_gateway::config::{load_config, ServerConfig};
use scgi_gateway::observability::logging;
use scgi_gateway::{Context, Request, Response, Route, RouteTable, Server};

#[derive(Parser, Debug)]
#[command(name = "scgi-gateway")]
#[command(version, about = "SCGI application gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `observability.log_level`.
    #[arg(short, long)]
    log_level: Option<String>,
}

fn ping(_: &Context, _: &Request, resp: &mut Response) {
    resp.set_body("pong");
}

fn hello(ctx: &Context, req: &Request, resp: &mut Response) {
    let greeting = ctx.config_str("greeting", "Hello");
    let name = req.param("name").unwrap_or("world");
    // Writing into the in-memory body cannot fail.
    let _ = write!(resp, "{greeting}, {name}!");
}

fn routes() -> RouteTable {
    RouteTable::new()
        .route(Route::get("/ping", ping))
        .route(Route::get("/hello", hello))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("scgi-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        address = %config.listener.address,
        port = config.listener.port,
        base_path = %config.routing.base_path,
        "Configuration loaded"
    );

    let server = Server::new(config, routes())?;
    tracing::info!(address = %server.local_addr()?, "Listening for connections");

    server.start()?;

    tracing::info!("Shutdown complete");
    Ok(())
}
