//! Demo server for the exgin middleware stack.
//!
//! ```text
//! exgin --config exgin.toml
//! curl -s localhost:8080/ping
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use axum::{
    extract::{Extension, Path},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use exgin::config::{load_config, EngineConfig};
use exgin::http::request::{path_int64, Bind, Params, RequestContext};
use exgin::lifecycle::signals::shutdown_on_ctrl_c;
use exgin::observability::logging::init_logging;
use exgin::{ApiError, Engine, Envelope, Shutdown};

#[derive(Parser)]
#[command(name = "exgin")]
#[command(about = "Demo server for the exgin middleware stack", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force debug mode.
    #[arg(long)]
    debug: bool,

    /// Override the bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Item {
    name: String,
    quantity: u32,
}

async fn ping() -> Envelope<&'static str> {
    Envelope::success("pong")
}

async fn list_items(params: Params) -> Result<Envelope<serde_json::Value>, ApiError> {
    let limit = params.int("limit", Some(10))?;
    let offset = params.offset(limit)?;
    Ok(Envelope::success(serde_json::json!({ "limit": limit, "offset": offset })))
}

async fn get_item(Path(params): Path<HashMap<String, String>>) -> Result<Envelope<i64>, ApiError> {
    let id = path_int64(&params, "id")?;
    if id == 0 {
        return Err(ApiError::bad_request("not found"));
    }
    Ok(Envelope::success(id))
}

async fn create_item(
    Extension(ctx): Extension<RequestContext>,
    Bind(item): Bind<Item>,
) -> Envelope<Item> {
    if item.quantity == 0 {
        ctx.push_error("item created with zero quantity");
    }
    Envelope::success(item)
}

async fn fail() -> Envelope<()> {
    panic!("demo panic")
}

fn app() -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item))
        .route("/panic", post(fail))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    config.debug |= cli.debug;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    init_logging(config.debug)?;
    let engine = Engine::new(config)?;

    tracing::info!(
        bind_address = %engine.config().bind_address,
        debug = engine.config().debug,
        "exgin v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let listener = TcpListener::bind(&engine.config().bind_address).await?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

    engine.run(app(), listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
