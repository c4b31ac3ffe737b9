use axum::http::Method;
use axum::{routing::get, Router};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use builders::errors::ConfigResult;
use builders::BuildersResult;
use builders::websocket::ws_handler;
use builders::{Lobby, RuleSet};

#[derive(Parser, Debug)]
#[command(name = "builders-server", version, about = "Game server for The Builders")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// JSON rules file. Defaults apply to anything it leaves out.
    #[arg(short, long)]
    rules: Option<PathBuf>,
}

fn load_rules(path: Option<&PathBuf>) -> ConfigResult<RuleSet> {
    match path {
        Some(path) => {
            log::info!("Loading rules from {}", path.display());
            RuleSet::from_file(path)
        }
        None => Ok(RuleSet::default()),
    }
}

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> BuildersResult<()> {
    // Initialize logger
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args = Args::parse();
    let rules = load_rules(args.rules.as_ref()).inspect_err(|e| log::error!("❌ {}", e))?;

    let lobby = Lobby::new(rules);

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(Arc::clone(&lobby))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    log::info!("🏗️ Builders server listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
            lobby.shutdown().await;
        })
        .await?;
    Ok(())
}
