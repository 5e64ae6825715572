//! agentloop HTTP Server
//!
//! Axum-based server exposing a configured agent over a small REST API.
//! Each chat request runs on a fresh agent with its own conversation.

mod handlers;
mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentloop_runtime::AgentFactory;

use crate::handlers::{chat_handler, health_check, list_tools};
use crate::state::AppState;

/// Log filter directives: `RUST_LOG` if set, otherwise the server default
fn log_filter<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("RUST_LOG")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "info,tower_http=debug".into())
}

/// Router with all routes and layers applied
fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment first so `.env` can set RUST_LOG
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_filter(|key| {
            std::env::var(key).ok()
        })))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv {
        Ok(path) => tracing::debug!("Loaded {}", path.display()),
        Err(e) => tracing::debug!("No .env loaded: {}", e),
    }

    let factory = AgentFactory::from_env()?;

    tracing::info!(
        provider = %factory.config().provider,
        model = %factory.model_name(),
        transport = ?factory.config().transport,
        "Model configured"
    );
    tracing::info!("Registered {} tools:", factory.tools().len());
    for name in factory.tools().names() {
        tracing::info!("  • {}", name);
    }

    let state = AppState::new(factory);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("agentloop server running on http://{}", addr);
    tracing::info!("  GET  /health     - Health check");
    tracing::info!("  GET  /api/tools  - Registered tool definitions");
    tracing::info!("  POST /api/chat   - Run the agent on a message");

    axum::serve(listener, app(state)).await?;

    Ok(())
}
