use std::sync::Arc;

use chat_server::{router, ServerState};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:4000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("CHAT_SERVER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    let state = Arc::new(ServerState::new());

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Chat server listening on {}", addr);
    info!("REST endpoint: http://{}/chats", addr);
    info!("GraphQL endpoint: http://{}/graphql", addr);

    if let Err(e) = axum::serve(listener, router(state)).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
