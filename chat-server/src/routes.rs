//! HTTP surface
//!
//! - `GET /_ping` - liveness probe
//! - `GET /chats` - chat list as plain JSON
//! - `POST /graphql` - queries and mutations
//! - `GET /graphql` - GraphQL playground
//! - `GET /graphql/ws` - subscriptions (graphql-transport-ws or graphql-ws)

use std::str::FromStr;
use std::sync::Arc;

use async_graphql::http::{
    playground_source, GraphQLPlaygroundConfig, WebSocketProtocols, ALL_WEBSOCKET_PROTOCOLS,
};
use axum::{
    extract::{State, WebSocketUpgrade},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::debug;

use crate::connection::handle_connection;
use crate::graphql::{build_schema, ChatSchema};
use crate::models::ChatSummary;
use crate::state::ServerState;

#[derive(Clone)]
pub struct AppState {
    pub schema: ChatSchema,
    pub state: Arc<ServerState>,
}

/// Build the full router around the shared server state
pub fn router(state: Arc<ServerState>) -> Router {
    let app = AppState {
        schema: build_schema(state.clone()),
        state,
    };

    Router::new()
        .route("/_ping", get(ping))
        .route("/chats", get(list_chats))
        .route("/graphql", get(playground).post(graphql_handler))
        .route("/graphql/ws", get(graphql_ws_handler))
        .with_state(app)
}

async fn ping() -> &'static str {
    "pong"
}

async fn list_chats(State(app): State<AppState>) -> Json<Vec<ChatSummary>> {
    debug!("GET /chats");
    Json(app.state.chat_summaries())
}

async fn graphql_handler(
    State(app): State<AppState>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(app.schema.execute(request).await)
}

async fn playground() -> impl IntoResponse {
    Html(playground_source(
        GraphQLPlaygroundConfig::new("/graphql").subscription_endpoint("/graphql/ws"),
    ))
}

/// First sub-protocol offered by the client that we speak
fn negotiate_protocol(headers: &HeaderMap) -> WebSocketProtocols {
    headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .and_then(|offered| {
            offered
                .split(',')
                .find_map(|p| WebSocketProtocols::from_str(p.trim()).ok())
        })
        .unwrap_or(WebSocketProtocols::GraphQLWS)
}

async fn graphql_ws_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let protocol = negotiate_protocol(&headers);
    ws.protocols(ALL_WEBSOCKET_PROTOCOLS)
        .on_upgrade(move |socket| handle_connection(socket, app.schema, protocol))
}
