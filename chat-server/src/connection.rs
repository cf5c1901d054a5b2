use std::time::Duration;

use async_graphql::http::{WebSocket as GraphQLWebSocket, WebSocketProtocols, WsMessage};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{future, SinkExt, StreamExt};
use tracing::{debug, info};

use crate::graphql::ChatSchema;

/// Idle connections are closed if the client sends nothing for this long
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Serve GraphQL subscriptions over a single upgraded WebSocket
pub async fn handle_connection(socket: WebSocket, schema: ChatSchema, protocol: WebSocketProtocols) {
    info!(protocol = protocol.sec_websocket_protocol(), "Subscription client connected");

    let (mut sink, stream) = socket.split();

    // Text frames are protocol messages; a close frame or read error ends the session
    let input = stream
        .take_while(|msg| future::ready(matches!(msg, Ok(msg) if !matches!(msg, Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(text.to_string()),
                _ => None,
            })
        });

    let mut outgoing = Box::pin(
        GraphQLWebSocket::new(schema, input, protocol).keepalive_timeout(KEEPALIVE_TIMEOUT),
    );

    while let Some(msg) = outgoing.next().await {
        let frame = match msg {
            WsMessage::Text(text) => Message::Text(text.into()),
            WsMessage::Close(code, reason) => {
                debug!(code, reason = %reason, "Closing subscription connection");
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                }))
            }
        };
        if sink.send(frame).await.is_err() {
            break;
        }
    }

    info!("Subscription client disconnected");
}
