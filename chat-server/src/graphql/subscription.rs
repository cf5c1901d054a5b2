//! GraphQL subscription resolvers
//!
//! Each subscription taps the server's event channel and forwards the
//! events of one kind. A lagging subscriber skips what it missed.

use std::sync::Arc;

use async_graphql::{Context, Result, Subscription, ID};
use futures_util::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::events::ChatEvent;
use crate::graphql::types::{Chat, Message};
use crate::state::ServerState;

/// Stream the events selected by `pick` until the channel closes
fn events<T, F>(mut rx: broadcast::Receiver<ChatEvent>, pick: F) -> impl Stream<Item = T>
where
    F: Fn(ChatEvent) -> Option<T>,
{
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(item) = pick(event) {
                        yield item;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// GraphQL Subscription root
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Every message posted to any chat
    async fn message_added(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = Message>> {
        let rx = ctx.data::<Arc<ServerState>>()?.subscribe();
        Ok(events(rx, |event| match event {
            ChatEvent::MessageAdded(message) => Some(Message::from(message)),
            _ => None,
        }))
    }

    /// Every newly opened chat
    async fn chat_added(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = Chat>> {
        let rx = ctx.data::<Arc<ServerState>>()?.subscribe();
        Ok(events(rx, |event| match event {
            ChatEvent::ChatAdded(chat) => Some(Chat::from(chat)),
            _ => None,
        }))
    }

    /// Ids of removed chats
    async fn chat_removed(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = ID>> {
        let rx = ctx.data::<Arc<ServerState>>()?.subscribe();
        Ok(events(rx, |event| match event {
            ChatEvent::ChatRemoved(chat_id) => Some(ID(chat_id)),
            _ => None,
        }))
    }
}
