//! GraphQL mutation resolvers

use std::sync::Arc;

use async_graphql::{Context, Object, Result, ID};
use tracing::warn;

use crate::graphql::types::{Chat, Message};
use crate::state::ServerState;

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Post a message to a chat. Null if the chat does not exist.
    async fn add_message(
        &self,
        ctx: &Context<'_>,
        chat_id: ID,
        #[graphql(validator(chars_max_length = 10000))] content: String,
    ) -> Result<Option<Message>> {
        let state = ctx.data::<Arc<ServerState>>()?;

        if content.trim().is_empty() {
            return Err(async_graphql::Error::new("Message content cannot be empty"));
        }

        let message = state.add_message(&chat_id, &content);
        if message.is_none() {
            warn!(chat_id = %chat_id.as_str(), "addMessage on unknown chat");
        }
        Ok(message.map(Message::from))
    }

    /// Open a chat with a user, or return the one already open
    async fn add_chat(&self, ctx: &Context<'_>, recipient_id: ID) -> Result<Option<Chat>> {
        let state = ctx.data::<Arc<ServerState>>()?;
        Ok(state.add_chat(&recipient_id).map(Chat::from))
    }

    /// Remove a chat and its messages. Returns the removed id.
    async fn remove_chat(&self, ctx: &Context<'_>, chat_id: ID) -> Result<Option<ID>> {
        let state = ctx.data::<Arc<ServerState>>()?;
        Ok(state.remove_chat(&chat_id).map(ID))
    }
}
