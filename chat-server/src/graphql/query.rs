//! GraphQL query resolvers

use std::sync::Arc;

use async_graphql::{Context, Object, Result, ID};

use crate::graphql::types::{Chat, User};
use crate::state::ServerState;

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All chats, most recently active first
    async fn chats(&self, ctx: &Context<'_>) -> Result<Vec<Chat>> {
        let state = ctx.data::<Arc<ServerState>>()?;
        Ok(state.chats().into_iter().map(Chat::from).collect())
    }

    /// A single chat, or null if it does not exist
    async fn chat(&self, ctx: &Context<'_>, chat_id: ID) -> Result<Option<Chat>> {
        let state = ctx.data::<Arc<ServerState>>()?;
        Ok(state.chat(&chat_id).map(Chat::from))
    }

    /// Everyone a chat can be opened with
    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let state = ctx.data::<Arc<ServerState>>()?;
        Ok(state.users().into_iter().map(User::from).collect())
    }
}
