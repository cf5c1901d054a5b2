//! GraphQL object types for chats, messages and users

use std::sync::Arc;

use async_graphql::{ComplexObject, Context, Result, SimpleObject, ID};
use chrono::{DateTime, Utc};
use url::Url;

use crate::models::{ChatRecord, MessageRecord, MessagesPage, UserRecord};
use crate::state::ServerState;

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct Chat {
    pub id: ID,
    pub name: String,
    pub picture: Option<Url>,
}

#[ComplexObject]
impl Chat {
    /// Most recent message, if the chat has any
    async fn last_message(&self, ctx: &Context<'_>) -> Result<Option<Message>> {
        let state = ctx.data::<Arc<ServerState>>()?;
        Ok(state.last_message(&self.id).map(Message::from))
    }

    /// Page backwards through the chat history
    async fn messages(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20, validator(minimum = 0, maximum = 1000))] limit: i32,
        #[graphql(
            desc = "Cursor of the previously loaded page. Only messages created strictly before it (epoch millis) are returned, so this pages towards older messages."
        )]
        after: Option<f64>,
    ) -> Result<MessagesResult> {
        let state = ctx.data::<Arc<ServerState>>()?;
        let page = state
            .messages(&self.id, limit as usize, after.map(|a| a as i64))
            .unwrap_or(MessagesPage {
                messages: Vec::new(),
                has_more: false,
                cursor: None,
            });
        Ok(page.into())
    }
}

impl From<ChatRecord> for Chat {
    fn from(chat: ChatRecord) -> Self {
        Self {
            id: ID(chat.id),
            name: chat.name,
            picture: chat.picture,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct MessagesResult {
    /// Creation time (epoch millis) of the oldest message returned
    pub cursor: Option<f64>,
    pub has_more: bool,
    pub messages: Vec<Message>,
}

impl From<MessagesPage> for MessagesResult {
    fn from(page: MessagesPage) -> Self {
        Self {
            cursor: page.cursor.map(|c| c as f64),
            has_more: page.has_more,
            messages: page.messages.into_iter().map(Message::from).collect(),
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct Message {
    pub id: ID,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[graphql(skip)]
    pub chat_id: String,
}

#[ComplexObject]
impl Message {
    /// Owning chat; null once the chat has been removed
    async fn chat(&self, ctx: &Context<'_>) -> Result<Option<Chat>> {
        let state = ctx.data::<Arc<ServerState>>()?;
        Ok(state.chat(&self.chat_id).map(Chat::from))
    }
}

impl From<MessageRecord> for Message {
    fn from(message: MessageRecord) -> Self {
        Self {
            id: ID(message.id),
            content: message.content,
            created_at: message.created_at,
            chat_id: message.chat_id,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct User {
    pub id: ID,
    pub name: String,
    pub picture: Option<Url>,
}

impl From<UserRecord> for User {
    fn from(user: UserRecord) -> Self {
        Self {
            id: ID(user.id),
            name: user.name,
            picture: user.picture,
        }
    }
}
