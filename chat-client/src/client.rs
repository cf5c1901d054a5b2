//! Queries and mutations over HTTP, written through to the local cache

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{
    erase_chat, write_chat, write_chat_query, write_chats_query, write_message, CacheStore,
    InMemoryCache, OptimisticWrite,
};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::graphql::{
    request_body, AddChatData, AddMessageData, ChatData, ChatsData, GraphQLResponse,
    RemoveChatData, UsersData, ADD_CHAT_MUTATION, ADD_MESSAGE_MUTATION, CHATS_QUERY,
    GET_CHAT_QUERY, REMOVE_CHAT_MUTATION, USERS_QUERY,
};
use crate::models::input::{CreateChatInput, RemoveChatInput, SendMessageInput, ValidateExt};
use crate::models::{ChatSummary, FullChat, Message, User};

/// Shared handle to a cache store
pub type SharedCache<S> = Arc<Mutex<S>>;

/// GraphQL client whose results keep the local cache up to date
pub struct ChatClient<S = InMemoryCache> {
    http: reqwest::Client,
    endpoint: Url,
    cache: SharedCache<S>,
}

impl<S: CacheStore> ChatClient<S> {
    pub fn new(config: &ClientConfig, store: S) -> Result<Self> {
        Self::with_cache(config, Arc::new(Mutex::new(store)))
    }

    /// Client writing into a cache shared with other components
    pub fn with_cache(config: &ClientConfig, cache: SharedCache<S>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: config.graphql_url()?,
            cache,
        })
    }

    pub fn cache(&self) -> SharedCache<S> {
        self.cache.clone()
    }

    /// Run `f` with exclusive access to the store. Never held across an await.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut store = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut store)
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let response: GraphQLResponse<T> = self
            .http
            .post(self.endpoint.clone())
            .json(&request_body(query, variables))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response.into_result()
    }

    /// Fetch the chat list and replace the cached one
    pub async fn fetch_chats(&self) -> Result<Vec<ChatSummary>> {
        let data: ChatsData = self.execute(CHATS_QUERY, json!({})).await?;
        debug!(count = data.chats.len(), "Fetched chats");
        self.with_store(|store| write_chats_query(store, data.chats.clone()));
        Ok(data.chats)
    }

    /// Fetch one chat with its history and cache it
    pub async fn fetch_chat(&self, chat_id: &str) -> Result<Option<FullChat>> {
        let data: ChatData = self
            .execute(GET_CHAT_QUERY, json!({ "chatId": chat_id }))
            .await?;
        self.with_store(|store| write_chat_query(store, chat_id, data.chat.clone()));
        Ok(data.chat)
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        let data: UsersData = self.execute(USERS_QUERY, json!({})).await?;
        Ok(data.users)
    }

    /// Send a message.
    ///
    /// The message shows up in the cache immediately under a local id; once
    /// the server answers, the optimistic write is rolled back and the
    /// server's message is inserted instead. `None` if the chat is gone.
    pub async fn add_message(&self, chat_id: &str, content: &str) -> Result<Option<Message>> {
        let input = SendMessageInput {
            chat_id: chat_id.to_string(),
            content: content.to_string(),
        };
        input.validate_input()?;

        let optimistic = Message::optimistic(chat_id, content);
        let (pending, outcome) =
            self.with_store(|store| OptimisticWrite::message(store, &optimistic));
        debug!(?outcome, message_id = %optimistic.id, "Optimistic message");

        let result: Result<AddMessageData> = self
            .execute(ADD_MESSAGE_MUTATION, serde_json::to_value(&input)?)
            .await;

        self.with_store(|store| {
            pending.rollback(store);
            if let Ok(AddMessageData {
                add_message: Some(message),
            }) = &result
            {
                let outcome = write_message(store, message);
                debug!(?outcome, message_id = %message.id, "Confirmed message");
            }
        });

        let message = result?.add_message;
        match &message {
            Some(m) => info!(chat_id, message_id = %m.id, "Message sent"),
            None => warn!(chat_id, "Message rejected, chat does not exist"),
        }
        Ok(message)
    }

    /// Open a chat with `recipient`, optimistically listing it first
    pub async fn add_chat(&self, recipient: &User) -> Result<Option<ChatSummary>> {
        let input = CreateChatInput {
            recipient_id: recipient.id.clone(),
        };
        input.validate_input()?;

        let optimistic = ChatSummary::optimistic(recipient);
        let (pending, outcome) = self.with_store(|store| OptimisticWrite::chat(store, &optimistic));
        debug!(?outcome, chat_id = %optimistic.id, "Optimistic chat");

        let result: Result<AddChatData> = self
            .execute(ADD_CHAT_MUTATION, serde_json::to_value(&input)?)
            .await;

        self.with_store(|store| {
            pending.rollback(store);
            if let Ok(AddChatData {
                add_chat: Some(chat),
            }) = &result
            {
                let outcome = write_chat(store, chat);
                debug!(?outcome, chat_id = %chat.id, "Confirmed chat");
            }
        });

        let chat = result?.add_chat;
        if let Some(chat) = &chat {
            info!(chat_id = %chat.id, recipient_id = %recipient.id, "Chat opened");
        }
        Ok(chat)
    }

    /// Remove a chat on the server and erase it from the cache
    pub async fn remove_chat(&self, chat_id: &str) -> Result<Option<String>> {
        let input = RemoveChatInput {
            chat_id: chat_id.to_string(),
        };
        input.validate_input()?;

        let data: RemoveChatData = self
            .execute(REMOVE_CHAT_MUTATION, serde_json::to_value(&input)?)
            .await?;

        if let Some(removed) = &data.remove_chat {
            let outcome = self.with_store(|store| erase_chat(store, removed));
            info!(chat_id = %removed, ?outcome, "Chat removed");
        }
        Ok(data.remove_chat)
    }
}
