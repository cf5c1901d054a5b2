//! GraphQL documents and response shapes

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::models::{ChatSummary, FullChat, Message, User};

macro_rules! message_fragment {
    () => {
        "fragment Message on Message { id content createdAt chat { id } }"
    };
}

macro_rules! chat_fragment {
    () => {
        "fragment Chat on Chat { id name picture lastMessage { ...Message } }"
    };
}

macro_rules! full_chat_fragment {
    () => {
        "fragment FullChat on Chat { ...Chat messages(limit: 100, after: 0) { hasMore cursor messages { ...Message } } }"
    };
}

pub const CHATS_QUERY: &str = concat!(
    "query Chats { chats { ...Chat } } ",
    chat_fragment!(),
    " ",
    message_fragment!()
);

pub const GET_CHAT_QUERY: &str = concat!(
    "query GetChat($chatId: ID!) { chat(chatId: $chatId) { ...FullChat } } ",
    full_chat_fragment!(),
    " ",
    chat_fragment!(),
    " ",
    message_fragment!()
);

pub const USERS_QUERY: &str = "query Users { users { id name picture } }";

pub const ADD_MESSAGE_MUTATION: &str = concat!(
    "mutation AddMessage($chatId: ID!, $content: String!) { addMessage(chatId: $chatId, content: $content) { ...Message } } ",
    message_fragment!()
);

pub const ADD_CHAT_MUTATION: &str = concat!(
    "mutation AddChat($recipientId: ID!) { addChat(recipientId: $recipientId) { ...Chat } } ",
    chat_fragment!(),
    " ",
    message_fragment!()
);

pub const REMOVE_CHAT_MUTATION: &str =
    "mutation RemoveChat($chatId: ID!) { removeChat(chatId: $chatId) }";

pub const MESSAGE_ADDED_SUBSCRIPTION: &str = concat!(
    "subscription MessageAdded { messageAdded { ...Message } } ",
    message_fragment!()
);

pub const CHAT_ADDED_SUBSCRIPTION: &str = concat!(
    "subscription ChatAdded { chatAdded { ...Chat } } ",
    chat_fragment!(),
    " ",
    message_fragment!()
);

pub const CHAT_REMOVED_SUBSCRIPTION: &str = "subscription ChatRemoved { chatRemoved }";

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

/// Standard GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

impl<T> GraphQLResponse<T> {
    /// Data if the request succeeded, the server's error messages otherwise
    pub fn into_result(self) -> Result<T> {
        if !self.errors.is_empty() {
            return Err(ClientError::GraphQL(
                self.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        self.data
            .ok_or_else(|| ClientError::Protocol("Response carried neither data nor errors".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatsData {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ChatData {
    pub chat: Option<FullChat>,
}

#[derive(Debug, Deserialize)]
pub struct UsersData {
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageData {
    pub add_message: Option<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChatData {
    pub add_chat: Option<ChatSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveChatData {
    pub remove_chat: Option<String>,
}

/// Body of a GraphQL request
pub fn request_body(query: &str, variables: Value) -> Value {
    serde_json::json!({ "query": query, "variables": variables })
}
