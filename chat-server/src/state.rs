use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::ChatEvent;
use crate::models::{
    seed, ChatRecord, ChatSummary, MessageRecord, MessagesPage, Seed, UserRecord,
};

/// Capacity of the event channel feeding subscriptions
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Chats and messages. Always accessed through the state lock so that
/// append-and-reorder sequences are atomic with respect to other requests.
struct ChatStore {
    /// Most recently active first
    chats: Vec<ChatRecord>,
    messages: HashMap<String, MessageRecord>,
    /// Ids are never reissued, even after the record holding them is removed
    next_message_id: u64,
    next_chat_id: u64,
}

impl ChatStore {
    fn position(&self, chat_id: &str) -> Option<usize> {
        self.chats.iter().position(|c| c.id == chat_id)
    }

    fn chat_messages(&self, chat: &ChatRecord) -> Vec<MessageRecord> {
        chat.message_ids
            .iter()
            .filter_map(|id| self.messages.get(id).cloned())
            .collect()
    }

    fn next_message_id(&mut self) -> String {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id.to_string()
    }

    fn next_chat_id(&mut self) -> String {
        let id = self.next_chat_id;
        self.next_chat_id += 1;
        id.to_string()
    }

    /// Move the chat at `index` to the front, keeping the order of the rest
    fn promote(&mut self, index: usize) {
        let chat = self.chats.remove(index);
        self.chats.insert(0, chat);
    }
}

/// First numeric identifier above every numeric id in `ids`
fn first_free_id<'a>(ids: impl Iterator<Item = &'a String>) -> u64 {
    ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0) + 1
}

/// Server state: the chat store, the user directory and the event fan-out
pub struct ServerState {
    store: Mutex<ChatStore>,
    /// user_id -> user
    pub users: DashMap<String, UserRecord>,
    events: broadcast::Sender<ChatEvent>,
}

impl ServerState {
    /// State populated with the demo chats and users
    pub fn new() -> Self {
        Self::from_seed(seed())
    }

    /// State with no chats, messages or users
    pub fn empty() -> Self {
        Self::from_seed(Seed {
            chats: Vec::new(),
            messages: Vec::new(),
            users: Vec::new(),
        })
    }

    pub fn from_seed(seed: Seed) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let users = DashMap::new();
        for user in seed.users {
            users.insert(user.id.clone(), user);
        }

        Self {
            store: Mutex::new(ChatStore {
                next_message_id: first_free_id(seed.messages.iter().map(|m| &m.id)),
                next_chat_id: first_free_id(seed.chats.iter().map(|c| &c.id)),
                chats: seed.chats,
                messages: seed
                    .messages
                    .into_iter()
                    .map(|m| (m.id.clone(), m))
                    .collect(),
            }),
            users,
            events,
        }
    }

    fn store(&self) -> MutexGuard<'_, ChatStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ChatEvent) {
        // No receivers simply means nobody is subscribed right now
        let receivers = self.events.send(event).unwrap_or(0);
        debug!(receivers, "Published chat event");
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    /// All chats, most recently active first
    pub fn chats(&self) -> Vec<ChatRecord> {
        self.store().chats.clone()
    }

    pub fn chat(&self, chat_id: &str) -> Option<ChatRecord> {
        let store = self.store();
        store.position(chat_id).map(|i| store.chats[i].clone())
    }

    /// Chats with their last message inlined
    pub fn chat_summaries(&self) -> Vec<ChatSummary> {
        let store = self.store();
        store
            .chats
            .iter()
            .map(|chat| ChatSummary {
                last_message: chat
                    .message_ids
                    .last()
                    .and_then(|id| store.messages.get(id).cloned()),
                chat: chat.clone(),
            })
            .collect()
    }

    pub fn last_message(&self, chat_id: &str) -> Option<MessageRecord> {
        let store = self.store();
        let chat = &store.chats[store.position(chat_id)?];
        let id = chat.message_ids.last()?;
        store.messages.get(id).cloned()
    }

    pub fn message(&self, message_id: &str) -> Option<MessageRecord> {
        self.store().messages.get(message_id).cloned()
    }

    /// Page backwards through a chat's history.
    ///
    /// Returns the newest `limit` messages created strictly before `before`
    /// (epoch millis), oldest first. The page grows past `limit` when more
    /// messages share its oldest millisecond. A `before` of `None` or `0` starts from
    /// the newest message. `None` if the chat does not exist.
    pub fn messages(
        &self,
        chat_id: &str,
        limit: usize,
        before: Option<i64>,
    ) -> Option<MessagesPage> {
        let store = self.store();
        let chat = &store.chats[store.position(chat_id)?];

        let mut messages: Vec<MessageRecord> = store
            .chat_messages(chat)
            .into_iter()
            .filter(|m| match before {
                Some(before) if before > 0 => m.created_at.timestamp_millis() < before,
                _ => true,
            })
            .collect();
        messages.sort_by_key(|m| m.created_at);

        // Messages sharing the oldest millisecond stay on one page; the next
        // page only asks for strictly older ones
        let mut start = messages.len().saturating_sub(limit);
        if let Some(oldest) = messages.get(start).map(|m| m.created_at.timestamp_millis()) {
            while start > 0 && messages[start - 1].created_at.timestamp_millis() == oldest {
                start -= 1;
            }
        }

        let has_more = start > 0;
        let page = messages.split_off(start);
        let cursor = page.first().map(|m| m.created_at.timestamp_millis());

        Some(MessagesPage {
            messages: page,
            has_more,
            cursor,
        })
    }

    /// Append a message to a chat and move the chat to the front.
    ///
    /// Returns `None` if the chat does not exist.
    pub fn add_message(&self, chat_id: &str, content: &str) -> Option<MessageRecord> {
        let message = {
            let mut store = self.store();
            let index = store.position(chat_id)?;

            let message = MessageRecord {
                id: store.next_message_id(),
                chat_id: chat_id.to_string(),
                content: content.to_string(),
                created_at: Utc::now(),
            };

            store.messages.insert(message.id.clone(), message.clone());
            store.chats[index].message_ids.push(message.id.clone());
            store.promote(index);
            // Published under the lock so subscribers see store order
            self.publish(ChatEvent::MessageAdded(message.clone()));
            message
        };

        info!(chat_id, message_id = %message.id, "Message added");
        Some(message)
    }

    /// Open a chat with a user.
    ///
    /// Returns the existing chat if one was already opened with the
    /// recipient, `None` if the recipient is unknown.
    pub fn add_chat(&self, recipient_id: &str) -> Option<ChatRecord> {
        let recipient = self.users.get(recipient_id)?.value().clone();

        let chat = {
            let mut store = self.store();
            if let Some(existing) = store
                .chats
                .iter()
                .find(|c| c.recipient_id.as_deref() == Some(recipient_id))
            {
                debug!(chat_id = %existing.id, recipient_id, "Chat already exists");
                return Some(existing.clone());
            }

            let chat = ChatRecord {
                id: store.next_chat_id(),
                name: recipient.name,
                picture: recipient.picture,
                recipient_id: Some(recipient.id),
                message_ids: Vec::new(),
            };
            store.chats.insert(0, chat.clone());
            self.publish(ChatEvent::ChatAdded(chat.clone()));
            chat
        };

        info!(chat_id = %chat.id, recipient_id, "Chat added");
        Some(chat)
    }

    /// Remove a chat and all of its messages.
    ///
    /// Returns the removed chat's id, `None` if it did not exist.
    pub fn remove_chat(&self, chat_id: &str) -> Option<String> {
        {
            let mut store = self.store();
            let index = store.position(chat_id)?;
            let chat = store.chats.remove(index);
            for id in &chat.message_ids {
                store.messages.remove(id);
            }
            self.publish(ChatEvent::ChatRemoved(chat_id.to_string()));
        }

        info!(chat_id, "Chat removed");
        Some(chat_id.to_string())
    }

    /// The user directory, ordered by id
    pub fn users(&self) -> Vec<UserRecord> {
        let mut users: Vec<UserRecord> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub fn user(&self, user_id: &str) -> Option<UserRecord> {
        self.users.get(user_id).map(|u| u.value().clone())
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
