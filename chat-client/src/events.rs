//! Typed push events
//!
//! Subscription payloads arrive as loosely typed JSON. They are converted
//! and validated here, at the boundary, so the cache only ever sees typed
//! entities.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::{erase_chat, write_chat, write_message, CacheStore, SyncOutcome};
use crate::error::{ClientError, Result};
use crate::models::input::ValidateExt;
use crate::models::{ChatSummary, Message, MAX_ID_LENGTH};

/// Subscription field names, also used as subscription ids on the wire
pub const MESSAGE_ADDED: &str = "messageAdded";
pub const CHAT_ADDED: &str = "chatAdded";
pub const CHAT_REMOVED: &str = "chatRemoved";

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    MessageAdded(Message),
    ChatAdded(ChatSummary),
    /// Id of the removed chat
    ChatRemoved(String),
}

fn entity<T: DeserializeOwned>(value: &Value) -> Result<T> {
    Ok(serde_json::from_value(value.clone())?)
}

impl CacheEvent {
    /// Convert the `data` object of a subscription result
    pub fn from_payload(data: &Value) -> Result<Self> {
        if let Some(value) = data.get(MESSAGE_ADDED) {
            let message: Message = entity(value)?;
            message.validate_input()?;
            return Ok(CacheEvent::MessageAdded(message));
        }

        if let Some(value) = data.get(CHAT_ADDED) {
            let chat: ChatSummary = entity(value)?;
            chat.validate_input()?;
            return Ok(CacheEvent::ChatAdded(chat));
        }

        if let Some(value) = data.get(CHAT_REMOVED) {
            return match value.as_str() {
                Some(id) if !id.is_empty() && id.len() <= MAX_ID_LENGTH => {
                    Ok(CacheEvent::ChatRemoved(id.to_string()))
                }
                _ => Err(ClientError::Validation(format!(
                    "Invalid removed chat id: {}",
                    value
                ))),
            };
        }

        Err(ClientError::Validation(format!(
            "Unrecognized event payload: {}",
            data
        )))
    }

    /// Subscription this event was delivered on
    pub fn name(&self) -> &'static str {
        match self {
            CacheEvent::MessageAdded(_) => MESSAGE_ADDED,
            CacheEvent::ChatAdded(_) => CHAT_ADDED,
            CacheEvent::ChatRemoved(_) => CHAT_REMOVED,
        }
    }

    /// Run the matching synchronization routine
    pub fn apply<S: CacheStore + ?Sized>(&self, store: &mut S) -> SyncOutcome {
        match self {
            CacheEvent::MessageAdded(message) => write_message(store, message),
            CacheEvent::ChatAdded(chat) => write_chat(store, chat),
            CacheEvent::ChatRemoved(chat_id) => erase_chat(store, chat_id),
        }
    }
}

/// An event together with what applying it did to the cache
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedEvent {
    pub event: CacheEvent,
    pub outcome: SyncOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_MESSAGE_LENGTH;
    use serde_json::json;

    #[test]
    fn test_message_added_payload() {
        let data = json!({
            "messageAdded": {
                "id": "5",
                "content": "Hello",
                "createdAt": "2019-01-01T00:00:00+00:00",
                "chat": { "id": "2" }
            }
        });

        match CacheEvent::from_payload(&data).unwrap() {
            CacheEvent::MessageAdded(message) => {
                assert_eq!(message.id, "5");
                assert_eq!(message.chat_id(), Some("2"));
            }
            other => panic!("Expected MessageAdded, got {:?}", other),
        }
    }

    #[test]
    fn test_message_without_chat_still_converts() {
        let data = json!({
            "messageAdded": {
                "id": "5",
                "content": "orphan",
                "createdAt": "2019-01-01T00:00:00Z",
                "chat": null
            }
        });
        let event = CacheEvent::from_payload(&data).unwrap();
        let mut cache = crate::cache::InMemoryCache::new();
        assert_eq!(event.apply(&mut cache), SyncOutcome::Malformed);
    }

    #[test]
    fn test_message_length_counts_characters() {
        let payload = |content: String| {
            json!({
                "messageAdded": {
                    "id": "5",
                    "content": content,
                    "createdAt": "2019-01-01T00:00:00Z",
                    "chat": { "id": "1" }
                }
            })
        };

        assert!(CacheEvent::from_payload(&payload("é".repeat(MAX_MESSAGE_LENGTH))).is_ok());
        assert!(matches!(
            CacheEvent::from_payload(&payload("é".repeat(MAX_MESSAGE_LENGTH + 1))),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_chat_added_payload() {
        let data = json!({
            "chatAdded": {
                "id": "5",
                "name": "Ray Edwards",
                "picture": "https://randomuser.me/api/portraits/thumb/men/3.jpg",
                "lastMessage": null
            }
        });
        let event = CacheEvent::from_payload(&data).unwrap();
        assert_eq!(event.name(), CHAT_ADDED);
        if let CacheEvent::ChatAdded(chat) = event {
            assert_eq!(chat.name, "Ray Edwards");
            assert!(chat.picture.is_some());
        } else {
            panic!("Expected ChatAdded");
        }
    }

    #[test]
    fn test_chat_removed_payload() {
        let event = CacheEvent::from_payload(&json!({ "chatRemoved": "3" })).unwrap();
        assert_eq!(event, CacheEvent::ChatRemoved("3".to_string()));
    }

    #[test]
    fn test_rejects_invalid_payloads() {
        // Empty id fails validation
        let data = json!({
            "messageAdded": { "id": "", "content": "x", "createdAt": "2019-01-01T00:00:00Z" }
        });
        assert!(matches!(
            CacheEvent::from_payload(&data),
            Err(ClientError::Validation(_))
        ));

        // Bad picture URL fails deserialization
        let data = json!({ "chatAdded": { "id": "1", "name": "A", "picture": "not a url" } });
        assert!(matches!(
            CacheEvent::from_payload(&data),
            Err(ClientError::Serialization(_))
        ));

        assert!(CacheEvent::from_payload(&json!({ "chatRemoved": null })).is_err());
        assert!(CacheEvent::from_payload(&json!({ "somethingElse": {} })).is_err());
    }
}
