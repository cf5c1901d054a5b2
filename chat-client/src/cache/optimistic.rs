//! Optimistic writes
//!
//! A mutation shows its result in the cache before the server has answered,
//! using a locally generated id. Once the answer arrives the optimistic entity
//! is taken out again and the server's entity goes in through the regular
//! routines. Taking it out touches nothing but what the optimistic write
//! added, so pushes applied in the meantime survive.

use tracing::debug;

use super::sync::{write_chat, write_message, SyncOutcome};
use super::{CacheKey, CacheStore, Projection};
use crate::models::{ChatSummary, Message};

#[derive(Debug)]
enum Pending {
    /// The write did not change the cache
    Nothing,
    Message {
        chat_id: String,
        message_id: String,
        /// Detail projection's last message before the write
        detail_last: Option<Message>,
        /// Chat list entry's last message before the write
        listed_last: Option<Message>,
        /// Chats listed after this one before it was promoted
        followers: Vec<String>,
    },
    Chat {
        chat_id: String,
    },
}

/// An optimistic cache write that can be undone.
#[derive(Debug)]
#[must_use = "an optimistic write should be rolled back once the server answers"]
pub struct OptimisticWrite {
    pending: Pending,
}

impl OptimisticWrite {
    /// Optimistically insert a message that has not been acknowledged yet
    pub fn message<S: CacheStore + ?Sized>(store: &mut S, message: &Message) -> (Self, SyncOutcome) {
        let Some(chat_id) = message.chat_id().map(str::to_string) else {
            return (Self { pending: Pending::Nothing }, write_message(store, message));
        };

        let detail_last = store.full_chat(&chat_id).and_then(|c| c.last_message);
        let (listed_last, followers) = match store.chat_list() {
            Some(chats) => match chats.iter().position(|c| c.id == chat_id) {
                Some(index) => (
                    chats[index].last_message.clone(),
                    chats[index + 1..].iter().map(|c| c.id.clone()).collect(),
                ),
                None => (None, Vec::new()),
            },
            None => (None, Vec::new()),
        };

        let outcome = write_message(store, message);
        let pending = if outcome.is_applied() {
            Pending::Message {
                chat_id,
                message_id: message.id.clone(),
                detail_last,
                listed_last,
                followers,
            }
        } else {
            Pending::Nothing
        };
        (Self { pending }, outcome)
    }

    /// Optimistically insert a chat that has not been acknowledged yet
    pub fn chat<S: CacheStore + ?Sized>(store: &mut S, chat: &ChatSummary) -> (Self, SyncOutcome) {
        let outcome = write_chat(store, chat);
        let pending = if outcome.is_applied() {
            Pending::Chat {
                chat_id: chat.id.clone(),
            }
        } else {
            Pending::Nothing
        };
        (Self { pending }, outcome)
    }

    /// Take the optimistic entity back out of the cache.
    ///
    /// A chat promoted only by the optimistic message returns to where it
    /// would be without it: behind every chat promoted or added since, in
    /// its old place among the rest.
    pub fn rollback<S: CacheStore + ?Sized>(self, store: &mut S) {
        match self.pending {
            Pending::Nothing => {}
            Pending::Message {
                chat_id,
                message_id,
                detail_last,
                listed_last,
                followers,
            } => {
                debug!(chat_id = %chat_id, message_id = %message_id, "Rolling back optimistic message");

                if let Some(mut chat) = store.full_chat(&chat_id) {
                    let count = chat.messages.messages.len();
                    chat.messages.messages.retain(|m| m.id != message_id);
                    let mut changed = chat.messages.messages.len() != count;

                    if chat.last_message.as_ref().is_some_and(|m| m.id == message_id) {
                        chat.last_message = detail_last;
                        changed = true;
                    }
                    if changed {
                        store.put(CacheKey::chat(chat_id.as_str()), Projection::Chat(chat));
                    }
                }

                let Some(mut chats) = store.chat_list() else {
                    return;
                };
                // Promoted by something real in the meantime: leave it be
                let Some(index) = chats.iter().position(|c| {
                    c.id == chat_id && c.last_message.as_ref().is_some_and(|m| m.id == message_id)
                }) else {
                    return;
                };

                let mut chat = chats.remove(index);
                chat.last_message = listed_last;
                let offset = chats[index..]
                    .iter()
                    .position(|c| followers.contains(&c.id))
                    .unwrap_or(chats.len() - index);
                chats.insert(index + offset, chat);
                store.put(CacheKey::ChatList, Projection::ChatList(chats));
            }
            Pending::Chat { chat_id } => {
                debug!(chat_id = %chat_id, "Rolling back optimistic chat");
                if let Some(mut chats) = store.chat_list() {
                    let count = chats.len();
                    chats.retain(|c| c.id != chat_id);
                    if chats.len() != count {
                        store.put(CacheKey::ChatList, Projection::ChatList(chats));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{erase_chat, write_chat_query, write_chats_query, InMemoryCache};
    use crate::models::{ChatRef, FullChat, MessagePage, User};
    use chrono::{TimeZone, Utc};

    fn summary(id: &str) -> ChatSummary {
        ChatSummary {
            id: id.to_string(),
            name: format!("Chat {}", id),
            picture: None,
            last_message: None,
        }
    }

    fn detail(id: &str) -> FullChat {
        FullChat {
            id: id.to_string(),
            name: format!("Chat {}", id),
            picture: None,
            last_message: None,
            messages: MessagePage::default(),
        }
    }

    fn message(id: &str, chat_id: &str) -> Message {
        Message {
            id: id.to_string(),
            content: format!("message {}", id),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            chat: Some(ChatRef {
                id: chat_id.to_string(),
            }),
        }
    }

    /// List and detail of every chat in `ids`, in that order
    fn cache(ids: &[&str]) -> InMemoryCache {
        let mut cache = InMemoryCache::new();
        write_chats_query(&mut cache, ids.iter().map(|id| summary(id)).collect());
        for id in ids {
            write_chat_query(&mut cache, id, Some(detail(id)));
        }
        cache
    }

    fn order(cache: &InMemoryCache) -> Vec<String> {
        cache.chat_list().unwrap().into_iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_optimistic_message_then_rollback() {
        let mut cache = cache(&["1", "2"]);
        let before = cache.clone();

        let optimistic = Message::optimistic("2", "on my way");
        let (pending, outcome) = OptimisticWrite::message(&mut cache, &optimistic);
        assert_eq!(outcome, SyncOutcome::Applied);
        assert_eq!(order(&cache), vec!["2", "1"]);
        assert!(cache.full_chat("2").unwrap().contains_message(&optimistic.id));

        pending.rollback(&mut cache);
        assert_eq!(cache, before);
    }

    #[test]
    fn test_rollback_then_authoritative_write() {
        let mut cache = cache(&["1", "2"]);

        let optimistic = Message::optimistic("2", "hi");
        let (pending, _) = OptimisticWrite::message(&mut cache, &optimistic);

        let mut confirmed = optimistic.clone();
        confirmed.id = "42".to_string();

        pending.rollback(&mut cache);
        assert!(write_message(&mut cache, &confirmed).is_applied());

        let chat = cache.full_chat("2").unwrap();
        assert_eq!(chat.messages.messages.len(), 1);
        assert_eq!(chat.messages.messages[0].id, "42");
        assert!(!chat.contains_message(&optimistic.id));
    }

    #[test]
    fn test_push_to_another_chat_survives_rollback() {
        let mut cache = cache(&["A", "B", "C"]);

        let optimistic = Message::optimistic("B", "hello");
        let (pending, _) = OptimisticWrite::message(&mut cache, &optimistic);
        assert_eq!(order(&cache), vec!["B", "A", "C"]);

        let pushed = message("7", "C");
        assert!(write_message(&mut cache, &pushed).is_applied());
        assert_eq!(order(&cache), vec!["C", "B", "A"]);

        pending.rollback(&mut cache);
        assert_eq!(order(&cache), vec!["C", "A", "B"]);
        assert_eq!(cache.chat_list().unwrap()[0].last_message, Some(pushed.clone()));
        assert_eq!(cache.full_chat("C").unwrap().last_message, Some(pushed.clone()));
        assert!(!cache.full_chat("B").unwrap().contains_message(&optimistic.id));
        assert_eq!(cache.full_chat("B").unwrap().last_message, None);

        write_message(&mut cache, &message("8", "B"));
        assert_eq!(order(&cache), vec!["B", "C", "A"]);
        assert_eq!(cache.chat_list().unwrap()[1].last_message, Some(pushed));
    }

    #[test]
    fn test_push_to_same_chat_survives_rollback() {
        let mut cache = cache(&["A", "B", "C"]);

        let optimistic = Message::optimistic("C", "mine");
        let (pending, _) = OptimisticWrite::message(&mut cache, &optimistic);

        let theirs = message("9", "C");
        write_message(&mut cache, &theirs);

        pending.rollback(&mut cache);
        assert_eq!(order(&cache), vec!["C", "A", "B"]);
        let chat = cache.full_chat("C").unwrap();
        assert_eq!(chat.messages.messages, vec![theirs.clone()]);
        assert_eq!(chat.last_message, Some(theirs.clone()));
        assert_eq!(cache.chat_list().unwrap()[0].last_message, Some(theirs));
    }

    #[test]
    fn test_rollback_after_new_chat_and_removal() {
        let mut cache = cache(&["A", "B", "C", "D"]);

        let (pending, _) = OptimisticWrite::message(&mut cache, &Message::optimistic("B", "x"));
        write_chat(&mut cache, &summary("E"));
        erase_chat(&mut cache, "C");
        assert_eq!(order(&cache), vec!["E", "B", "A", "D"]);

        pending.rollback(&mut cache);
        assert_eq!(order(&cache), vec!["E", "A", "B", "D"]);
    }

    #[test]
    fn test_skipped_write_has_nothing_to_roll_back() {
        let mut cache = cache(&["A"]);
        let before = cache.clone();

        let (pending, outcome) = OptimisticWrite::message(&mut cache, &Message::optimistic("Z", "?"));
        assert_eq!(outcome, SyncOutcome::MissingTarget);
        pending.rollback(&mut cache);
        assert_eq!(cache, before);
    }

    #[test]
    fn test_optimistic_chat() {
        let mut cache = cache(&["1", "2"]);
        let user = User {
            id: "5".to_string(),
            name: "Ray Edwards".to_string(),
            picture: None,
        };
        let optimistic = ChatSummary::optimistic(&user);

        let (pending, outcome) = OptimisticWrite::chat(&mut cache, &optimistic);
        assert!(outcome.is_applied());
        assert_eq!(cache.chat_list().unwrap()[0].name, "Ray Edwards");

        write_chat(&mut cache, &summary("3"));
        pending.rollback(&mut cache);
        assert_eq!(order(&cache), vec!["3", "1", "2"]);
    }
}
