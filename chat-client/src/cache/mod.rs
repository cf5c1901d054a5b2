//! Local cache store
//!
//! A normalized, in-memory store of projections keyed by entity kind and id.
//! Views read projections out of it; query results and the synchronization
//! routines in [`sync`] are the only writers.

mod optimistic;
pub mod sync;

use std::collections::HashMap;
use std::fmt;

use crate::models::{ChatSummary, FullChat};

pub use optimistic::OptimisticWrite;
pub use sync::{
    erase_chat, write_chat, write_chat_query, write_chats_query, write_message, SyncOutcome,
};

/// Identity of a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// All chats of the current user, most recently active first
    ChatList,
    /// Detail projection of one chat
    Chat(String),
}

impl CacheKey {
    pub fn chat(chat_id: impl Into<String>) -> Self {
        CacheKey::Chat(chat_id.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::ChatList => write!(f, "ROOT_QUERY.chats"),
            CacheKey::Chat(id) => write!(f, "Chat:{}", id),
        }
    }
}

/// A cached, denormalized view of one entity or one list of entities
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    ChatList(Vec<ChatSummary>),
    Chat(FullChat),
}

/// Key-value interface the synchronization routines work against
pub trait CacheStore {
    /// `None` means "not cached"
    fn get(&self, key: &CacheKey) -> Option<Projection>;

    /// Create or replace an entry
    fn put(&mut self, key: CacheKey, projection: Projection);

    /// Drop an entry, returning what was there
    fn evict(&mut self, key: &CacheKey) -> Option<Projection>;

    /// The cached chat list, if any
    fn chat_list(&self) -> Option<Vec<ChatSummary>> {
        match self.get(&CacheKey::ChatList)? {
            Projection::ChatList(chats) => Some(chats),
            _ => None,
        }
    }

    /// The cached detail projection of a chat, if any
    fn full_chat(&self, chat_id: &str) -> Option<FullChat> {
        match self.get(&CacheKey::chat(chat_id))? {
            Projection::Chat(chat) => Some(chat),
            _ => None,
        }
    }
}

/// Default store: a plain hash map owned by whoever created it
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InMemoryCache {
    entries: HashMap<CacheKey, Projection>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }
}

impl CacheStore for InMemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Projection> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, projection: Projection) {
        self.entries.insert(key, projection);
    }

    fn evict(&mut self, key: &CacheKey) -> Option<Projection> {
        self.entries.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessagePage;

    fn full_chat(id: &str) -> FullChat {
        FullChat {
            id: id.to_string(),
            name: format!("Chat {}", id),
            picture: None,
            last_message: None,
            messages: MessagePage::default(),
        }
    }

    #[test]
    fn test_key_display() {
        assert_eq!(CacheKey::ChatList.to_string(), "ROOT_QUERY.chats");
        assert_eq!(CacheKey::chat("7").to_string(), "Chat:7");
    }

    #[test]
    fn test_put_get_evict() {
        let mut cache = InMemoryCache::new();
        assert!(cache.is_empty());
        assert!(cache.full_chat("1").is_none());

        cache.put(CacheKey::chat("1"), Projection::Chat(full_chat("1")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.full_chat("1").map(|c| c.name), Some("Chat 1".to_string()));

        assert!(cache.evict(&CacheKey::chat("1")).is_some());
        assert!(cache.evict(&CacheKey::chat("1")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_mismatched_projection_reads_as_not_cached() {
        let mut cache = InMemoryCache::new();
        cache.put(CacheKey::ChatList, Projection::Chat(full_chat("1")));
        assert!(cache.chat_list().is_none());

        cache.put(CacheKey::chat("1"), Projection::ChatList(Vec::new()));
        assert!(cache.full_chat("1").is_none());
    }
}
