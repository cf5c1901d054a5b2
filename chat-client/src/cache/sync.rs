//! Cache synchronization routines
//!
//! Patch the local cache after a mutation result or a subscription push so
//! that rendered views stay consistent without a refetch. Every routine is
//! best-effort: when it cannot apply, it leaves the cache untouched and says
//! why through [`SyncOutcome`]. The authoritative state arrives with the
//! next full query.

use tracing::debug;

use super::{CacheKey, CacheStore, Projection};
use crate::models::{ChatSummary, FullChat, Message};

/// What a synchronization routine did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cache was updated
    Applied,
    /// An entity with the same id was already cached
    Duplicate,
    /// The entry to update is not cached
    MissingTarget,
    /// The entity lacks a reference it needs (a message without a chat)
    Malformed,
}

impl SyncOutcome {
    pub fn is_applied(self) -> bool {
        self == SyncOutcome::Applied
    }
}

/// Move `chat_id` to the front of the cached chat list, keeping the relative
/// order of every other chat, and refresh its last message.
///
/// Returns `false` if the list or the chat within it is not cached.
fn promote<S: CacheStore + ?Sized>(store: &mut S, chat_id: &str, last_message: &Message) -> bool {
    let Some(mut chats) = store.chat_list() else {
        return false;
    };
    let Some(index) = chats.iter().position(|c| c.id == chat_id) else {
        return false;
    };

    let mut chat = chats.remove(index);
    chat.last_message = Some(last_message.clone());
    chats.insert(0, chat);
    store.put(CacheKey::ChatList, Projection::ChatList(chats));
    true
}

/// Insert a new message into its chat's cached history, exactly once.
///
/// On success the message is appended, becomes the chat's last message, and
/// the chat is promoted to the front of the cached chat list (if that list
/// is cached and contains it).
pub fn write_message<S: CacheStore + ?Sized>(store: &mut S, message: &Message) -> SyncOutcome {
    let Some(chat_id) = message.chat_id() else {
        debug!(message_id = %message.id, "Message without chat, ignoring");
        return SyncOutcome::Malformed;
    };

    let Some(mut chat) = store.full_chat(chat_id) else {
        debug!(chat_id, "Chat not cached, skipping message");
        return SyncOutcome::MissingTarget;
    };

    if chat.contains_message(&message.id) {
        debug!(chat_id, message_id = %message.id, "Message already cached");
        return SyncOutcome::Duplicate;
    }

    chat.messages.messages.push(message.clone());
    chat.last_message = Some(message.clone());
    store.put(CacheKey::chat(chat_id), Projection::Chat(chat));

    if !promote(store, chat_id, message) {
        debug!(chat_id, "Chat list not cached or missing chat, order unchanged");
    }

    SyncOutcome::Applied
}

/// Add a newly created chat to the front of the cached chat list
pub fn write_chat<S: CacheStore + ?Sized>(store: &mut S, chat: &ChatSummary) -> SyncOutcome {
    let Some(mut chats) = store.chat_list() else {
        debug!(chat_id = %chat.id, "Chat list not cached, skipping chat");
        return SyncOutcome::MissingTarget;
    };

    if chats.iter().any(|c| c.id == chat.id) {
        debug!(chat_id = %chat.id, "Chat already cached");
        return SyncOutcome::Duplicate;
    }

    chats.insert(0, chat.clone());
    store.put(CacheKey::ChatList, Projection::ChatList(chats));
    SyncOutcome::Applied
}

/// Remove every trace of a chat: its detail projection and its chat list
/// entry. Each step is independent.
pub fn erase_chat<S: CacheStore + ?Sized>(store: &mut S, chat_id: &str) -> SyncOutcome {
    let evicted = store.evict(&CacheKey::chat(chat_id)).is_some();

    let mut unlisted = false;
    if let Some(mut chats) = store.chat_list() {
        if let Some(index) = chats.iter().position(|c| c.id == chat_id) {
            chats.remove(index);
            store.put(CacheKey::ChatList, Projection::ChatList(chats));
            unlisted = true;
        }
    }

    if evicted || unlisted {
        SyncOutcome::Applied
    } else {
        debug!(chat_id, "Chat not cached, nothing to erase");
        SyncOutcome::MissingTarget
    }
}

/// Store the result of a `chats` query, replacing the cached list
pub fn write_chats_query<S: CacheStore + ?Sized>(store: &mut S, chats: Vec<ChatSummary>) {
    store.put(CacheKey::ChatList, Projection::ChatList(chats));
}

/// Store the result of a `chat(chatId)` query. A null result means the chat
/// no longer exists, so its projection is dropped.
pub fn write_chat_query<S: CacheStore + ?Sized>(
    store: &mut S,
    chat_id: &str,
    chat: Option<FullChat>,
) {
    match chat {
        Some(chat) => store.put(CacheKey::chat(chat_id), Projection::Chat(chat)),
        None => {
            store.evict(&CacheKey::chat(chat_id));
        }
    }
}
