//! Chat client with a self-synchronizing local cache
//!
//! [`ChatClient`] runs queries and mutations and writes their results into
//! a shared [`CacheStore`]. [`SubscriptionClient`] keeps that same store
//! current as the server pushes new messages, new chats and removals.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod graphql;
pub mod models;
pub mod websocket;

pub use cache::{CacheKey, CacheStore, InMemoryCache, OptimisticWrite, Projection, SyncOutcome};
pub use client::{ChatClient, SharedCache};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use events::{AppliedEvent, CacheEvent};
pub use models::{ChatRef, ChatSummary, FullChat, Message, MessagePage, User};
pub use websocket::SubscriptionClient;
