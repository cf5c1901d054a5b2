//! GraphQL API
//!
//! ```graphql
//! query {
//!   chats {
//!     id
//!     name
//!     picture
//!     lastMessage { id content createdAt }
//!   }
//! }
//!
//! query GetChat($chatId: ID!) {
//!   chat(chatId: $chatId) {
//!     id
//!     name
//!     messages(limit: 100) { hasMore cursor messages { id content createdAt } }
//!   }
//! }
//!
//! mutation {
//!   addMessage(chatId: "1", content: "On my way") { id createdAt chat { id } }
//! }
//!
//! subscription {
//!   messageAdded { id content createdAt chat { id } }
//! }
//! ```

pub mod mutation;
pub mod query;
pub mod subscription;
pub mod types;

use std::sync::Arc;

use async_graphql::Schema;

use crate::state::ServerState;

use self::mutation::MutationRoot;
use self::query::QueryRoot;
use self::subscription::SubscriptionRoot;

pub type ChatSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the schema around the shared server state
pub fn build_schema(state: Arc<ServerState>) -> ChatSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(state)
        .finish()
}
