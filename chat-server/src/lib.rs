//! Chat server library
//!
//! In-memory chat store with a GraphQL API. Exposed as a library so the
//! router can be embedded in integration tests.

mod connection;
mod events;
pub mod graphql;
pub mod models;
mod routes;
mod state;

pub use events::ChatEvent;
pub use graphql::{build_schema, ChatSchema};
pub use routes::{router, AppState};
pub use state::ServerState;
