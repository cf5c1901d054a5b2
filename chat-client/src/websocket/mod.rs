//! Subscription transport over `graphql-transport-ws`

mod client;
mod messages;

pub use client::SubscriptionClient;
pub use messages::{ExecutionResult, ProtocolMessage, SubscribePayload};
