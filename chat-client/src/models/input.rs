//! Input DTOs with garde validation.
//!
//! Mutation arguments are checked before they are sent, and entities
//! arriving from the transport are checked before they reach the cache.

use garde::Validate;
use serde::Serialize;

use super::{MAX_ID_LENGTH, MAX_MESSAGE_LENGTH};
use crate::error::{ClientError, Result};

/// Message content must contain something besides whitespace
fn validate_not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("Message cannot be blank"));
    }
    Ok(())
}

/// Input for sending a message
#[derive(Debug, Serialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct SendMessageInput {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub chat_id: String,
    #[garde(length(chars, min = 1, max = MAX_MESSAGE_LENGTH), custom(validate_not_blank))]
    pub content: String,
}

/// Input for opening a chat
#[derive(Debug, Serialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct CreateChatInput {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub recipient_id: String,
}

/// Input for removing a chat
#[derive(Debug, Serialize, Validate)]
#[garde(context(()))]
#[serde(rename_all = "camelCase")]
pub struct RemoveChatInput {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub chat_id: String,
}

/// Helper trait to convert garde validation errors to client errors
pub trait ValidateExt {
    fn validate_input(&self) -> Result<()>;
}

impl<T: Validate<Context = ()>> ValidateExt for T {
    fn validate_input(&self) -> Result<()> {
        self.validate()
            .map_err(|e| ClientError::Validation(e.to_string()))
    }
}
