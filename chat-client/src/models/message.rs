use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MAX_ID_LENGTH, MAX_MESSAGE_LENGTH};

/// Reference to the chat a message belongs to
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct ChatRef {
   #[garde(length(min = 1, max = MAX_ID_LENGTH))]
   pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Message {
   #[garde(length(min = 1, max = MAX_ID_LENGTH))]
   pub id: String,
   #[garde(length(chars, max = MAX_MESSAGE_LENGTH))]
   pub content: String,
   #[garde(skip)]
   pub created_at: DateTime<Utc>,
   /// Missing when the server could not resolve the owning chat
   #[serde(default)]
   #[garde(dive)]
   pub chat: Option<ChatRef>,
}

impl Message {
   /// Locally synthesized message shown until the server answers `addMessage`
   pub fn optimistic(chat_id: &str, content: &str) -> Self {
      Self {
         id: format!("optimistic-{}", Uuid::new_v4()),
         content: content.to_string(),
         created_at: Utc::now(),
         chat: Some(ChatRef {
            id: chat_id.to_string(),
         }),
      }
   }

   pub fn chat_id(&self) -> Option<&str> {
      self.chat.as_ref().map(|c| c.id.as_str()).filter(|id| !id.is_empty())
   }
}
