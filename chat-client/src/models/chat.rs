use garde::Validate;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::message::Message;
use super::user::User;
use super::{MAX_ID_LENGTH, MAX_NAME_LENGTH};

/// Chat as listed in the chat list: identity plus its latest message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
   #[garde(length(min = 1, max = MAX_ID_LENGTH))]
   pub id: String,
   #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH))]
   pub name: String,
   #[garde(skip)]
   pub picture: Option<Url>,
   #[serde(default)]
   #[garde(dive)]
   pub last_message: Option<Message>,
}

impl ChatSummary {
   /// Locally synthesized chat shown until the server answers `addChat`
   pub fn optimistic(recipient: &User) -> Self {
      Self {
         id: format!("optimistic-{}", Uuid::new_v4()),
         name: recipient.name.clone(),
         picture: recipient.picture.clone(),
         last_message: None,
      }
   }
}

/// One page of a chat's history, oldest first
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
   #[garde(skip)]
   pub has_more: bool,
   #[garde(skip)]
   pub cursor: Option<f64>,
   #[garde(dive)]
   pub messages: Vec<Message>,
}

/// Chat as shown in the chat room: summary fields plus message history
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FullChat {
   #[garde(length(min = 1, max = MAX_ID_LENGTH))]
   pub id: String,
   #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH))]
   pub name: String,
   #[garde(skip)]
   pub picture: Option<Url>,
   #[serde(default)]
   #[garde(dive)]
   pub last_message: Option<Message>,
   #[serde(default)]
   #[garde(dive)]
   pub messages: MessagePage,
}

impl FullChat {
   pub fn summary(&self) -> ChatSummary {
      ChatSummary {
         id: self.id.clone(),
         name: self.name.clone(),
         picture: self.picture.clone(),
         last_message: self.last_message.clone(),
      }
   }

   pub fn contains_message(&self, message_id: &str) -> bool {
      self.messages.messages.iter().any(|m| m.id == message_id)
   }
}
