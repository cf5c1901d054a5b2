mod chat;
pub mod input;
mod message;
mod user;

pub use chat::{ChatSummary, FullChat, MessagePage};
pub use message::{ChatRef, Message};
pub use user::User;

/// Validation limits shared by wire payloads and user input
pub const MAX_ID_LENGTH: usize = 256;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_MESSAGE_LENGTH: usize = 10000;
