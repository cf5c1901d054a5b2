use crate::models::{ChatRecord, MessageRecord};

/// Change notifications fanned out to subscription streams
#[derive(Debug, Clone)]
pub enum ChatEvent {
    MessageAdded(MessageRecord),
    ChatAdded(ChatRecord),
    /// Id of the removed chat
    ChatRemoved(String),
}
