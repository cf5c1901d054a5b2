use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use url::Url;

/// A chat as held by the server store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub id: String,
    pub name: String,
    pub picture: Option<Url>,
    /// User the chat was opened with, if any
    #[serde(skip)]
    pub recipient_id: Option<String>,
    /// Message ids in creation order
    #[serde(skip)]
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub chat_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub picture: Option<Url>,
}

/// One page of a chat's message history, oldest first
#[derive(Debug, Clone)]
pub struct MessagesPage {
    pub messages: Vec<MessageRecord>,
    pub has_more: bool,
    /// Creation time (epoch millis) of the oldest message in the page
    pub cursor: Option<i64>,
}

/// Chat as returned by the REST `GET /chats` endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    #[serde(flatten)]
    pub chat: ChatRecord,
    pub last_message: Option<MessageRecord>,
}

/// Initial contents of a freshly started server
pub struct Seed {
    pub chats: Vec<ChatRecord>,
    pub messages: Vec<MessageRecord>,
    pub users: Vec<UserRecord>,
}

fn portrait(path: &str) -> Option<Url> {
    Url::parse(&format!("https://randomuser.me/api/portraits/thumb/{path}.jpg")).ok()
}

pub fn seed() -> Seed {
    // 2019-01-01T00:00:00Z
    let base = DateTime::from_timestamp(1_546_300_800, 0).unwrap_or_default();
    let minutes = |n: i64| base - Duration::minutes(n);

    let people = [
        ("1", "Ethan Gonzalez", "men/1", "You on your way?", minutes(1_000)),
        ("2", "Bryan Wallace", "men/2", "Hey, it's me", minutes(2_000)),
        ("3", "Avery Stewart", "women/1", "I should buy a boat", minutes(24_000)),
        (
            "4",
            "Katie Peterson",
            "women/2",
            "This is wicked good ice cream.",
            minutes(14 * 24_000),
        ),
    ];

    let mut chats = Vec::new();
    let mut messages = Vec::new();
    let mut users = Vec::new();

    for (id, name, picture, content, created_at) in people {
        users.push(UserRecord {
            id: id.to_string(),
            name: name.to_string(),
            picture: portrait(picture),
        });
        messages.push(MessageRecord {
            id: id.to_string(),
            chat_id: id.to_string(),
            content: content.to_string(),
            created_at,
        });
        chats.push(ChatRecord {
            id: id.to_string(),
            name: name.to_string(),
            picture: portrait(picture),
            recipient_id: Some(id.to_string()),
            message_ids: vec![id.to_string()],
        });
    }

    // Someone to start a new chat with
    users.push(UserRecord {
        id: "5".to_string(),
        name: "Ray Edwards".to_string(),
        picture: portrait("men/3"),
    });

    Seed {
        chats,
        messages,
        users,
    }
}
