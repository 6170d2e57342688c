use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Kind of asset referenced by an attachment.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl std::str::FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(anyhow::anyhow!("Unsupported media type: {}", other)),
        }
    }
}

/// A media asset attached to a message.
///
/// Flattened into the message record as the `media` and `mediaType` fields,
/// so either both are present or neither is.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// URL or data handle of the asset.
    pub media: String,
    pub media_type: MediaType,
}

impl Attachment {
    pub fn new(media: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            media: media.into(),
            media_type,
        }
    }
}

// Represents a single message in a conversation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Creation instant, epoch milliseconds.
    pub timestamp: i64,
    // A record carrying only one of `media`/`mediaType` loads without attachment
    #[serde(flatten)]
    pub attachment: Option<Attachment>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: now_millis(),
            attachment,
        }
    }
}

// A titled thread of messages, in insertion order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Epoch milliseconds of creation or the latest append.
    pub last_updated: i64,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            messages: Vec::new(),
            last_updated: now_millis(),
        }
    }

    /// Appends a message and advances `last_updated`, never moving it backwards.
    pub fn push(&mut self, message: Message) {
        self.last_updated = self.last_updated.max(message.timestamp);
        self.messages.push(message);
    }
}

/// Generates a fresh, time-ordered identifier.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
