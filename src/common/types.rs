use serde::{Deserialize, Serialize};

/// A chat message as it travels over the wire and sits in a room's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Record id assigned by the backend, when it returns one.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub room_id: String,
    /// ISO-8601, generated by the sending client.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
}

/// Denormalized snapshot of the message being replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub sender_name: String,
    pub content: String,
}

impl ReplyRef {
    pub fn snapshot(message: &ChatMessage) -> Self {
        Self {
            sender_name: message.sender_name.clone(),
            content: message.content.clone(),
        }
    }
}

/// The local user as seen by the chat: a stable id plus a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
}

impl UserIdentity {
    /// Whether `message` was written by this user.
    ///
    /// Ids win when both sides carry one; otherwise fall back to the display
    /// name, which is all older backends echo.
    pub fn authored(&self, message: &ChatMessage) -> bool {
        match message.sender_id.as_deref() {
            Some(sender_id) => sender_id == self.id,
            None => message.sender_name == self.name,
        }
    }
}
