use serde_json::Value;

use super::types::ChatMessage;

pub const JOIN_ROOM_EVENT: &str = "joinCompanyRoom";
pub const CHAT_MESSAGE_EVENT: &str = "chatMessage";

/// Outbound requests from a chat view to the shared connection.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkCommand {
    /// Join the tenant-scoped broadcast room.
    JoinRoom(String),
    /// Push a message into its room; the server echoes it to every member.
    SendMessage(ChatMessage),
}

impl NetworkCommand {
    pub fn event_name(&self) -> &'static str {
        match self {
            NetworkCommand::JoinRoom(_) => JOIN_ROOM_EVENT,
            NetworkCommand::SendMessage(_) => CHAT_MESSAGE_EVENT,
        }
    }

    pub fn payload(&self) -> serde_json::Result<Value> {
        match self {
            NetworkCommand::JoinRoom(room_id) => Ok(Value::String(room_id.clone())),
            NetworkCommand::SendMessage(message) => serde_json::to_value(message),
        }
    }
}
