use super::types::ChatMessage;

/// Events fanned out from the shared connection to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    MessageReceived(ChatMessage),
    /// The server acknowledged the namespace connect; carries the socket id.
    Connected(String),
    Disconnected(String),
}
