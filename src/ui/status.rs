use chrono::{DateTime, Utc};

use crate::common::NetworkEvent;

const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: StatusKind,
    pub message: String,
}

/// Connection state as seen from the window, plus a short history of it.
#[derive(Debug, Default)]
pub struct ConnectionLog {
    online: bool,
    since: Option<DateTime<Utc>>,
    entries: Vec<StatusEntry>,
}

impl ConnectionLog {
    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    /// Records status changes; chat traffic is not logged here.
    pub fn record(&mut self, event: &NetworkEvent, now: DateTime<Utc>) -> bool {
        let (kind, message) = match event {
            NetworkEvent::Connected(sid) => (StatusKind::Connected, format!("Connected as {sid}")),
            NetworkEvent::Disconnected(reason) => {
                (StatusKind::Disconnected, format!("Disconnected: {reason}"))
            }
            NetworkEvent::MessageReceived(_) => return false,
        };

        self.online = kind == StatusKind::Connected;
        self.since = Some(now);
        self.entries.push(StatusEntry {
            timestamp: now,
            kind,
            message,
        });
        if self.entries.len() > MAX_ENTRIES {
            self.entries.remove(0);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ChatMessage;

    #[test]
    fn tracks_online_state_and_ignores_chat_traffic() {
        let mut log = ConnectionLog::default();
        assert!(!log.is_online());

        assert!(log.record(&NetworkEvent::Connected("sock-1".into()), Utc::now()));
        assert!(log.is_online());

        let message = ChatMessage {
            id: None,
            content: "hi".into(),
            sender_name: "Bob".into(),
            sender_id: None,
            room_id: "co-42".into(),
            timestamp: "T0".into(),
            reply_to: None,
        };
        assert!(!log.record(&NetworkEvent::MessageReceived(message), Utc::now()));

        log.record(&NetworkEvent::Disconnected("stream ended".into()), Utc::now());
        assert!(!log.is_online());
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[1].message, "Disconnected: stream ended");
    }

    #[test]
    fn keeps_only_recent_entries() {
        let mut log = ConnectionLog::default();
        for n in 0..(MAX_ENTRIES + 5) {
            log.record(&NetworkEvent::Connected(n.to_string()), Utc::now());
        }
        assert_eq!(log.entries().len(), MAX_ENTRIES);
        assert_eq!(log.entries()[0].message, "Connected as 5");
    }
}
