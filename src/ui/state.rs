use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::common::{ChatMessage, ReplyRef, UserIdentity};

/// Delay before scrolling to a message we just sent, so the list has been
/// laid out with it.
pub const SELF_SCROLL_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    /// No room to join.
    Inert,
    /// Joined; waiting for the history fetch to settle.
    Loading,
    Live,
}

/// Local state of one mounted room chat.
///
/// The message list is append-only for the lifetime of the mount.
pub struct ChatState {
    user: Option<UserIdentity>,
    room_id: Option<String>,
    phase: ChatPhase,
    messages: Vec<ChatMessage>,
    pub input_text: String,
    reply_target: Option<ReplyRef>,
    scroll_due: Option<Instant>,
}

impl ChatState {
    pub fn new(user: Option<UserIdentity>, room_id: Option<String>) -> Self {
        let room_id = room_id.filter(|room| !room.trim().is_empty());
        let phase = if room_id.is_some() {
            ChatPhase::Loading
        } else {
            ChatPhase::Inert
        };
        Self {
            user,
            room_id,
            phase,
            messages: Vec::new(),
            input_text: String::new(),
            reply_target: None,
            scroll_due: None,
        }
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn reply_target(&self) -> Option<&ReplyRef> {
        self.reply_target.as_ref()
    }

    /// Settles the history fetch. A failed fetch leaves the list empty.
    pub fn finish_loading(&mut self, history: Option<Vec<ChatMessage>>) {
        if self.phase != ChatPhase::Loading {
            return;
        }
        self.messages = history.unwrap_or_default();
        self.phase = ChatPhase::Live;
    }

    /// Appends `message` if it belongs to this room. Returns whether the list
    /// changed.
    pub fn apply_incoming(&mut self, message: ChatMessage, now: Instant) -> bool {
        if self.phase != ChatPhase::Live {
            return false;
        }
        if self.room_id.as_deref() != Some(message.room_id.as_str()) {
            return false;
        }
        if self.user.as_ref().is_some_and(|user| user.authored(&message)) {
            self.scroll_due = Some(now + SELF_SCROLL_DELAY);
        }
        self.messages.push(message);
        true
    }

    /// Whether the list should jump to its newest entry now. Clears the
    /// request when it fires.
    pub fn take_due_scroll(&mut self, now: Instant) -> bool {
        match self.scroll_due {
            Some(due) if now >= due => {
                self.scroll_due = None;
                true
            }
            _ => false,
        }
    }

    pub fn scroll_deadline(&self) -> Option<Instant> {
        self.scroll_due
    }

    pub fn can_send(&self) -> bool {
        !self.input_text.trim().is_empty() && self.user.is_some() && self.room_id.is_some()
    }

    /// Builds the outgoing message from the input and resets the composer.
    ///
    /// Nothing is appended locally: the message shows up when the server
    /// echoes it back to the room.
    pub fn compose(&mut self, now: DateTime<Utc>) -> Option<ChatMessage> {
        if !self.can_send() {
            return None;
        }
        let user = self.user.as_ref()?;
        let room_id = self.room_id.clone()?;

        let message = ChatMessage {
            id: None,
            content: self.input_text.trim().to_string(),
            sender_name: user.name.clone(),
            sender_id: Some(user.id.clone()),
            room_id,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            reply_to: self.reply_target.take(),
        };
        self.input_text.clear();
        Some(message)
    }

    /// Puts a draft back after the connection refused it.
    pub fn restore_draft(&mut self, input: String, reply_to: Option<ReplyRef>) {
        self.input_text = input;
        self.reply_target = reply_to;
    }

    /// Makes `message` the pending reply target, replacing any previous one.
    pub fn select_reply(&mut self, message: &ChatMessage) {
        self.reply_target = Some(ReplyRef::snapshot(message));
    }

    pub fn cancel_reply(&mut self) {
        self.reply_target = None;
    }

    /// Appends the emoji for `shortcode` to the input. Unknown shortcodes are
    /// ignored.
    pub fn insert_emoji(&mut self, shortcode: &str) -> bool {
        match emojis::get_by_shortcode(shortcode) {
            Some(emoji) => {
                self.input_text.push_str(emoji.as_str());
                true
            }
            None => {
                log::debug!("Unknown emoji shortcode `{shortcode}`");
                false
            }
        }
    }
}
