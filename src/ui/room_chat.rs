use std::time::Instant;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::oneshot;

use crate::common::{ChatMessage, NetworkCommand, NetworkEvent, UserIdentity};
use crate::network::{Connection, HistorySource};

use super::state::{ChatPhase, ChatState};

/// One mounted team-chat view.
///
/// Mounting joins the room, starts the history fetch and subscribes to the
/// shared connection. Dropping it is the unmount: the subscription goes with
/// it while the connection stays up for everyone else.
pub struct RoomChat {
    state: ChatState,
    connection: Connection,
    subscription: Option<broadcast::Receiver<NetworkEvent>>,
    history: Option<oneshot::Receiver<Option<Vec<ChatMessage>>>>,
}

impl RoomChat {
    pub fn mount<H: HistorySource>(
        connection: Connection,
        history: H,
        user: Option<UserIdentity>,
        room_id: Option<String>,
        runtime: &Handle,
    ) -> Self {
        let state = ChatState::new(user, room_id);
        let mut chat = Self {
            state,
            connection,
            subscription: None,
            history: None,
        };

        let Some(room_id) = chat.state.room_id().map(str::to_string) else {
            log::info!("No company room for this session; chat stays inactive");
            return chat;
        };

        // Subscribe before joining so nothing broadcast during the history
        // fetch is missed. Those events wait until the fetch settles.
        chat.subscription = Some(chat.connection.subscribe());
        chat.connection.emit(NetworkCommand::JoinRoom(room_id.clone()));
        log::info!("Joined room {room_id}");

        let (tx, rx) = oneshot::channel();
        runtime.spawn(async move {
            let loaded = match history.fetch(&room_id).await {
                Ok(messages) => {
                    log::info!("Loaded {} messages for room {room_id}", messages.len());
                    Some(messages)
                }
                Err(err) => {
                    log::warn!("Could not load history for room {room_id}: {err}");
                    None
                }
            };
            // The view may have been unmounted meanwhile.
            let _ = tx.send(loaded);
        });
        chat.history = Some(rx);

        chat
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ChatState {
        &mut self.state
    }

    /// Drains whatever arrived since the last frame. Returns whether the view
    /// needs a repaint.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = self.poll_history();
        if self.state.phase() != ChatPhase::Live {
            return changed;
        }

        let Some(subscription) = self.subscription.as_mut() else {
            return changed;
        };
        loop {
            match subscription.try_recv() {
                Ok(NetworkEvent::MessageReceived(message)) => {
                    changed |= self.state.apply_incoming(message, now);
                }
                Ok(NetworkEvent::Connected(_) | NetworkEvent::Disconnected(_)) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Chat fell behind; {skipped} events were dropped");
                }
                Err(TryRecvError::Closed) => {
                    log::warn!("Realtime connection is gone");
                    self.subscription = None;
                    break;
                }
            }
        }
        changed
    }

    fn poll_history(&mut self) -> bool {
        let Some(pending) = self.history.as_mut() else {
            return false;
        };
        let loaded = match pending.try_recv() {
            Ok(loaded) => loaded,
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => None,
        };
        self.history = None;
        self.state.finish_loading(loaded);
        true
    }

    /// Emits the composed message. A no-op for blank input or a missing
    /// user or room. A refused send keeps the draft and the reply target.
    pub fn send(&mut self) -> bool {
        let draft = self.state.input_text.clone();
        let Some(message) = self.state.compose(Utc::now()) else {
            return false;
        };
        let reply_to = message.reply_to.clone();
        if self.connection.emit(NetworkCommand::SendMessage(message)) {
            true
        } else {
            self.state.restore_draft(draft, reply_to);
            false
        }
    }

    pub fn select_reply(&mut self, index: usize) {
        if let Some(message) = self.state.messages().get(index).cloned() {
            self.state.select_reply(&message);
        }
    }
}
