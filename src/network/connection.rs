use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};

use crate::common::{NetworkCommand, NetworkEvent};

use super::client::{ReconnectPolicy, SocketClient, encode_command};

const COMMAND_BUFFER: usize = 100;

/// Shared handle to the application's single realtime connection.
///
/// Built once at startup and cloned into every chat view. The socket task
/// stops only when the last handle is dropped.
#[derive(Clone)]
pub struct Connection {
    commands: mpsc::Sender<NetworkCommand>,
    events: broadcast::Sender<NetworkEvent>,
    /// Largest frame the server accepts, learned at handshake; 0 if unknown.
    frame_limit: Arc<AtomicU64>,
}

impl Connection {
    /// Spawns the socket task on `runtime` and starts connecting right away.
    pub fn open(
        endpoint: Url,
        policy: ReconnectPolicy,
        event_buffer: usize,
        runtime: &Handle,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));

        let connection = Self::from_parts(command_tx, event_tx);

        let client = SocketClient::new(
            endpoint,
            policy,
            command_rx,
            connection.events.clone(),
            connection.frame_limit.clone(),
        );
        runtime.spawn(async move {
            if let Err(err) = client.run().await {
                log::error!("Realtime connection terminated: {err}");
            }
        });

        connection
    }

    /// Wraps existing channels, e.g. a fake transport driven by a test.
    pub fn from_parts(
        commands: mpsc::Sender<NetworkCommand>,
        events: broadcast::Sender<NetworkEvent>,
    ) -> Self {
        Self {
            commands,
            events,
            frame_limit: Arc::default(),
        }
    }

    /// Queues `command` for the socket. Never blocks the caller.
    ///
    /// Returns false when the command was not accepted, including frames
    /// over the server's size limit.
    pub fn emit(&self, command: NetworkCommand) -> bool {
        let event = command.event_name();
        let limit = self.frame_limit.load(Ordering::Relaxed);
        if limit > 0 {
            match encode_command(&command) {
                Some(frame) if frame.len() as u64 > limit => {
                    log::warn!(
                        "Refusing `{event}`: {} bytes over the server limit of {limit}",
                        frame.len()
                    );
                    return false;
                }
                Some(_) => {}
                None => return false,
            }
        }
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Failed to queue `{event}` for the connection: {err}");
                false
            }
        }
    }

    /// A fresh receiver for every inbound event from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}
