use std::collections::VecDeque;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::common::commands::CHAT_MESSAGE_EVENT;
use crate::common::{ChatMessage, NetworkCommand, NetworkEvent};

use super::codec::{self, CodecError, DEFAULT_NAMESPACE, EnginePacket, Handshake, SocketPacket};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);
/// Frames kept for sending while the socket is down; newer ones are dropped.
pub const MAX_PENDING_FRAMES: usize = 100;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("server did not complete the handshake in time")]
    HandshakeTimeout,
    #[error("expected an open packet, got {0:?}")]
    UnexpectedPacket(EnginePacket),
    #[error("no heartbeat within {0:?}")]
    HeartbeatTimeout(Duration),
    #[error("namespace connect refused: {0}")]
    Refused(Value),
}

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

/// Turns an http(s) server address into its Socket.IO websocket endpoint.
pub fn socket_endpoint(server_url: &str) -> Result<Url, Box<dyn Error + Send + Sync>> {
    let mut url = Url::parse(server_url)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(format!("unsupported scheme `{other}`").into()),
    };
    url.set_scheme(scheme)
        .map_err(|_| format!("cannot switch `{server_url}` to {scheme}"))?;
    url.set_path("/socket.io/");
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

enum SessionEnd {
    /// Every connection handle is gone; stop for good.
    Shutdown,
    /// The server went away; reconnect.
    Dropped(String),
}

/// Owns the websocket and keeps it alive across drops.
///
/// Commands that arrive while the socket is down (or before the namespace is
/// acknowledged) are queued in order and flushed once connected.
pub struct SocketClient {
    endpoint: Url,
    policy: ReconnectPolicy,
    command_receiver: mpsc::Receiver<NetworkCommand>,
    event_sender: broadcast::Sender<NetworkEvent>,
    pending: VecDeque<String>,
    /// Server `maxPayload` shared with the connection handles; 0 until known.
    frame_limit: Arc<AtomicU64>,
}

impl SocketClient {
    pub fn new(
        endpoint: Url,
        policy: ReconnectPolicy,
        command_receiver: mpsc::Receiver<NetworkCommand>,
        event_sender: broadcast::Sender<NetworkEvent>,
        frame_limit: Arc<AtomicU64>,
    ) -> Self {
        Self {
            endpoint,
            policy,
            command_receiver,
            event_sender,
            pending: VecDeque::new(),
            frame_limit,
        }
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut attempt = 0u32;

        loop {
            log::info!("Connecting to {}", self.endpoint);
            let reason = match self.run_session(&mut attempt).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Dropped(reason)) => reason,
                Err(err) => err.to_string(),
            };
            log::warn!("Realtime connection lost: {reason}");
            let _ = self.event_sender.send(NetworkEvent::Disconnected(reason));

            let delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            log::info!("Reconnecting in {delay:?} (attempt {attempt})");

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    command = self.command_receiver.recv() => match command {
                        Some(command) => self.queue(command),
                        None => return Ok(()),
                    }
                }
            }
        }

        log::info!("Realtime connection closed");
        Ok(())
    }

    async fn run_session(&mut self, attempt: &mut u32) -> Result<SessionEnd, TransportError> {
        let (socket, _) = tokio_tungstenite::connect_async(self.endpoint.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        let handshake = match tokio::time::timeout(HANDSHAKE_TIMEOUT, stream.next()).await {
            Err(_) => return Err(TransportError::HandshakeTimeout),
            Ok(None) => return Ok(SessionEnd::Dropped("closed during handshake".into())),
            Ok(Some(frame)) => match frame? {
                Message::Text(text) => match codec::decode(text.as_str())? {
                    EnginePacket::Open(handshake) => handshake,
                    other => return Err(TransportError::UnexpectedPacket(other)),
                },
                other => {
                    return Ok(SessionEnd::Dropped(format!(
                        "unexpected handshake frame {other:?}"
                    )));
                }
            },
        };
        log::debug!("Engine.IO open: {handshake:?}");
        self.frame_limit
            .store(handshake.max_payload.unwrap_or_default(), Ordering::Relaxed);

        sink.send(Message::text(codec::encode_connect())).await?;

        let liveness = heartbeat_window(&handshake);
        let mut ready = false;

        // Reset by inbound frames only.
        let deadline = tokio::time::sleep(liveness);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(TransportError::HeartbeatTimeout(liveness));
                }
                command = self.command_receiver.recv() => {
                    let Some(command) = command else {
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(SessionEnd::Shutdown);
                    };
                    if ready {
                        if let Some(frame) = encode_command(&command) {
                            if fits(&handshake, &frame) {
                                sink.send(Message::text(frame)).await?;
                            }
                        }
                    } else {
                        self.queue(command);
                    }
                }
                frame = stream.next() => {
                    let frame = match frame {
                        None => return Ok(SessionEnd::Dropped("stream ended".into())),
                        Some(frame) => frame?,
                    };
                    deadline
                        .as_mut()
                        .reset(tokio::time::Instant::now() + liveness);
                    let text = match frame {
                        Message::Text(text) => text,
                        Message::Close(close) => {
                            return Ok(SessionEnd::Dropped(format!("server closed: {close:?}")));
                        }
                        _ => continue,
                    };

                    let packet = match codec::decode(text.as_str()) {
                        Ok(packet) => packet,
                        Err(err) => {
                            log::warn!("Dropping malformed frame: {err}");
                            continue;
                        }
                    };

                    match packet {
                        EnginePacket::Ping => sink.send(Message::text(codec::encode_pong())).await?,
                        EnginePacket::Close => {
                            return Ok(SessionEnd::Dropped("engine close".into()));
                        }
                        EnginePacket::Message(packet) if packet.namespace() == DEFAULT_NAMESPACE => {
                            match packet {
                                SocketPacket::Connect { payload, .. } => {
                                    let sid = payload
                                        .as_ref()
                                        .and_then(|payload| payload.get("sid"))
                                        .and_then(Value::as_str)
                                        .unwrap_or(&handshake.sid)
                                        .to_string();
                                    log::info!("Realtime connection established (sid {sid})");
                                    ready = true;
                                    *attempt = 0;
                                    let _ = self.event_sender.send(NetworkEvent::Connected(sid));
                                    while let Some(frame) = self.pending.pop_front() {
                                        if fits(&handshake, &frame) {
                                            sink.send(Message::text(frame)).await?;
                                        }
                                    }
                                }
                                SocketPacket::ConnectError { payload, .. } => {
                                    return Err(TransportError::Refused(payload));
                                }
                                SocketPacket::Disconnect { .. } => {
                                    return Ok(SessionEnd::Dropped("server disconnect".into()));
                                }
                                SocketPacket::Event { name, args, .. } => {
                                    self.dispatch_event(&name, args);
                                }
                                SocketPacket::Ack { .. } => {}
                            }
                        }
                        other => log::debug!("Ignoring packet {other:?}"),
                    }
                }
            }
        }
    }

    fn queue(&mut self, command: NetworkCommand) {
        if self.pending.len() >= MAX_PENDING_FRAMES {
            log::warn!(
                "Offline queue full ({MAX_PENDING_FRAMES} frames); dropping `{}`",
                command.event_name()
            );
            return;
        }
        if let Some(frame) = encode_command(&command) {
            self.pending.push_back(frame);
        }
    }

    fn dispatch_event(&self, name: &str, mut args: Vec<Value>) {
        if name != CHAT_MESSAGE_EVENT {
            log::debug!("Ignoring event `{name}`");
            return;
        }
        if args.is_empty() {
            log::warn!("`{name}` event without payload");
            return;
        }
        match serde_json::from_value::<ChatMessage>(args.swap_remove(0)) {
            Ok(message) => {
                // No subscribers just means no chat view is mounted.
                let _ = self
                    .event_sender
                    .send(NetworkEvent::MessageReceived(message));
            }
            Err(err) => log::warn!("Invalid chat message payload: {err}"),
        }
    }
}

fn heartbeat_window(handshake: &Handshake) -> Duration {
    Duration::from_millis(handshake.ping_interval + handshake.ping_timeout)
}

/// The server drops the whole connection on oversized frames; skip them.
fn fits(handshake: &Handshake, frame: &str) -> bool {
    match handshake.max_payload {
        Some(limit) if frame.len() as u64 > limit => {
            log::warn!("Dropping {}-byte frame over the server limit of {limit}", frame.len());
            false
        }
        _ => true,
    }
}

pub(super) fn encode_command(command: &NetworkCommand) -> Option<String> {
    let frame = command
        .payload()
        .map_err(CodecError::from)
        .and_then(|payload| codec::encode_event(command.event_name(), payload));
    match frame {
        Ok(frame) => Some(frame),
        Err(err) => {
            log::warn!("Failed to encode `{}`: {err}", command.event_name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[test]
    fn endpoint_switches_scheme_and_path() {
        let url = socket_endpoint("http://localhost:5000").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );

        let url = socket_endpoint("https://hr.example.com/app").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://hr.example.com/socket.io/?EIO=4&transport=websocket"
        );

        assert!(socket_endpoint("ftp://example.com").is_err());
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(1000));
        assert_eq!(policy.delay(1), Duration::from_millis(2000));
        assert_eq!(policy.delay(2), Duration::from_millis(4000));
        assert_eq!(policy.delay(3), Duration::from_millis(5000));
        assert_eq!(policy.delay(40), Duration::from_millis(5000));
    }

    async fn next_text<S>(stream: &mut S) -> String
    where
        S: futures::Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
                .await
                .expect("frame in time")
                .expect("stream open")
                .expect("valid frame");
            if let Message::Text(text) = frame {
                return text.as_str().to_string();
            }
        }
    }

    async fn recv(rx: &mut broadcast::Receiver<NetworkEvent>) -> NetworkEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event in time")
            .expect("event")
    }

    #[tokio::test]
    async fn speaks_socket_io_with_a_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let (mut sink, mut stream) = ws.split();

            sink.send(Message::text(
                r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
            ))
            .await
            .unwrap();
            assert_eq!(next_text(&mut stream).await, "40");
            sink.send(Message::text(r#"40{"sid":"sock-1"}"#)).await.unwrap();

            // Queued before the namespace ack, flushed right after it.
            assert_eq!(
                next_text(&mut stream).await,
                r#"42["joinCompanyRoom","co-42"]"#
            );

            sink.send(Message::text("2")).await.unwrap();
            assert_eq!(next_text(&mut stream).await, "3");

            sink.send(Message::text(
                r#"42["chatMessage",{"content":"yo","senderName":"Bob","roomId":"co-42","timestamp":"T1"}]"#,
            ))
            .await
            .unwrap();
            sink.send(Message::text(r#"42["typing",{"who":"Bob"}]"#))
                .await
                .unwrap();

            // Keep the socket open until the client hangs up.
            while let Some(Ok(frame)) = stream.next().await {
                if frame.is_close() {
                    break;
                }
            }
        });

        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = broadcast::channel(8);
        let endpoint = socket_endpoint(&format!("http://{addr}")).unwrap();
        command_tx
            .send(NetworkCommand::JoinRoom("co-42".into()))
            .await
            .unwrap();

        let frame_limit = Arc::new(AtomicU64::new(0));
        let client = tokio::spawn(
            SocketClient::new(
                endpoint,
                ReconnectPolicy::default(),
                command_rx,
                event_tx,
                frame_limit.clone(),
            )
            .run(),
        );

        assert_eq!(
            recv(&mut event_rx).await,
            NetworkEvent::Connected("sock-1".into())
        );
        assert_eq!(frame_limit.load(Ordering::Relaxed), 1_000_000);
        match recv(&mut event_rx).await {
            NetworkEvent::MessageReceived(message) => {
                assert_eq!(message.content, "yo");
                assert_eq!(message.sender_name, "Bob");
                assert_eq!(message.room_id, "co-42");
            }
            other => panic!("unexpected event {other:?}"),
        }

        drop(command_tx);
        tokio::time::timeout(Duration::from_secs(5), client)
            .await
            .expect("client stops once handles are gone")
            .unwrap()
            .unwrap();
        server.await.unwrap();
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn silent_server_times_out_while_commands_keep_flowing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let (mut sink, mut stream) = ws.split();

            sink.send(Message::text(
                r#"0{"sid":"eio-2","upgrades":[],"pingInterval":200,"pingTimeout":100}"#,
            ))
            .await
            .unwrap();
            assert_eq!(next_text(&mut stream).await, "40");
            sink.send(Message::text(r#"40{"sid":"sock-2"}"#)).await.unwrap();

            // Read everything, never ping.
            while let Some(Ok(_)) = stream.next().await {}
        });

        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = broadcast::channel(8);
        let endpoint = socket_endpoint(&format!("http://{addr}")).unwrap();
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
        };
        let client = tokio::spawn(
            SocketClient::new(endpoint, policy, command_rx, event_tx, Arc::default()).run(),
        );

        assert_eq!(
            recv(&mut event_rx).await,
            NetworkEvent::Connected("sock-2".into())
        );

        let feeder = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(50));
            loop {
                tick.tick().await;
                if command_tx
                    .send(NetworkCommand::JoinRoom("co-42".into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        let event = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .expect("heartbeat timeout despite outbound traffic")
            .unwrap();
        match event {
            NetworkEvent::Disconnected(reason) => {
                assert!(reason.contains("heartbeat"), "reason: {reason}");
            }
            other => panic!("unexpected event {other:?}"),
        }

        feeder.abort();
        client.abort();
        let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
    }

    #[test]
    fn offline_queue_is_bounded_and_keeps_the_oldest_frames() {
        let (_command_tx, command_rx) = mpsc::channel(1);
        let (event_tx, _) = broadcast::channel(1);
        let endpoint = socket_endpoint("http://localhost:5000").unwrap();
        let mut client = SocketClient::new(
            endpoint,
            ReconnectPolicy::default(),
            command_rx,
            event_tx,
            Arc::default(),
        );

        for n in 0..MAX_PENDING_FRAMES + 5 {
            client.queue(NetworkCommand::JoinRoom(format!("room-{n}")));
        }

        assert_eq!(client.pending.len(), MAX_PENDING_FRAMES);
        assert_eq!(
            client.pending.front().map(String::as_str),
            Some(r#"42["joinCompanyRoom","room-0"]"#)
        );
        assert_eq!(
            client.pending.back().map(String::as_str),
            Some(r#"42["joinCompanyRoom","room-99"]"#)
        );
    }

    #[test]
    fn commands_encode_to_event_frames() {
        let frame = encode_command(&NetworkCommand::SendMessage(ChatMessage {
            id: None,
            content: "hi".into(),
            sender_name: "Alice".into(),
            sender_id: None,
            room_id: "co-42".into(),
            timestamp: "T0".into(),
            reply_to: None,
        }))
        .unwrap();

        let body: Value = serde_json::from_str(frame.strip_prefix("42").unwrap()).unwrap();
        assert_eq!(
            body,
            json!([
                "chatMessage",
                { "content": "hi", "senderName": "Alice", "roomId": "co-42", "timestamp": "T0" }
            ])
        );
    }
}
