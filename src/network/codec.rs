//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only what the chat needs: the open handshake, heartbeats, namespace
//! connect and plain (non-binary) events on the default namespace.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine packet type `{0}`")]
    UnknownEngineType(char),
    #[error("unknown socket packet type `{0}`")]
    UnknownSocketType(char),
    #[error("binary socket packets are not supported")]
    Binary,
    #[error("event packet without a name")]
    MissingEventName,
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parameters the server announces in its open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        payload: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        payload: Value,
    },
}

impl SocketPacket {
    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }
}

pub const DEFAULT_NAMESPACE: &str = "/";

pub fn decode(frame: &str) -> Result<EnginePacket, CodecError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(rest)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping),
        '3' => Ok(EnginePacket::Pong),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '6' => Ok(EnginePacket::Noop),
        other => Err(CodecError::UnknownEngineType(other)),
    }
}

fn decode_socket(body: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    if matches!(kind, '5' | '6') {
        return Err(CodecError::Binary);
    }

    let (namespace, rest) = split_namespace(rest);
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let (ack, data) = rest.split_at(digits);
    let ack = ack.parse::<u64>().ok();

    match kind {
        '0' => Ok(SocketPacket::Connect {
            namespace,
            payload: if data.is_empty() {
                None
            } else {
                Some(serde_json::from_str(data)?)
            },
        }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let mut args: Vec<Value> = serde_json::from_str(data)?;
            if args.is_empty() {
                return Err(CodecError::MissingEventName);
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                _ => return Err(CodecError::MissingEventName),
            };
            Ok(SocketPacket::Event {
                namespace,
                ack,
                name,
                args,
            })
        }
        '3' => Ok(SocketPacket::Ack {
            namespace,
            ack: ack.unwrap_or_default(),
            args: serde_json::from_str(data)?,
        }),
        '4' => Ok(SocketPacket::ConnectError {
            namespace,
            payload: serde_json::from_str(data)?,
        }),
        other => Err(CodecError::UnknownSocketType(other)),
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if rest.starts_with('/') {
        if let Some((namespace, tail)) = rest.split_once(',') {
            return (namespace.to_string(), tail);
        }
        return (rest.to_string(), "");
    }
    (DEFAULT_NAMESPACE.to_string(), rest)
}

pub fn encode_connect() -> String {
    "40".to_string()
}

pub fn encode_pong() -> String {
    "3".to_string()
}

pub fn encode_event(name: &str, payload: Value) -> Result<String, CodecError> {
    let body = serde_json::to_string(&[Value::String(name.to_string()), payload])?;
    Ok(format!("42{body}"))
}
