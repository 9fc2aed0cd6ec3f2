//! Payloads relayed by the hub

use warp::ws::Message as WsMessage;

/// A single inbound or outbound chat frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

/// Discriminant of a payload, used for capability checks and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Binary,
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Text(_) => PayloadKind::Text,
            Payload::Binary(_) => PayloadKind::Binary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(data) => data.len(),
        }
    }

    /// Convert a transport frame into a payload; control frames yield `None`
    pub fn from_ws(msg: WsMessage) -> Option<Self> {
        if msg.is_text() {
            // is_text guarantees the frame is valid UTF-8
            msg.to_str().ok().map(|s| Payload::Text(s.to_string()))
        } else if msg.is_binary() {
            Some(Payload::Binary(msg.into_bytes()))
        } else {
            None
        }
    }

    pub fn to_ws(&self) -> WsMessage {
        match self {
            Payload::Text(text) => WsMessage::text(text.clone()),
            Payload::Binary(data) => WsMessage::binary(data.clone()),
        }
    }
}

/// Payload kinds a hub accepts and relays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub text: bool,
    pub binary: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            text: true,
            binary: true,
        }
    }

    pub fn text_only() -> Self {
        Self {
            text: true,
            binary: false,
        }
    }

    pub fn supports(&self, kind: PayloadKind) -> bool {
        match kind {
            PayloadKind::Text => self.text,
            PayloadKind::Binary => self.binary,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}
