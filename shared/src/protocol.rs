//! Message framing for the garden protocol
//!
//! Every message on the byte stream is a 4-byte header followed by its payload:
//!
//! ```text
//! +-----+--------+---------+--------+-----------------+
//! | tag | len lo | len mid | len hi | payload (len B) |
//! +-----+--------+---------+--------+-----------------+
//! ```
//!
//! The length counts payload bytes only and is a 24-bit little-endian integer.
//! A frame is complete once `4 + len` bytes are buffered; decoding never
//! consumes a partial frame, so callers simply append more bytes and retry.

use crate::{Controls, Crop, Harvest};
use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HEADER_LEN: usize = 4;
pub const MAX_PAYLOAD_LEN: usize = (1 << 24) - 1;

/// Fixed-width little-endian bincode; a State payload must be consumed exactly.
fn state_codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Leading tag byte of each message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Controls = b'c',
    Pickup = b'p',
    State = b's',
    Gift = b'g',
    Win = b'w',
}

impl MessageKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'c' => Some(MessageKind::Controls),
            b'p' => Some(MessageKind::Pickup),
            b's' => Some(MessageKind::State),
            b'g' => Some(MessageKind::Gift),
            b'w' => Some(MessageKind::Win),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload of {0} bytes exceeds the 24-bit length field")]
    PayloadTooLarge(usize),
    #[error("unknown message tag {0:#04x}")]
    UnknownKind(u8),
    #[error("malformed {kind:?} payload: {reason}")]
    MalformedPayload { kind: MessageKind, reason: String },
    #[error("{0:?} message sent in the wrong direction")]
    UnexpectedMessage(MessageKind),
    #[error("invalid state snapshot: {0}")]
    State(#[from] bincode::Error),
}

/// Roster entry carried in every state snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: u32,
    pub name: String,
}

/// Per-recipient view of the authoritative game state, sent once per tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: u32,
    /// Id of the player this snapshot was addressed to
    pub player_id: u32,
    pub players: Vec<PlayerSummary>,
    pub harvest: Harvest,
    pub win: bool,
}

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Controls(Controls),
    /// Raw resource type code. Codes outside 0..=5 are carried through untouched.
    Pickup(u8),
    State(StateSnapshot),
    Gift(Crop),
    Win,
}

/// Wraps `payload` in a frame header.
pub fn encode_frame(tag: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let len = payload.len();
    if len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge(len));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + len);
    frame.push(tag);
    frame.extend_from_slice(&(len as u32).to_le_bytes()[..3]);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Reads the tag and declared payload length, if the header is buffered.
pub fn frame_header(buf: &[u8]) -> Option<(u8, usize)> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    let len = u32::from_le_bytes([buf[1], buf[2], buf[3], 0]) as usize;
    Some((buf[0], len))
}

/// Removes one complete frame from the front of `buf`.
///
/// Returns `None` and leaves `buf` untouched while fewer than `4 + len`
/// bytes are available.
pub fn decode_frame(buf: &mut Vec<u8>) -> Option<(u8, Vec<u8>)> {
    let (tag, len) = frame_header(buf)?;
    if buf.len() < HEADER_LEN + len {
        return None;
    }
    let payload = buf[HEADER_LEN..HEADER_LEN + len].to_vec();
    buf.drain(..HEADER_LEN + len);
    Some((tag, payload))
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Controls(_) => MessageKind::Controls,
            Message::Pickup(_) => MessageKind::Pickup,
            Message::State(_) => MessageKind::State,
            Message::Gift(_) => MessageKind::Gift,
            Message::Win => MessageKind::Win,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = match self {
            Message::Controls(controls) => controls.to_bytes().to_vec(),
            Message::Pickup(code) => vec![*code],
            Message::State(snapshot) => state_codec().serialize(snapshot)?,
            Message::Gift(crop) => vec![crop.code()],
            Message::Win => Vec::new(),
        };
        encode_frame(self.kind().tag(), &payload)
    }

    /// Decodes the message at the front of `buf`, if it is complete.
    ///
    /// An unknown tag is an error as soon as its first byte arrives and
    /// nothing is consumed. A complete frame whose payload does not fit its
    /// kind is consumed and reported as an error.
    pub fn decode(buf: &mut Vec<u8>) -> Result<Option<Message>, ProtocolError> {
        let Some(&tag) = buf.first() else {
            return Ok(None);
        };
        let kind = MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownKind(tag))?;

        match decode_frame(buf) {
            Some((_, payload)) => Self::from_payload(kind, &payload).map(Some),
            None => Ok(None),
        }
    }

    /// Decodes every complete message currently buffered, in order.
    pub fn decode_all(buf: &mut Vec<u8>) -> Result<Vec<Message>, ProtocolError> {
        let mut messages = Vec::new();
        while let Some(message) = Self::decode(buf)? {
            messages.push(message);
        }
        Ok(messages)
    }

    fn from_payload(kind: MessageKind, payload: &[u8]) -> Result<Message, ProtocolError> {
        let malformed = |reason: String| ProtocolError::MalformedPayload { kind, reason };

        match kind {
            MessageKind::Controls => {
                let bytes: [u8; Controls::WIRE_LEN] = payload.try_into().map_err(|_| {
                    malformed(format!(
                        "expected {} bytes, got {}",
                        Controls::WIRE_LEN,
                        payload.len()
                    ))
                })?;
                Ok(Message::Controls(Controls::from_bytes(bytes)))
            }
            MessageKind::Pickup => match payload {
                [code] => Ok(Message::Pickup(*code)),
                _ => Err(malformed(format!("expected 1 byte, got {}", payload.len()))),
            },
            MessageKind::State => Ok(Message::State(state_codec().deserialize(payload)?)),
            MessageKind::Gift => match payload {
                [code] => Crop::from_code(*code)
                    .map(Message::Gift)
                    .ok_or_else(|| malformed(format!("{} is not a crop code", code))),
                _ => Err(malformed(format!("expected 1 byte, got {}", payload.len()))),
            },
            MessageKind::Win if payload.is_empty() => Ok(Message::Win),
            MessageKind::Win => Err(malformed(format!(
                "expected no payload, got {} bytes",
                payload.len()
            ))),
        }
    }
}
