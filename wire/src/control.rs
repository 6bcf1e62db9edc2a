//! Handshake frames: control messages from the relay, hello from peers.
//!
//! Control frame: `[0x00][session id: u8][message: u16-prefixed UTF-8]`.
//! Hello frame: `[0x01][role: u8][peer id: 16 bytes][fingerprint: u64 LE]`.

use std::fmt;

use bytestream::{ByteReader, ByteWriter};
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError, WireResult};
use crate::header::{FrameHeader, PeerRole};

const ERR_PREFIX: &str = "ERR:";
const INFO_PREFIX: &str = "INFO:";
const REGISTERED_PREFIX: &str = "INFO:REGISTERED:";

/// Size of an encoded hello frame.
pub const HELLO_FRAME_LEN: usize = 1 + 1 + 16 + 8;

/// A parsed relay control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// `INFO:REGISTERED:<n>`: the peer now owns session id `n`.
    Registered(u8),
    /// `ERR:<reason>`: the relay refused the peer.
    Rejected(String),
    /// Any other `INFO:` message.
    Info(String),
}

impl ControlMessage {
    /// Parses the text of a control message.
    pub fn parse(text: &str) -> WireResult<Self> {
        if let Some(raw) = text.strip_prefix(REGISTERED_PREFIX) {
            return parse_session_id(raw).map(Self::Registered);
        }
        if let Some(reason) = text.strip_prefix(ERR_PREFIX) {
            return Ok(Self::Rejected(reason.to_owned()));
        }
        if let Some(detail) = text.strip_prefix(INFO_PREFIX) {
            return Ok(Self::Info(detail.to_owned()));
        }
        Err(DecodeError::InvalidControl {
            message: text.to_owned(),
        })
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered(id) => write!(f, "{REGISTERED_PREFIX}{id}"),
            Self::Rejected(reason) => write!(f, "{ERR_PREFIX}{reason}"),
            Self::Info(detail) => write!(f, "{INFO_PREFIX}{detail}"),
        }
    }
}

fn parse_session_id(raw: &str) -> WireResult<u8> {
    match raw.parse::<u8>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(DecodeError::InvalidSessionId {
            raw: raw.to_owned(),
        }),
    }
}

/// A decoded control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub session_id: u8,
    pub message: ControlMessage,
}

/// A decoded hello frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelloFrame {
    pub role: PeerRole,
    pub peer_id: Uuid,
    /// Fingerprint of the peer's payload registries.
    pub fingerprint: u64,
}

/// Encodes a control frame.
pub fn encode_control_frame(
    session_id: u8,
    message: &ControlMessage,
) -> Result<Vec<u8>, EncodeError> {
    let text = message.to_string();
    let mut writer = ByteWriter::with_capacity(4 + text.len());
    writer.write_u8(FrameHeader::Control.as_byte());
    writer.write_u8(session_id);
    writer.write_str(&text)?;
    Ok(writer.finish())
}

/// Encodes a hello frame.
#[must_use]
pub fn encode_hello_frame(hello: &HelloFrame) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(HELLO_FRAME_LEN);
    writer.write_u8(FrameHeader::Hello.as_byte());
    writer.write_u8(hello.role.as_byte());
    writer.write_uuid(&hello.peer_id);
    writer.write_u64(hello.fingerprint);
    writer.finish()
}

/// Decodes a control frame body (the reader is positioned after the header).
pub(crate) fn decode_control_body(reader: &mut ByteReader<'_>) -> WireResult<ControlFrame> {
    let session_id = reader.read_u8()?;
    let message = ControlMessage::parse(reader.read_str()?)?;
    ensure_consumed(reader)?;
    Ok(ControlFrame {
        session_id,
        message,
    })
}

/// Decodes a hello frame body (the reader is positioned after the header).
pub(crate) fn decode_hello_body(reader: &mut ByteReader<'_>) -> WireResult<HelloFrame> {
    let role_byte = reader.read_u8()?;
    let role = PeerRole::from_byte(role_byte).ok_or(DecodeError::InvalidRole { role: role_byte })?;
    let peer_id = reader.read_uuid()?;
    let fingerprint = reader.read_u64()?;
    ensure_consumed(reader)?;
    Ok(HelloFrame {
        role,
        peer_id,
        fingerprint,
    })
}

fn ensure_consumed(reader: &ByteReader<'_>) -> WireResult<()> {
    if reader.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::TrailingBytes {
            count: reader.remaining(),
        })
    }
}
