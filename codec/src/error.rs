//! Error types for frame-level payload encoding/decoding.

use std::fmt;

use protocol::{Direction, Identifier, IdentifierError, PayloadError};
use wire::FrameHeader;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur turning payloads into frames and back.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Wire framing error on decode.
    Wire(wire::DecodeError),

    /// Wire framing error on encode, other than size.
    WireEncode(wire::EncodeError),

    /// The encoded frame would exceed the frame size limit.
    FrameTooLarge { size: usize, limit: usize },

    /// Payload body codec error.
    Payload(PayloadError),

    /// Frame type id is not a valid identifier.
    InvalidTypeId(IdentifierError),

    /// Frame type id is not registered in either direction.
    UnknownType { type_id: String },

    /// The type is registered, but not for the direction the route implies.
    DirectionMismatch {
        id: Identifier,
        registered: Direction,
        header: FrameHeader,
    },

    /// The frame is a control or hello frame, not a payload frame.
    NotPayloadFrame { header: FrameHeader },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(err) => write!(f, "wire error: {err}"),
            Self::WireEncode(err) => write!(f, "wire encode error: {err}"),
            Self::FrameTooLarge { size, limit } => {
                write!(f, "frame of {size} bytes exceeds limit of {limit}")
            }
            Self::Payload(err) => write!(f, "payload error: {err}"),
            Self::InvalidTypeId(err) => write!(f, "invalid type id: {err}"),
            Self::UnknownType { type_id } => write!(f, "unknown payload type {type_id:?}"),
            Self::DirectionMismatch {
                id,
                registered,
                header,
            } => {
                write!(
                    f,
                    "payload {id} is registered {registered} but arrived with header 0x{:02X}",
                    header.as_byte()
                )
            }
            Self::NotPayloadFrame { header } => {
                write!(f, "frame 0x{:02X} carries no payload", header.as_byte())
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(err) => Some(err),
            Self::WireEncode(err) => Some(err),
            Self::Payload(err) => Some(err),
            Self::InvalidTypeId(err) => Some(err),
            _ => None,
        }
    }
}

impl From<wire::DecodeError> for CodecError {
    fn from(err: wire::DecodeError) -> Self {
        Self::Wire(err)
    }
}

impl From<wire::EncodeError> for CodecError {
    fn from(err: wire::EncodeError) -> Self {
        match err {
            wire::EncodeError::FrameTooLarge { size, limit } => Self::FrameTooLarge { size, limit },
            other => Self::WireEncode(other),
        }
    }
}

impl From<PayloadError> for CodecError {
    fn from(err: PayloadError) -> Self {
        Self::Payload(err)
    }
}

impl From<bytestream::ByteError> for CodecError {
    fn from(err: bytestream::ByteError) -> Self {
        Self::Payload(PayloadError::Bytes(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_too_large_is_lifted_out_of_wire() {
        let err = CodecError::from(wire::EncodeError::FrameTooLarge {
            size: 5000,
            limit: 4096,
        });
        assert_eq!(
            err,
            CodecError::FrameTooLarge {
                size: 5000,
                limit: 4096
            }
        );
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn other_encode_errors_stay_wrapped() {
        let err = CodecError::from(wire::EncodeError::TooManyExclusions { count: 9, limit: 8 });
        assert!(matches!(err, CodecError::WireEncode(_)));
    }

    #[test]
    fn direction_mismatch_display() {
        let err = CodecError::DirectionMismatch {
            id: Identifier::from_static("tether", "batch"),
            registered: Direction::ToServer,
            header: FrameHeader::Broadcast,
        };
        let msg = err.to_string();
        assert!(msg.contains("tether:batch"));
        assert!(msg.contains("0x11"));
    }
}
