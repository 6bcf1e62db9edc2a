//! Error types for wire format operations.

use std::fmt;

use bytestream::ByteError;

/// Result type for wire decoding.
pub type WireResult<T> = Result<T, DecodeError>;

/// High-level decode errors for wire framing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Frame is empty.
    EmptyFrame,

    /// First byte is not a known frame header.
    UnknownHeader { header: u8 },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// Control message is not `ERR:<reason>` or `INFO:<detail>`.
    InvalidControl { message: String },

    /// `INFO:REGISTERED:<n>` carried a value outside `1..=255`.
    InvalidSessionId { raw: String },

    /// Hello frame role byte is not a known role.
    InvalidRole { role: u8 },

    /// Fixed-layout frame carried bytes past its end.
    TrailingBytes { count: usize },

    /// Underlying byte cursor failure (truncation, bad UTF-8, bad varint).
    Bytes(ByteError),
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    FrameBytes,
    Exclusions,
    TypeIdLength,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// Encoded frame would exceed the frame size limit.
    FrameTooLarge { size: usize, limit: usize },

    /// Exclusion list longer than the configured limit.
    TooManyExclusions { count: usize, limit: usize },

    /// Type identifier longer than the configured limit.
    TypeIdTooLong { length: usize, limit: usize },

    /// Underlying byte cursor failure.
    Bytes(ByteError),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFrame => write!(f, "empty frame"),
            Self::UnknownHeader { header } => {
                write!(f, "unknown frame header: 0x{header:02X}")
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::InvalidControl { message } => {
                write!(f, "invalid control message: {message:?}")
            }
            Self::InvalidSessionId { raw } => {
                write!(f, "invalid session id: {raw:?}")
            }
            Self::InvalidRole { role } => write!(f, "invalid hello role: 0x{role:02X}"),
            Self::TrailingBytes { count } => write!(f, "{count} trailing bytes after frame"),
            Self::Bytes(err) => write!(f, "malformed frame: {err}"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FrameBytes => "frame bytes",
            Self::Exclusions => "exclusion count",
            Self::TypeIdLength => "type id length",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameTooLarge { size, limit } => {
                write!(f, "frame too large: {size} bytes exceeds limit of {limit}")
            }
            Self::TooManyExclusions { count, limit } => {
                write!(f, "too many exclusions: {count} > {limit}")
            }
            Self::TypeIdTooLong { length, limit } => {
                write!(f, "type id too long: {length} > {limit}")
            }
            Self::Bytes(err) => write!(f, "encode failed: {err}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bytes(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bytes(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ByteError> for DecodeError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}

impl From<ByteError> for EncodeError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display_unknown_header() {
        let err = DecodeError::UnknownHeader { header: 0x7F };
        assert!(err.to_string().contains("0x7F"));
    }

    #[test]
    fn decode_error_display_limits_exceeded() {
        let err = DecodeError::LimitsExceeded {
            kind: LimitKind::Exclusions,
            limit: 4,
            actual: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("exclusion count"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn encode_error_display_frame_too_large() {
        let err = EncodeError::FrameTooLarge {
            size: 5000,
            limit: 4096,
        };
        let msg = err.to_string();
        assert!(msg.contains("5000"));
        assert!(msg.contains("4096"));
    }

    #[test]
    fn byte_errors_are_sources() {
        use std::error::Error;
        let err = DecodeError::from(ByteError::InvalidVarint);
        assert!(err.source().is_some());
    }
}
