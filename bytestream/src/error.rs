//! Error types for byte cursor operations.

use std::fmt;

/// Result type for byte cursor operations.
pub type ByteResult<T> = Result<T, ByteError>;

/// Errors that can occur during byte-level encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteError {
    /// Attempted to read past the end of the buffer.
    UnexpectedEof {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// A varint ran past its maximum encoded width without terminating.
    InvalidVarint,

    /// A length-prefixed string did not contain valid UTF-8.
    InvalidUtf8,

    /// A length does not fit in its wire prefix.
    LengthOverflow {
        /// The length that was attempted.
        length: usize,
        /// Maximum length the prefix can express.
        max: usize,
    },

    /// A decoded element count cannot be satisfied by the remaining input.
    CountExceedsRemaining {
        /// The decoded count.
        count: usize,
        /// Bytes left in the reader.
        remaining: usize,
    },
}

impl fmt::Display for ByteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                requested,
                available,
            } => {
                write!(
                    f,
                    "attempted to read {requested} bytes but only {available} bytes available"
                )
            }
            Self::InvalidVarint => write!(f, "varint exceeds 5 bytes"),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::LengthOverflow { length, max } => {
                write!(f, "length {length} exceeds prefix maximum {max}")
            }
            Self::CountExceedsRemaining { count, remaining } => {
                write!(
                    f,
                    "element count {count} exceeds {remaining} remaining bytes"
                )
            }
        }
    }
}

impl std::error::Error for ByteError {}
