//! Identifier, registry and payload codec errors.

use std::fmt;

use bytestream::ByteError;

use crate::{Direction, Identifier};

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for payload codec operations.
pub type PayloadResult<T> = Result<T, PayloadError>;

/// Errors produced while validating an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Text form lacks the `:` separator.
    MissingSeparator { text: String },

    /// Namespace or path is empty.
    EmptyPart { text: String },

    /// A character outside `[a-z0-9_.-]`.
    InvalidCharacter { text: String, found: char },
}

/// Errors that can occur while building a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// The identifier is already registered in this direction.
    Duplicate {
        id: Identifier,
        direction: Direction,
    },

    /// The identifier does not validate.
    InvalidIdentifier(IdentifierError),
}

/// Errors raised by payload codecs.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PayloadError {
    /// Byte-level failure.
    Bytes(ByteError),

    /// No registry entry for the payload's identifier.
    Unregistered {
        id: Identifier,
        direction: Direction,
    },

    /// A batch referenced an index with no registry entry.
    UnknownTypeIndex { index: u32 },

    /// A codec was handed a payload of another type.
    TypeMismatch { expected: Identifier },

    /// A decoded or supplied field value is outside its domain.
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// Body had bytes left after the codec finished.
    TrailingBytes { id: Identifier, count: usize },
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator { text } => {
                write!(f, "identifier {text:?} is missing ':' separator")
            }
            Self::EmptyPart { text } => write!(f, "identifier {text:?} has an empty part"),
            Self::InvalidCharacter { text, found } => {
                write!(f, "identifier {text:?} contains invalid character {found:?}")
            }
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { id, direction } => {
                write!(f, "payload type {id} already registered for {direction}")
            }
            Self::InvalidIdentifier(err) => write!(f, "{err}"),
        }
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(err) => write!(f, "payload bytes: {err}"),
            Self::Unregistered { id, direction } => {
                write!(f, "payload type {id} is not registered for {direction}")
            }
            Self::UnknownTypeIndex { index } => write!(f, "unknown payload type index {index}"),
            Self::TypeMismatch { expected } => {
                write!(f, "codec for {expected} received a different payload")
            }
            Self::InvalidValue { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::TrailingBytes { id, count } => {
                write!(f, "{count} trailing bytes after {id} payload")
            }
        }
    }
}

impl std::error::Error for IdentifierError {}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidIdentifier(err) => Some(err),
            Self::Duplicate { .. } => None,
        }
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bytes(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IdentifierError> for RegistryError {
    fn from(err: IdentifierError) -> Self {
        Self::InvalidIdentifier(err)
    }
}

impl From<ByteError> for PayloadError {
    fn from(err: ByteError) -> Self {
        Self::Bytes(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_display_names_direction() {
        let err = RegistryError::Duplicate {
            id: Identifier::from_static("tether", "keep_alive"),
            direction: Direction::ToServer,
        };
        let msg = err.to_string();
        assert!(msg.contains("tether:keep_alive"));
        assert!(msg.contains("to-server"));
    }

    #[test]
    fn payload_error_wraps_bytes() {
        use std::error::Error;
        let err = PayloadError::from(ByteError::InvalidUtf8);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("UTF-8"));
    }
}
