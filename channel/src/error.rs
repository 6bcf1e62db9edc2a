//! Error types for transports, handshakes and channels.

use std::fmt;

use codec::{CodecError, PayloadKind};

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Nothing is listening at the address.
    Unreachable { address: String },
    /// The transport has not been opened, or was closed.
    NotOpen,
    /// The transport is already open.
    AlreadyOpen,
    /// Underlying I/O failure.
    Io { message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { address } => write!(f, "{address} is unreachable"),
            Self::NotOpen => write!(f, "transport is not open"),
            Self::AlreadyOpen => write!(f, "transport is already open"),
            Self::Io { message } => write!(f, "transport I/O error: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Why a handshake failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandshakeError {
    /// No registration arrived before the handshake deadline.
    Timeout,
    /// The relay answered `ERR:<reason>`.
    Rejected(String),
    /// The relay assigned a session id outside `1..=255`.
    InvalidSessionId { raw: String },
    /// The transport closed while connecting.
    ConnectionClosed,
    /// The transport reported an error while connecting.
    TransportFailed(TransportError),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "handshake timed out"),
            Self::Rejected(reason) => write!(f, "handshake rejected: {reason}"),
            Self::InvalidSessionId { raw } => write!(f, "invalid session id {raw:?}"),
            Self::ConnectionClosed => write!(f, "connection closed during handshake"),
            Self::TransportFailed(err) => write!(f, "transport failed during handshake: {err}"),
        }
    }
}

impl std::error::Error for HandshakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TransportFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors from channel operations.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ChannelError {
    /// The encoded frame exceeds the frame size limit; nothing was sent.
    Oversize { size: usize, limit: usize },
    /// The channel is not in the `Ready` state.
    NotReady,
    /// `connect` was called while connecting or connected.
    AlreadyConnected,
    /// The payload kind cannot be sent from this side.
    WrongDirection { kind: PayloadKind },
    /// Payload encoding failed for a reason other than size.
    Codec(CodecError),
    Transport(TransportError),
    Handshake(HandshakeError),
}

impl ChannelError {
    #[must_use]
    pub const fn is_oversize(&self) -> bool {
        matches!(self, Self::Oversize { .. })
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversize { size, limit } => {
                write!(f, "frame of {size} bytes exceeds limit of {limit}")
            }
            Self::NotReady => write!(f, "channel is not ready"),
            Self::AlreadyConnected => write!(f, "channel is already connecting or connected"),
            Self::WrongDirection { kind } => write!(f, "{kind:?} cannot be sent from this side"),
            Self::Codec(err) => write!(f, "codec error: {err}"),
            Self::Transport(err) => write!(f, "transport error: {err}"),
            Self::Handshake(err) => write!(f, "handshake error: {err}"),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::Handshake(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for ChannelError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::FrameTooLarge { size, limit } => Self::Oversize { size, limit },
            other => Self::Codec(other),
        }
    }
}

impl From<TransportError> for ChannelError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<HandshakeError> for ChannelError {
    fn from(err: HandshakeError) -> Self {
        Self::Handshake(err)
    }
}
