//! The message-oriented transport a channel runs over.

use crate::error::TransportError;

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// `open` completed; the transport can send.
    Opened,
    /// One whole frame arrived.
    Frame(Vec<u8>),
    /// The remote side went away.
    Closed,
    Error(TransportError),
}

/// A size-bounded, message-oriented transport.
///
/// Events are pulled with [`poll_event`](Transport::poll_event) on the
/// thread that owns the channel. Implementations that receive elsewhere
/// queue events internally.
pub trait Transport {
    /// Starts opening a connection; completion is reported as [`TransportEvent::Opened`].
    fn open(&mut self, address: &str) -> Result<(), TransportError>;

    /// Sends one whole frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Closes the connection. Closing a closed transport does nothing.
    fn close(&mut self);

    fn poll_event(&mut self) -> Option<TransportEvent>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, address: &str) -> Result<(), TransportError> {
        (**self).open(address)
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        (**self).poll_event()
    }
}
