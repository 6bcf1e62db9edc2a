//! The channel state machine: handshake, steady-state frames, disconnect.

use std::sync::Arc;
use std::time::Instant;

use codec::{decode_payload, encode_frame, route_direction, Envelope, Payload, PayloadRegistries};
use log::{debug, info, warn};
use uuid::Uuid;
use wire::{ControlFrame, ControlMessage, DecodeError, Frame, HelloFrame, PeerRole, Route};

use crate::config::ChannelConfig;
use crate::error::{ChannelError, ChannelResult, HandshakeError};
use crate::stats::ChannelStats;
use crate::transport::{Transport, TransportEvent};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Disconnected,
    /// Transport opening or hello sent; waiting for registration.
    Connecting,
    /// Registered with a session id.
    Ready,
}

/// Something the channel reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected { session_id: u8 },
    HandshakeFailed(HandshakeError),
    Payload(Envelope),
    /// A relay control message received while ready.
    Control(ControlMessage),
    Disconnected,
}

/// A transport plus the handshake and framing rules on top of it.
pub struct Channel<T> {
    transport: T,
    role: PeerRole,
    peer_id: Uuid,
    registries: Arc<PayloadRegistries>,
    config: ChannelConfig,
    state: ChannelState,
    session_id: Option<u8>,
    deadline: Option<Instant>,
    stats: ChannelStats,
}

impl<T: Transport> Channel<T> {
    pub fn new(
        transport: T,
        role: PeerRole,
        peer_id: Uuid,
        registries: Arc<PayloadRegistries>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            transport,
            role,
            peer_id,
            registries,
            config,
            state: ChannelState::Disconnected,
            session_id: None,
            deadline: None,
            stats: ChannelStats::default(),
        }
    }

    /// Opens the transport and starts the handshake.
    ///
    /// The outcome arrives later from [`poll`](Self::poll) as either
    /// [`ChannelEvent::Connected`] or [`ChannelEvent::HandshakeFailed`].
    pub fn connect(&mut self, address: &str, now: Instant) -> ChannelResult<()> {
        if self.state != ChannelState::Disconnected {
            return Err(ChannelError::AlreadyConnected);
        }
        self.transport.open(address)?;
        self.state = ChannelState::Connecting;
        self.deadline = Some(now + self.config.handshake_timeout);
        debug!("{:?} {} connecting to {address}", self.role, self.peer_id);
        Ok(())
    }

    /// Drains transport events and checks the handshake deadline.
    pub fn poll(&mut self, now: Instant) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.transport.poll_event() {
            if let Some(out) = self.handle_event(event) {
                events.push(out);
            }
        }
        if self.state == ChannelState::Connecting && self.deadline.is_some_and(|at| now >= at) {
            events.push(self.fail_handshake(HandshakeError::Timeout));
        }
        events
    }

    /// Applies one transport event to the state machine.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<ChannelEvent> {
        if let TransportEvent::Frame(bytes) = &event {
            self.stats.record_received(bytes.len());
        }
        match self.state {
            ChannelState::Disconnected => {
                if matches!(event, TransportEvent::Frame(_)) {
                    self.stats.frames_dropped += 1;
                }
                None
            }
            ChannelState::Connecting => self.handle_connecting(event),
            ChannelState::Ready => self.handle_ready(event),
        }
    }

    fn handle_connecting(&mut self, event: TransportEvent) -> Option<ChannelEvent> {
        match event {
            TransportEvent::Opened => {
                let hello = wire::encode_hello_frame(&HelloFrame {
                    role: self.role,
                    peer_id: self.peer_id,
                    fingerprint: self.registries.fingerprint(),
                });
                match self.transport.send(&hello) {
                    Ok(()) => {
                        self.stats.record_sent(hello.len());
                        None
                    }
                    Err(err) => Some(self.fail_handshake(HandshakeError::TransportFailed(err))),
                }
            }
            TransportEvent::Frame(bytes) => match wire::decode_frame(&bytes, &self.config.limits) {
                Ok(Frame::Control(ControlFrame { message, .. })) => match message {
                    ControlMessage::Registered(session_id) => {
                        self.state = ChannelState::Ready;
                        self.session_id = Some(session_id);
                        self.deadline = None;
                        info!(
                            "{:?} {} registered as session {session_id}",
                            self.role, self.peer_id
                        );
                        Some(ChannelEvent::Connected { session_id })
                    }
                    ControlMessage::Rejected(reason) => {
                        Some(self.fail_handshake(HandshakeError::Rejected(reason)))
                    }
                    ControlMessage::Info(detail) => {
                        info!("relay: {detail}");
                        None
                    }
                },
                Ok(other) => {
                    debug!(
                        "dropping frame 0x{:02X} during handshake",
                        other.header().as_byte()
                    );
                    self.stats.frames_dropped += 1;
                    None
                }
                Err(DecodeError::InvalidSessionId { raw }) => {
                    Some(self.fail_handshake(HandshakeError::InvalidSessionId { raw }))
                }
                Err(err) => {
                    warn!("dropping malformed frame during handshake: {err}");
                    self.stats.frames_dropped += 1;
                    None
                }
            },
            TransportEvent::Closed => Some(self.fail_handshake(HandshakeError::ConnectionClosed)),
            TransportEvent::Error(err) => {
                Some(self.fail_handshake(HandshakeError::TransportFailed(err)))
            }
        }
    }

    fn handle_ready(&mut self, event: TransportEvent) -> Option<ChannelEvent> {
        match event {
            TransportEvent::Opened => None,
            TransportEvent::Frame(bytes) => {
                let decoded = match wire::decode_frame(&bytes, &self.config.limits) {
                    Ok(Frame::Payload(frame)) => decode_payload(&self.registries, &frame)
                        .map(ChannelEvent::Payload)
                        .map_err(|err| err.to_string()),
                    Ok(Frame::Control(frame)) => Ok(ChannelEvent::Control(frame.message)),
                    Ok(Frame::Hello(_)) => Err("unexpected hello frame".to_owned()),
                    Err(err) => Err(err.to_string()),
                };
                match decoded {
                    Ok(event) => Some(event),
                    Err(reason) => {
                        warn!("dropping frame: {reason}");
                        self.stats.frames_dropped += 1;
                        None
                    }
                }
            }
            TransportEvent::Closed => {
                info!("{:?} {} disconnected by remote", self.role, self.peer_id);
                self.reset();
                Some(ChannelEvent::Disconnected)
            }
            TransportEvent::Error(err) => {
                warn!("{:?} {} transport error: {err}", self.role, self.peer_id);
                self.transport.close();
                self.reset();
                Some(ChannelEvent::Disconnected)
            }
        }
    }

    fn fail_handshake(&mut self, err: HandshakeError) -> ChannelEvent {
        warn!("{:?} {} handshake failed: {err}", self.role, self.peer_id);
        self.transport.close();
        self.reset();
        ChannelEvent::HandshakeFailed(err)
    }

    fn reset(&mut self) {
        self.state = ChannelState::Disconnected;
        self.session_id = None;
        self.deadline = None;
    }

    /// Encodes and sends one payload. Returns the frame size.
    ///
    /// Oversize frames fail with [`ChannelError::Oversize`] and never reach
    /// the transport.
    pub fn send_payload(&mut self, route: &Route, payload: &Payload) -> ChannelResult<usize> {
        let Some(session_id) = self.session_id.filter(|_| self.state == ChannelState::Ready)
        else {
            return Err(ChannelError::NotReady);
        };
        let kind = payload.kind();
        if kind.direction() != route_direction(route) {
            return Err(ChannelError::WrongDirection { kind });
        }
        let frame = match encode_frame(
            &self.registries,
            route,
            session_id,
            payload,
            &self.config.limits,
        ) {
            Ok(frame) => frame,
            Err(err) => {
                let err = ChannelError::from(err);
                if err.is_oversize() {
                    self.stats.oversize_rejected += 1;
                }
                return Err(err);
            }
        };
        self.transport.send(&frame)?;
        self.stats.record_sent(frame.len());
        debug!("sent {kind:?} ({} bytes) via {:?}", frame.len(), route.header());
        Ok(frame.len())
    }

    /// Closes the transport and stops event delivery. Safe to call in any state.
    pub fn disconnect(&mut self) {
        if self.state == ChannelState::Disconnected {
            return;
        }
        info!("{:?} {} disconnecting", self.role, self.peer_id);
        self.transport.close();
        self.reset();
    }

    #[must_use]
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ChannelState::Ready
    }

    #[must_use]
    pub const fn session_id(&self) -> Option<u8> {
        self.session_id
    }

    #[must_use]
    pub const fn peer_id(&self) -> Uuid {
        self.peer_id
    }

    #[must_use]
    pub const fn role(&self) -> PeerRole {
        self.role
    }

    #[must_use]
    pub const fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    #[must_use]
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    #[must_use]
    pub fn registries(&self) -> &PayloadRegistries {
        &self.registries
    }

    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
