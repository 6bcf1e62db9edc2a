//! In-memory session relay and the transport that talks to it.
//!
//! The relay is the session authority the handshake talks to. It accepts
//! one host and any number of clients, assigns session ids in `1..=255`,
//! and routes payload frames by header: client frames go to the host, host
//! frames go to the clients the route selects.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use log::{debug, info, warn};
use uuid::Uuid;
use wire::{encode_control_frame, ControlMessage, Frame, HelloFrame, PeerRole, Route};

use crate::config::RelayConfig;
use crate::error::TransportError;
use crate::sniff::Probe;
use crate::transport::{Transport, TransportEvent};

/// Rejection reason: a host is already registered.
pub const HOST_TAKEN: &str = "HOST_TAKEN";
/// Rejection reason: no host is registered yet.
pub const NO_HOST: &str = "NO_HOST";
/// Rejection reason: the peer's registry fingerprint differs from the host's.
pub const PROTOCOL_MISMATCH: &str = "PROTOCOL_MISMATCH";
/// Rejection reason: every session id is in use.
pub const FULL: &str = "FULL";

/// Membership changes the relay reports to the host as `INFO:` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayNotice {
    Joined { session_id: u8, peer_id: Uuid },
    Left { session_id: u8 },
}

impl fmt::Display for RelayNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined {
                session_id,
                peer_id,
            } => write!(f, "JOINED:{session_id}:{peer_id}"),
            Self::Left { session_id } => write!(f, "LEFT:{session_id}"),
        }
    }
}

impl FromStr for RelayNotice {
    type Err = ();

    fn from_str(text: &str) -> Result<Self, ()> {
        if let Some(rest) = text.strip_prefix("JOINED:") {
            let (session, peer) = rest.split_once(':').ok_or(())?;
            return Ok(Self::Joined {
                session_id: session.parse().map_err(|_| ())?,
                peer_id: peer.parse().map_err(|_| ())?,
            });
        }
        if let Some(session) = text.strip_prefix("LEFT:") {
            return Ok(Self::Left {
                session_id: session.parse().map_err(|_| ())?,
            });
        }
        Err(())
    }
}

/// Relay counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelayStats {
    pub registrations: u64,
    pub rejections: u64,
    pub frames_routed: u64,
    pub frames_rejected: u64,
}

#[derive(Debug, Clone, Copy)]
struct Registration {
    role: PeerRole,
    peer_id: Uuid,
    session_id: u8,
}

#[derive(Debug, Default)]
struct Link {
    inbox: VecDeque<TransportEvent>,
    peer: Option<Registration>,
}

#[derive(Debug)]
struct RelayState {
    config: RelayConfig,
    online: bool,
    next_link: u64,
    links: BTreeMap<u64, Link>,
    host: Option<u64>,
    host_fingerprint: u64,
    stats: RelayStats,
}

impl RelayState {
    fn push(&mut self, link: u64, event: TransportEvent) {
        if let Some(target) = self.links.get_mut(&link) {
            target.inbox.push_back(event);
        }
    }

    fn push_control(&mut self, link: u64, session_id: u8, message: &ControlMessage) {
        match encode_control_frame(session_id, message) {
            Ok(frame) => self.push(link, TransportEvent::Frame(frame)),
            Err(err) => warn!("relay cannot encode control message {message}: {err}"),
        }
    }

    fn reject(&mut self, link: u64, reason: &str) {
        debug!("relay rejecting link {link}: {reason}");
        self.stats.rejections += 1;
        self.push_control(link, 0, &ControlMessage::Rejected(reason.to_owned()));
    }

    fn free_session_id(&self) -> Option<u8> {
        let max = self.config.max_sessions;
        (1..=max).find(|candidate| {
            !self
                .links
                .values()
                .any(|link| link.peer.is_some_and(|peer| peer.session_id == *candidate))
        })
    }

    fn open(&mut self, address: &str) -> Result<u64, TransportError> {
        if !self.online || address != self.config.address {
            return Err(TransportError::Unreachable {
                address: address.to_owned(),
            });
        }
        let id = self.next_link;
        self.next_link += 1;
        let mut link = Link::default();
        link.inbox.push_back(TransportEvent::Opened);
        self.links.insert(id, link);
        Ok(id)
    }

    fn receive(&mut self, link: u64, bytes: &[u8]) {
        let Some(sender) = self.links.get(&link).map(|l| l.peer) else {
            return;
        };
        let frame = match wire::decode_frame(bytes, &self.config.limits) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("relay dropping malformed frame from link {link}: {err}");
                self.stats.frames_rejected += 1;
                return;
            }
        };
        match (sender, frame) {
            (None, Frame::Hello(hello)) => self.register(link, hello),
            (Some(sender), Frame::Payload(payload)) => {
                self.route(link, sender, &payload.route, payload.session_id, bytes);
            }
            (_, other) => {
                warn!(
                    "relay dropping unexpected frame 0x{:02X} from link {link}",
                    other.header().as_byte()
                );
                self.stats.frames_rejected += 1;
            }
        }
    }

    fn register(&mut self, link: u64, hello: HelloFrame) {
        match hello.role {
            PeerRole::Server if self.host.is_some() => return self.reject(link, HOST_TAKEN),
            PeerRole::Client if self.host.is_none() => return self.reject(link, NO_HOST),
            PeerRole::Client if hello.fingerprint != self.host_fingerprint => {
                return self.reject(link, PROTOCOL_MISMATCH);
            }
            _ => {}
        }
        let Some(session_id) = self.free_session_id() else {
            return self.reject(link, FULL);
        };
        let registration = Registration {
            role: hello.role,
            peer_id: hello.peer_id,
            session_id,
        };
        if let Some(target) = self.links.get_mut(&link) {
            target.peer = Some(registration);
        }
        self.stats.registrations += 1;
        self.push_control(link, session_id, &ControlMessage::Registered(session_id));
        info!(
            "relay registered {:?} {} as session {session_id}",
            hello.role, hello.peer_id
        );

        match hello.role {
            PeerRole::Server => {
                self.host = Some(link);
                self.host_fingerprint = hello.fingerprint;
            }
            PeerRole::Client => {
                if let Some(host) = self.host {
                    let notice = RelayNotice::Joined {
                        session_id,
                        peer_id: hello.peer_id,
                    };
                    self.push_control(host, 0, &ControlMessage::Info(notice.to_string()));
                }
            }
        }
    }

    fn route(
        &mut self,
        link: u64,
        sender: Registration,
        route: &Route,
        session_id: u8,
        bytes: &[u8],
    ) {
        if session_id != sender.session_id {
            warn!(
                "relay dropping frame from session {} claiming session {session_id}",
                sender.session_id
            );
            self.stats.frames_rejected += 1;
            return;
        }
        let targets: Vec<u64> = match (sender.role, route) {
            (PeerRole::Client, Route::Client) => self.host.into_iter().collect(),
            (PeerRole::Server, Route::Client) | (PeerRole::Client, _) => {
                warn!(
                    "relay dropping {:?} frame 0x{:02X} from link {link}",
                    sender.role,
                    route.header().as_byte()
                );
                self.stats.frames_rejected += 1;
                return;
            }
            (PeerRole::Server, route) => self
                .links
                .iter()
                .filter(|(_, l)| {
                    l.peer.is_some_and(|peer| {
                        peer.role == PeerRole::Client && route.delivers_to(&peer.peer_id)
                    })
                })
                .map(|(id, _)| *id)
                .collect(),
        };
        for target in targets {
            self.push(target, TransportEvent::Frame(bytes.to_vec()));
            self.stats.frames_routed += 1;
        }
    }

    fn close(&mut self, link: u64) {
        let Some(closed) = self.links.remove(&link) else {
            return;
        };
        let Some(peer) = closed.peer else {
            return;
        };
        info!(
            "relay: {:?} {} (session {}) left",
            peer.role, peer.peer_id, peer.session_id
        );
        match peer.role {
            PeerRole::Server => {
                self.host = None;
                for client in self.links.values_mut() {
                    if client.peer.take().is_some() {
                        client.inbox.push_back(TransportEvent::Closed);
                    }
                }
            }
            PeerRole::Client => {
                if let Some(host) = self.host {
                    let notice = RelayNotice::Left {
                        session_id: peer.session_id,
                    };
                    self.push_control(host, 0, &ControlMessage::Info(notice.to_string()));
                }
            }
        }
    }
}

/// Single-threaded in-memory relay.
///
/// Cloning shares the same relay.
#[derive(Debug, Clone)]
pub struct Relay {
    state: Rc<RefCell<RelayState>>,
}

impl Relay {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(RelayState {
                config,
                online: true,
                next_link: 1,
                links: BTreeMap::new(),
                host: None,
                host_fingerprint: 0,
                stats: RelayStats::default(),
            })),
        }
    }

    /// A new, unopened transport connected to this relay.
    #[must_use]
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            state: Rc::clone(&self.state),
            link: None,
        }
    }

    #[must_use]
    pub fn address(&self) -> String {
        self.state.borrow().config.address.clone()
    }

    /// An offline relay refuses new transports and fails probes.
    pub fn set_online(&self, online: bool) {
        self.state.borrow_mut().online = online;
    }

    /// Registered peers, host included.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.state
            .borrow()
            .links
            .values()
            .filter(|link| link.peer.is_some())
            .count()
    }

    #[must_use]
    pub fn has_host(&self) -> bool {
        self.state.borrow().host.is_some()
    }

    #[must_use]
    pub fn stats(&self) -> RelayStats {
        self.state.borrow().stats
    }
}

impl Probe for Relay {
    fn probe(&mut self, address: &str) -> bool {
        let state = self.state.borrow();
        state.online && state.config.address == address
    }
}

/// A [`Transport`] attached to a [`Relay`].
#[derive(Debug)]
pub struct MemoryTransport {
    state: Rc<RefCell<RelayState>>,
    link: Option<u64>,
}

impl MemoryTransport {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.link.is_some()
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, address: &str) -> Result<(), TransportError> {
        if self.link.is_some() {
            return Err(TransportError::AlreadyOpen);
        }
        self.link = Some(self.state.borrow_mut().open(address)?);
        Ok(())
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let link = self.link.ok_or(TransportError::NotOpen)?;
        let mut state = self.state.borrow_mut();
        if !state.links.contains_key(&link) {
            return Err(TransportError::NotOpen);
        }
        state.receive(link, frame);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            self.state.borrow_mut().close(link);
        }
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        let link = self.link?;
        self.state
            .borrow_mut()
            .links
            .get_mut(&link)
            .and_then(|l| l.inbox.pop_front())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}
