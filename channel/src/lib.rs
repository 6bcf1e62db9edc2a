//! Session channels for tether: handshake, framing, batching and relay.
//!
//! A [`Channel`] runs the handshake over any [`Transport`] and then moves
//! typed payloads as size-checked frames. [`ClientConnection`] adds a
//! per-tick outbound queue that is flushed as a batch, and
//! [`ServerConnection`] adds broadcast, targeted and exclude sends. The
//! in-memory [`Relay`] is the session authority both sides register with.
//!
//! # Features
//!
//! - `Disconnected -> Connecting -> Ready` state machine with handshake timeout
//! - Oversize frames rejected before they reach the transport
//! - Batch flush with individual-send fallback
//! - Reachability probing with retries and cancellation
//!
//! # Design Principles
//!
//! - **Pull-based** - Transport events are polled on the owning thread.
//! - **Time is passed in** - Deadlines use the `Instant` the caller provides.
//! - **Malformed input is dropped, not fatal** - One bad frame never ends a session.

mod channel;
mod client;
mod config;
mod error;
mod relay;
mod server;
mod sniff;
mod stats;
mod transport;

pub use channel::{Channel, ChannelEvent, ChannelState};
pub use client::{ClientConnection, FlushReport};
pub use config::{ChannelConfig, RelayConfig, SniffOptions};
pub use error::{ChannelError, ChannelResult, HandshakeError, TransportError};
pub use relay::{
    MemoryTransport, Relay, RelayNotice, RelayStats, FULL, HOST_TAKEN, NO_HOST, PROTOCOL_MISMATCH,
};
pub use server::ServerConnection;
pub use sniff::{sniff, CancelToken, Probe, TcpProbe};
pub use stats::ChannelStats;
pub use transport::{Transport, TransportEvent};
