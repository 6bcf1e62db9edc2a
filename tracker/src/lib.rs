//! Adaptive per-entity replication for tether.
//!
//! The server side keeps one [`EntityTrackerEntry`] per tracked entity inside
//! a [`ReplicationDriver`]. Each tick an entry compares the entity's live
//! state against the last state it sent and emits the cheapest payload that
//! keeps the receiver in sync: nothing, a relative move, a rotation, a
//! combined move and rotation, or an absolute resync. The receiver side
//! applies those payloads to a [`ReplicaWorld`].
//!
//! # Features
//!
//! - Fixed-point (1/4096) relative moves with integer reconstruction
//! - Periodic and overflow-triggered absolute resyncs
//! - Velocity, tracked-data and attribute change propagation
//! - Spawn/remove lifecycle with coalesced removals
//!
//! # Design Principles
//!
//! - **Sender and receiver share one position model** - both sides use [`TrackedPosition`].
//! - **Capabilities, not hierarchies** - velocity and attributes are optional traits probed once.
//! - **Sinks, not sockets** - trackers emit payloads; framing happens elsewhere.

mod attributes;
mod config;
mod data;
mod driver;
mod entity;
mod entry;
mod position;
mod replica;
mod sim;

pub use attributes::AttributeContainer;
pub use config::{
    TrackerConfig, MAX_RELATIVE_UPDATES, MAX_REMOVALS_PER_PAYLOAD, MOVE_THRESHOLD_SQ,
    RESYNC_INTERVAL, VELOCITY_EPSILON_SQ,
};
pub use data::DataTracker;
pub use driver::{DriverStats, ReplicationDriver};
pub use entity::{HasAttributes, HasVelocity, PayloadSink, TrackedEntity};
pub use entry::{EntityTrackerEntry, PositionSync, TickOutcome};
pub use position::{TrackedPosition, POSITION_SCALE};
pub use replica::{install_handlers, Replica, ReplicaError, ReplicaResult, ReplicaWorld};
pub use sim::{Motion, SimEntity};
