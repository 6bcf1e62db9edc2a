//! What the tracker needs from an entity.
//!
//! The core surface is [`TrackedEntity`]. Velocity and attributes are
//! optional capabilities exposed through accessor methods; a tracker entry
//! probes them once when it is created.

use codec::{AttributeSnapshot, DataEntry, EntityId, Identifier, Payload, Vec2};

/// An entity whose state is replicated.
pub trait TrackedEntity {
    fn id(&self) -> EntityId;

    /// Kind sent in the spawn payload.
    fn kind(&self) -> Identifier;

    fn position(&self) -> Vec2;

    /// Yaw in radians.
    fn yaw(&self) -> f64;

    /// Returns `true` if any tracked property changed since it was last drained.
    fn has_dirty_data(&self) -> bool;

    /// Returns the changed properties and clears only their flags.
    fn drain_dirty_data(&mut self) -> Vec<DataEntry>;

    fn as_velocity(&mut self) -> Option<&mut dyn HasVelocity> {
        None
    }

    fn as_attributes(&mut self) -> Option<&mut dyn HasAttributes> {
        None
    }
}

/// Velocity capability.
pub trait HasVelocity {
    fn velocity(&self) -> Vec2;

    fn velocity_dirty(&self) -> bool;

    fn clear_velocity_dirty(&mut self);
}

/// Numeric attribute capability.
pub trait HasAttributes {
    fn has_pending_attributes(&self) -> bool;

    /// Returns snapshots of every changed attribute and clears the pending set.
    fn drain_pending_attributes(&mut self) -> Vec<AttributeSnapshot>;
}

/// Receives payloads produced by trackers.
pub trait PayloadSink {
    fn emit(&mut self, payload: Payload);
}

impl PayloadSink for Vec<Payload> {
    fn emit(&mut self, payload: Payload) {
        self.push(payload);
    }
}
