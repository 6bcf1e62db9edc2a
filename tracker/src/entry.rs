//! Per-entity adaptive replication.
//!
//! An [`EntityTrackerEntry`] decides on every tick whether its entity needs
//! nothing, a relative move, a rotation, a combined move and rotation, or a
//! full absolute resync, and emits the matching payloads together with
//! velocity, tracked-data and attribute updates.

use codec::{
    quantize_yaw, AttributesUpdate, EntityId, EntityMove, EntityMoveRotate, EntityPosition,
    EntityRotate, EntitySpawn, EntityVelocity, Payload, TrackedDataUpdate, Vec2,
};
use log::{debug, trace};

use crate::config::{
    TrackerConfig, MAX_RELATIVE_UPDATES, MOVE_THRESHOLD_SQ, RESYNC_INTERVAL, VELOCITY_EPSILON_SQ,
};
use crate::entity::{PayloadSink, TrackedEntity};
use crate::position::TrackedPosition;

/// Which position/orientation payload a tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionSync {
    /// `EntityPosition`: full position and yaw.
    Absolute,
    /// `EntityMove`: packed deltas only.
    Relative,
    /// `EntityRotate`: yaw only.
    Rotate,
    /// `EntityMoveRotate`: packed deltas and yaw.
    MoveRotate,
}

/// What one call to [`EntityTrackerEntry::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub evaluated: bool,
    pub position: Option<PositionSync>,
    pub velocity: bool,
    pub data_entries: usize,
    pub attributes: usize,
}

impl TickOutcome {
    /// Number of payloads emitted.
    #[must_use]
    pub fn payloads(&self) -> usize {
        usize::from(self.position.is_some())
            + usize::from(self.velocity)
            + usize::from(self.data_entries > 0)
            + usize::from(self.attributes > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Capabilities {
    velocity: bool,
    attributes: bool,
}

/// Server-side replication state for one entity.
#[derive(Debug, Clone)]
pub struct EntityTrackerEntry {
    id: EntityId,
    config: TrackerConfig,
    ticks: u64,
    updates_since_absolute: u32,
    last_yaw: u8,
    last_velocity: Vec2,
    tracked: TrackedPosition,
    capabilities: Capabilities,
}

impl EntityTrackerEntry {
    /// Creates an entry synced to the entity's current state.
    ///
    /// Capabilities are probed once here; an entity that gains a capability
    /// later needs a new entry.
    pub fn new<E: TrackedEntity + ?Sized>(entity: &mut E, config: TrackerConfig) -> Self {
        let last_velocity = entity
            .as_velocity()
            .map_or(Vec2::ZERO, |velocity| velocity.velocity());
        let capabilities = Capabilities {
            velocity: entity.as_velocity().is_some(),
            attributes: entity.as_attributes().is_some(),
        };
        Self {
            id: entity.id(),
            config,
            ticks: 0,
            updates_since_absolute: 0,
            last_yaw: quantize_yaw(entity.yaw()),
            last_velocity,
            tracked: TrackedPosition::new(entity.position()),
            capabilities,
        }
    }

    /// Spawn payload describing the state this entry considers synced.
    #[must_use]
    pub fn spawn_payload<E: TrackedEntity + ?Sized>(&self, entity: &E) -> Payload {
        Payload::EntitySpawn(EntitySpawn {
            id: self.id,
            kind: entity.kind(),
            position: self.tracked.pos(),
            yaw: self.last_yaw,
            velocity: self.last_velocity,
        })
    }

    /// Advances one tick and emits whatever the entity needs.
    pub fn tick<E, S>(&mut self, entity: &mut E, sink: &mut S) -> TickOutcome
    where
        E: TrackedEntity + ?Sized,
        S: PayloadSink + ?Sized,
    {
        let tick = self.ticks;
        self.ticks = self.ticks.wrapping_add(1);

        let velocity_dirty = self.capabilities.velocity
            && entity
                .as_velocity()
                .is_some_and(|velocity| velocity.velocity_dirty());
        let scheduled = tick % self.config.effective_interval() == 0;
        if !(scheduled || velocity_dirty || entity.has_dirty_data()) {
            return TickOutcome::default();
        }

        let mut outcome = TickOutcome {
            evaluated: true,
            ..TickOutcome::default()
        };

        let live = entity.position();
        let byte_yaw = quantize_yaw(entity.yaw());
        let relative_candidate = live.distance_squared(self.tracked.pos()) >= MOVE_THRESHOLD_SQ
            || tick % RESYNC_INTERVAL == 0;
        let yaw_delta = (i32::from(byte_yaw) - i32::from(self.last_yaw)).abs();
        let yaw_changed = yaw_delta >= 1;
        let dx = self.tracked.delta_x(live);
        let dy = self.tracked.delta_y(live);

        let mut resync_position = false;
        let mut resync_yaw = false;

        let packed = i16::try_from(dx).ok().zip(i16::try_from(dy).ok());
        match packed {
            Some(_) if self.updates_since_absolute < MAX_RELATIVE_UPDATES => {}
            _ => {
                debug!(
                    "entity {}: absolute resync at tick {tick} (dx={dx}, dy={dy}, relative updates={})",
                    self.id, self.updates_since_absolute
                );
                sink.emit(Payload::EntityPosition(EntityPosition {
                    id: self.id,
                    position: live,
                    yaw: byte_yaw,
                }));
                self.updates_since_absolute = 0;
                resync_position = true;
                resync_yaw = true;
                outcome.position = Some(PositionSync::Absolute);
            }
        }

        if let (None, Some((dx, dy))) = (outcome.position, packed) {
            let sync = if relative_candidate {
                sink.emit(Payload::EntityMove(EntityMove {
                    id: self.id,
                    dx,
                    dy,
                }));
                resync_position = true;
                Some(PositionSync::Relative)
            } else if yaw_changed {
                sink.emit(Payload::EntityRotate(EntityRotate {
                    id: self.id,
                    yaw: byte_yaw,
                }));
                resync_yaw = true;
                Some(PositionSync::Rotate)
            } else if !(dx.unsigned_abs() <= 1 && dy.unsigned_abs() <= 1 && yaw_delta <= 2) {
                sink.emit(Payload::EntityMoveRotate(EntityMoveRotate {
                    id: self.id,
                    dx,
                    dy,
                    yaw: byte_yaw,
                }));
                resync_position = true;
                resync_yaw = true;
                Some(PositionSync::MoveRotate)
            } else {
                None
            };
            if let Some(sync) = sync {
                trace!("entity {}: {sync:?} at tick {tick} (dx={dx}, dy={dy})", self.id);
                self.updates_since_absolute += 1;
                outcome.position = Some(sync);
            }
        }

        if self.capabilities.velocity {
            if let Some(velocity) = entity.as_velocity() {
                if self.config.always_track_velocity || velocity.velocity_dirty() {
                    let live_velocity = velocity.velocity();
                    let changed =
                        live_velocity.distance_squared(self.last_velocity) > VELOCITY_EPSILON_SQ;
                    let came_to_rest = live_velocity.is_zero() && !self.last_velocity.is_zero();
                    if changed || came_to_rest {
                        sink.emit(Payload::EntityVelocity(EntityVelocity {
                            id: self.id,
                            velocity: live_velocity,
                        }));
                        self.last_velocity = live_velocity;
                        outcome.velocity = true;
                    }
                }
            }
        }

        if entity.has_dirty_data() {
            let entries = entity.drain_dirty_data();
            if !entries.is_empty() {
                outcome.data_entries = entries.len();
                sink.emit(Payload::TrackedData(TrackedDataUpdate {
                    id: self.id,
                    entries,
                }));
            }
        }

        if self.capabilities.attributes {
            if let Some(attributes) = entity.as_attributes() {
                let changed = attributes.drain_pending_attributes();
                if !changed.is_empty() {
                    outcome.attributes = changed.len();
                    sink.emit(Payload::Attributes(AttributesUpdate {
                        id: self.id,
                        attributes: changed,
                    }));
                }
            }
        }

        if resync_position {
            self.tracked.set_pos(live);
        }
        if resync_yaw {
            self.last_yaw = byte_yaw;
        }
        if self.capabilities.velocity {
            if let Some(velocity) = entity.as_velocity() {
                velocity.clear_velocity_dirty();
            }
        }

        outcome
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of `tick` calls so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub const fn updates_since_absolute(&self) -> u32 {
        self.updates_since_absolute
    }

    #[must_use]
    pub const fn tracked_position(&self) -> TrackedPosition {
        self.tracked
    }

    #[must_use]
    pub const fn last_yaw(&self) -> u8 {
        self.last_yaw
    }

    #[must_use]
    pub const fn last_velocity(&self) -> Vec2 {
        self.last_velocity
    }

    #[must_use]
    pub const fn tracks_velocity(&self) -> bool {
        self.capabilities.velocity
    }

    #[must_use]
    pub const fn tracks_attributes(&self) -> bool {
        self.capabilities.attributes
    }
}
