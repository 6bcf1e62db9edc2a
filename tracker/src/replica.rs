//! Receiver-side replicas rebuilt from to-client payloads.

use std::collections::BTreeMap;
use std::fmt;

use codec::{
    dequantize_yaw, AttributeSnapshot, Direction, Dispatcher, EntityId, HandlerResult, Identifier,
    Origin, Payload, PayloadKind, TrackedValue, Vec2,
};
use log::debug;

use crate::position::TrackedPosition;

/// Errors applying a payload to a [`ReplicaWorld`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReplicaError {
    /// The payload names an entity that was never spawned.
    UnknownEntity { id: EntityId, kind: PayloadKind },
    /// The payload is not a to-client entity payload.
    Unsupported { kind: PayloadKind },
}

impl fmt::Display for ReplicaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownEntity { id, kind } => {
                write!(f, "{kind:?} for unknown entity {id}")
            }
            Self::Unsupported { kind } => write!(f, "{kind:?} cannot be applied to replicas"),
        }
    }
}

impl std::error::Error for ReplicaError {}

pub type ReplicaResult<T> = Result<T, ReplicaError>;

/// Client-side copy of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Replica {
    kind: Identifier,
    tracked: TrackedPosition,
    yaw: u8,
    velocity: Vec2,
    data: BTreeMap<u8, TrackedValue>,
    attributes: BTreeMap<Identifier, AttributeSnapshot>,
}

impl Replica {
    #[must_use]
    pub const fn kind(&self) -> &Identifier {
        &self.kind
    }

    /// Position as reconstructed from the payloads received.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.tracked.pos()
    }

    #[must_use]
    pub const fn yaw_byte(&self) -> u8 {
        self.yaw
    }

    #[must_use]
    pub fn yaw(&self) -> f64 {
        dequantize_yaw(self.yaw)
    }

    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    #[must_use]
    pub fn data(&self, key: u8) -> Option<&TrackedValue> {
        self.data.get(&key)
    }

    #[must_use]
    pub fn attribute(&self, id: &Identifier) -> Option<&AttributeSnapshot> {
        self.attributes.get(id)
    }
}

/// Every replica a client knows about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicaWorld {
    replicas: BTreeMap<EntityId, Replica>,
    applied: u64,
}

impl ReplicaWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one to-client payload.
    pub fn apply(&mut self, payload: &Payload) -> ReplicaResult<()> {
        let kind = payload.kind();
        match payload {
            Payload::EntitySpawn(spawn) => {
                self.replicas.insert(
                    spawn.id,
                    Replica {
                        kind: spawn.kind.clone(),
                        tracked: TrackedPosition::new(spawn.position),
                        yaw: spawn.yaw,
                        velocity: spawn.velocity,
                        data: BTreeMap::new(),
                        attributes: BTreeMap::new(),
                    },
                );
                debug!("spawned replica {}", spawn.id);
            }
            Payload::EntityRemove(remove) => {
                for id in &remove.ids {
                    self.replicas.remove(id);
                }
            }
            Payload::EntityPosition(p) => {
                let replica = self.replica_mut(p.id, kind)?;
                replica.tracked.set_pos(p.position);
                replica.yaw = p.yaw;
            }
            Payload::EntityMove(p) => {
                let replica = self.replica_mut(p.id, kind)?;
                let pos = replica.tracked.with_delta(i64::from(p.dx), i64::from(p.dy));
                replica.tracked.set_pos(pos);
            }
            Payload::EntityRotate(p) => {
                self.replica_mut(p.id, kind)?.yaw = p.yaw;
            }
            Payload::EntityMoveRotate(p) => {
                let replica = self.replica_mut(p.id, kind)?;
                let pos = replica.tracked.with_delta(i64::from(p.dx), i64::from(p.dy));
                replica.tracked.set_pos(pos);
                replica.yaw = p.yaw;
            }
            Payload::EntityVelocity(p) => {
                self.replica_mut(p.id, kind)?.velocity = p.velocity;
            }
            Payload::TrackedData(p) => {
                let replica = self.replica_mut(p.id, kind)?;
                for entry in &p.entries {
                    replica.data.insert(entry.key, entry.value.clone());
                }
            }
            Payload::Attributes(p) => {
                let replica = self.replica_mut(p.id, kind)?;
                for snapshot in &p.attributes {
                    replica
                        .attributes
                        .insert(snapshot.attribute.clone(), snapshot.clone());
                }
            }
            Payload::Batch(batch) => {
                for item in &batch.items {
                    self.apply(item)?;
                }
                return Ok(());
            }
            Payload::PlayerInput(_) | Payload::KeepAlive(_) => {
                return Err(ReplicaError::Unsupported { kind });
            }
        }
        self.applied += 1;
        Ok(())
    }

    fn replica_mut(&mut self, id: EntityId, kind: PayloadKind) -> ReplicaResult<&mut Replica> {
        self.replicas
            .get_mut(&id)
            .ok_or(ReplicaError::UnknownEntity { id, kind })
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Replica> {
        self.replicas.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Replica)> {
        self.replicas.iter().map(|(id, replica)| (*id, replica))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Payloads applied successfully so far.
    #[must_use]
    pub const fn applied(&self) -> u64 {
        self.applied
    }
}

/// Registers a handler for every to-client kind that applies it to the world.
pub fn install_handlers(dispatcher: &mut Dispatcher<ReplicaWorld>) {
    for kind in PayloadKind::ALL {
        if kind.direction() == Direction::ToClient {
            dispatcher.on(kind, apply_handler);
        }
    }
}

fn apply_handler(world: &mut ReplicaWorld, payload: &Payload, _origin: &Origin) -> HandlerResult {
    world.apply(payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{EntityMove, EntityRemove, EntitySpawn, EntityVelocity, KeepAlive, Route};

    fn origin() -> Origin {
        Origin {
            route: Route::Broadcast,
            session_id: 0,
        }
    }

    fn spawn(raw: u128, position: Vec2) -> Payload {
        Payload::EntitySpawn(EntitySpawn {
            id: EntityId::from_u128(raw),
            kind: Identifier::from_static("game", "cow"),
            position,
            yaw: 10,
            velocity: Vec2::ZERO,
        })
    }

    #[test]
    fn move_reconstructs_packed_position() {
        let mut world = ReplicaWorld::new();
        world.apply(&spawn(1, Vec2::new(100.0, 200.0))).unwrap();
        world
            .apply(&Payload::EntityMove(EntityMove {
                id: EntityId::from_u128(1),
                dx: 2458,
                dy: 0,
            }))
            .unwrap();
        let pos = world.get(EntityId::from_u128(1)).unwrap().position();
        assert!((pos.x - 100.6).abs() <= 1.0 / 4096.0);
        assert!((pos.y - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let mut world = ReplicaWorld::new();
        let err = world
            .apply(&Payload::EntityVelocity(EntityVelocity {
                id: EntityId::from_u128(9),
                velocity: Vec2::ZERO,
            }))
            .unwrap_err();
        assert_eq!(
            err,
            ReplicaError::UnknownEntity {
                id: EntityId::from_u128(9),
                kind: PayloadKind::EntityVelocity
            }
        );
    }

    #[test]
    fn remove_drops_replicas() {
        let mut world = ReplicaWorld::new();
        world.apply(&spawn(1, Vec2::ZERO)).unwrap();
        world.apply(&spawn(2, Vec2::ZERO)).unwrap();
        world
            .apply(&Payload::EntityRemove(EntityRemove {
                ids: vec![EntityId::from_u128(1)],
            }))
            .unwrap();
        assert_eq!(world.len(), 1);
        assert!(world.get(EntityId::from_u128(2)).is_some());
    }

    #[test]
    fn to_server_payloads_are_refused() {
        let mut world = ReplicaWorld::new();
        assert!(matches!(
            world.apply(&Payload::KeepAlive(KeepAlive { nonce: 1 })),
            Err(ReplicaError::Unsupported { .. })
        ));
    }

    #[test]
    fn handlers_apply_through_dispatcher() {
        let mut dispatcher = Dispatcher::new();
        install_handlers(&mut dispatcher);
        assert_eq!(dispatcher.handler_count(PayloadKind::EntityMove), 1);
        assert_eq!(dispatcher.handler_count(PayloadKind::KeepAlive), 0);

        let mut world = ReplicaWorld::new();
        let report = dispatcher.dispatch_payload(&mut world, &spawn(4, Vec2::ZERO), &origin());
        assert!(report.is_clean());
        assert_eq!(world.len(), 1);

        let report = dispatcher.dispatch_payload(
            &mut world,
            &Payload::EntityMove(EntityMove {
                id: EntityId::from_u128(5),
                dx: 1,
                dy: 1,
            }),
            &origin(),
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(world.applied(), 1);
    }
}
