//! The closed set of payloads exchanged between server and clients.

use protocol::{Direction, Identifier, TypedPayload};
use uuid::Uuid;

use crate::types::{EntityId, Vec2};

/// Namespace of every built-in payload identifier.
pub const NAMESPACE: &str = "tether";

/// Payload kinds, one per [`Payload`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayloadKind {
    EntitySpawn,
    EntityRemove,
    EntityPosition,
    EntityMove,
    EntityRotate,
    EntityMoveRotate,
    EntityVelocity,
    TrackedData,
    Attributes,
    PlayerInput,
    KeepAlive,
    Batch,
}

impl PayloadKind {
    /// All kinds in registration order.
    pub const ALL: [Self; 12] = [
        Self::EntitySpawn,
        Self::EntityRemove,
        Self::EntityPosition,
        Self::EntityMove,
        Self::EntityRotate,
        Self::EntityMoveRotate,
        Self::EntityVelocity,
        Self::TrackedData,
        Self::Attributes,
        Self::PlayerInput,
        Self::KeepAlive,
        Self::Batch,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::EntitySpawn => "entity_spawn",
            Self::EntityRemove => "entity_remove",
            Self::EntityPosition => "entity_position",
            Self::EntityMove => "entity_move",
            Self::EntityRotate => "entity_rotate",
            Self::EntityMoveRotate => "entity_move_rotate",
            Self::EntityVelocity => "entity_velocity",
            Self::TrackedData => "tracked_data",
            Self::Attributes => "attributes",
            Self::PlayerInput => "player_input",
            Self::KeepAlive => "keep_alive",
            Self::Batch => "batch",
        }
    }

    #[must_use]
    pub const fn identifier(self) -> Identifier {
        Identifier::from_static(NAMESPACE, self.path())
    }

    /// The registry this kind belongs to.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::PlayerInput | Self::KeepAlive | Self::Batch => Direction::ToServer,
            _ => Direction::ToClient,
        }
    }

    /// Resolves a registered identifier back to its kind.
    #[must_use]
    pub fn from_identifier(id: &Identifier) -> Option<Self> {
        if id.namespace() != NAMESPACE {
            return None;
        }
        Self::ALL.into_iter().find(|kind| kind.path() == id.path())
    }
}

/// Full position and orientation; sent on int16 overflow and periodic resync.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPosition {
    pub id: EntityId,
    pub position: Vec2,
    pub yaw: u8,
}

/// Position delta in 1/4096 units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMove {
    pub id: EntityId,
    pub dx: i16,
    pub dy: i16,
}

/// Orientation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRotate {
    pub id: EntityId,
    pub yaw: u8,
}

/// Position delta and orientation together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMoveRotate {
    pub id: EntityId,
    pub dx: i16,
    pub dy: i16,
    pub yaw: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityVelocity {
    pub id: EntityId,
    pub velocity: Vec2,
}

/// Initial state of a newly tracked entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpawn {
    pub id: EntityId,
    pub kind: Identifier,
    pub position: Vec2,
    pub yaw: u8,
    pub velocity: Vec2,
}

/// Entities no longer tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRemove {
    pub ids: Vec<EntityId>,
}

/// A tracked property value.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackedValue {
    Bool(bool),
    Byte(u8),
    Int(i32),
    VarInt(u32),
    Float(f32),
    Text(String),
    Id(Uuid),
}

impl TrackedValue {
    /// Wire tag preceding the value.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Byte(_) => 1,
            Self::Int(_) => 2,
            Self::VarInt(_) => 3,
            Self::Float(_) => 4,
            Self::Text(_) => 5,
            Self::Id(_) => 6,
        }
    }
}

/// One changed property.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    pub key: u8,
    pub value: TrackedValue,
}

/// Changed tracked properties of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedDataUpdate {
    pub id: EntityId,
    pub entries: Vec<DataEntry>,
}

/// How a modifier combines with the base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModifierOp {
    /// Added to the base before multipliers.
    Add,
    /// Multiplies the sum of base and additions.
    MultiplyBase,
    /// Multiplies the running total.
    MultiplyTotal,
}

impl ModifierOp {
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Add => 0,
            Self::MultiplyBase => 1,
            Self::MultiplyTotal => 2,
        }
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Add),
            1 => Some(Self::MultiplyBase),
            2 => Some(Self::MultiplyTotal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub id: Uuid,
    pub amount: f64,
    pub operation: ModifierOp,
}

/// Full state of one attribute after a change.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSnapshot {
    pub attribute: Identifier,
    pub base: f64,
    pub modifiers: Vec<Modifier>,
}

impl AttributeSnapshot {
    /// Computes the effective value: `(base + adds) * (1 + sum(mul_base)) * prod(1 + mul_total)`.
    #[must_use]
    pub fn value(&self) -> f64 {
        let mut base = self.base;
        for modifier in &self.modifiers {
            if modifier.operation == ModifierOp::Add {
                base += modifier.amount;
            }
        }
        let mut total = base;
        for modifier in &self.modifiers {
            if modifier.operation == ModifierOp::MultiplyBase {
                total += base * modifier.amount;
            }
        }
        for modifier in &self.modifiers {
            if modifier.operation == ModifierOp::MultiplyTotal {
                total *= 1.0 + modifier.amount;
            }
        }
        total
    }
}

/// Changed attributes of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributesUpdate {
    pub id: EntityId,
    pub attributes: Vec<AttributeSnapshot>,
}

/// A client's own position report.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInput {
    pub position: Vec2,
    pub yaw: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub nonce: u32,
}

/// Several to-server payloads coalesced into one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub items: Vec<Payload>,
}

/// Every payload the protocol carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    EntitySpawn(EntitySpawn),
    EntityRemove(EntityRemove),
    EntityPosition(EntityPosition),
    EntityMove(EntityMove),
    EntityRotate(EntityRotate),
    EntityMoveRotate(EntityMoveRotate),
    EntityVelocity(EntityVelocity),
    TrackedData(TrackedDataUpdate),
    Attributes(AttributesUpdate),
    PlayerInput(PlayerInput),
    KeepAlive(KeepAlive),
    Batch(Batch),
}

impl Payload {
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::EntitySpawn(_) => PayloadKind::EntitySpawn,
            Self::EntityRemove(_) => PayloadKind::EntityRemove,
            Self::EntityPosition(_) => PayloadKind::EntityPosition,
            Self::EntityMove(_) => PayloadKind::EntityMove,
            Self::EntityRotate(_) => PayloadKind::EntityRotate,
            Self::EntityMoveRotate(_) => PayloadKind::EntityMoveRotate,
            Self::EntityVelocity(_) => PayloadKind::EntityVelocity,
            Self::TrackedData(_) => PayloadKind::TrackedData,
            Self::Attributes(_) => PayloadKind::Attributes,
            Self::PlayerInput(_) => PayloadKind::PlayerInput,
            Self::KeepAlive(_) => PayloadKind::KeepAlive,
            Self::Batch(_) => PayloadKind::Batch,
        }
    }

    /// The entity a to-client payload concerns, if it concerns exactly one.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityId> {
        match self {
            Self::EntitySpawn(p) => Some(p.id),
            Self::EntityPosition(p) => Some(p.id),
            Self::EntityMove(p) => Some(p.id),
            Self::EntityRotate(p) => Some(p.id),
            Self::EntityMoveRotate(p) => Some(p.id),
            Self::EntityVelocity(p) => Some(p.id),
            Self::TrackedData(p) => Some(p.id),
            Self::Attributes(p) => Some(p.id),
            Self::EntityRemove(_) | Self::PlayerInput(_) | Self::KeepAlive(_) | Self::Batch(_) => {
                None
            }
        }
    }
}

impl TypedPayload for Payload {
    fn identifier(&self) -> Identifier {
        self.kind().identifier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_valid_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for kind in PayloadKind::ALL {
            let id = kind.identifier();
            id.validate().unwrap();
            assert!(seen.insert(id.clone()), "duplicate {id}");
            assert_eq!(PayloadKind::from_identifier(&id), Some(kind));
        }
    }

    #[test]
    fn foreign_namespace_has_no_kind() {
        let id = Identifier::from_static("other", "entity_move");
        assert_eq!(PayloadKind::from_identifier(&id), None);
    }

    #[test]
    fn directions() {
        assert_eq!(PayloadKind::Batch.direction(), Direction::ToServer);
        assert_eq!(PayloadKind::EntityMove.direction(), Direction::ToClient);
    }

    #[test]
    fn attribute_value_applies_operations_in_order() {
        let snapshot = AttributeSnapshot {
            attribute: Identifier::from_static("game", "speed"),
            base: 10.0,
            modifiers: vec![
                Modifier {
                    id: Uuid::from_u128(1),
                    amount: 0.5,
                    operation: ModifierOp::MultiplyTotal,
                },
                Modifier {
                    id: Uuid::from_u128(2),
                    amount: 2.0,
                    operation: ModifierOp::Add,
                },
                Modifier {
                    id: Uuid::from_u128(3),
                    amount: 1.0,
                    operation: ModifierOp::MultiplyBase,
                },
            ],
        };
        // (10 + 2) = 12; + 12 * 1.0 = 24; * 1.5 = 36
        assert!((snapshot.value() - 36.0).abs() < 1e-12);
    }

    #[test]
    fn payload_entity_accessor() {
        let id = EntityId::from_u128(5);
        let payload = Payload::EntityRotate(EntityRotate { id, yaw: 3 });
        assert_eq!(payload.entity(), Some(id));
        assert_eq!(payload.kind(), PayloadKind::EntityRotate);
        assert_eq!(Payload::KeepAlive(KeepAlive { nonce: 1 }).entity(), None);
    }
}
