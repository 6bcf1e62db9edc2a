//! Core value types shared by payloads, trackers and replicas.

use std::f64::consts::TAU;
use std::fmt;
use std::ops::{Add, Mul, Sub};

use uuid::Uuid;

/// A stable entity identifier.
///
/// Assigned by the simulation layer; stable for the lifetime of an entity
/// and encoded as 16 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates an entity ID from a UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Creates an entity ID from a raw 128-bit value.
    #[must_use]
    pub const fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }

    /// Creates a random (v4) entity ID.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn raw(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<EntityId> for Uuid {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A 2D vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.x.mul_add(self.x, self.y * self.y)
    }

    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Quantizes a yaw in radians to a byte: `floor(normalized * 256 / 2pi)`.
///
/// The yaw is first normalized to `[0, 2pi)`; a value that rounds up to 256
/// wraps to 0.
#[must_use]
pub fn quantize_yaw(yaw: f64) -> u8 {
    let normalized = yaw.rem_euclid(TAU);
    let scaled = (normalized * 256.0 / TAU).floor();
    ((scaled as i64) & 0xFF) as u8
}

/// Inverse of [`quantize_yaw`] at byte resolution.
#[must_use]
pub fn dequantize_yaw(byte: u8) -> f64 {
    f64::from(byte) * TAU / 256.0
}
