//! A ready-made tracked entity backed by the concrete dirty containers.

use codec::{DataEntry, EntityId, Identifier, TrackedValue, Vec2};

use crate::attributes::AttributeContainer;
use crate::data::DataTracker;
use crate::entity::{HasAttributes, HasVelocity, TrackedEntity};

/// Velocity with a dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Motion {
    velocity: Vec2,
    dirty: bool,
}

impl Motion {
    pub fn set(&mut self, velocity: Vec2) {
        if self.velocity != velocity {
            self.velocity = velocity;
            self.dirty = true;
        }
    }
}

impl HasVelocity for Motion {
    fn velocity(&self) -> Vec2 {
        self.velocity
    }

    fn velocity_dirty(&self) -> bool {
        self.dirty
    }

    fn clear_velocity_dirty(&mut self) {
        self.dirty = false;
    }
}

/// Simulation entity with position, yaw, tracked data and optional
/// velocity and attribute capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct SimEntity {
    id: EntityId,
    kind: Identifier,
    position: Vec2,
    yaw: f64,
    data: DataTracker,
    motion: Option<Motion>,
    attributes: Option<AttributeContainer>,
}

impl SimEntity {
    #[must_use]
    pub fn new(id: EntityId, kind: Identifier, position: Vec2) -> Self {
        Self {
            id,
            kind,
            position,
            yaw: 0.0,
            data: DataTracker::new(),
            motion: None,
            attributes: None,
        }
    }

    /// Enables the velocity capability.
    #[must_use]
    pub fn with_velocity(mut self) -> Self {
        self.motion = Some(Motion::default());
        self
    }

    /// Enables the attribute capability.
    #[must_use]
    pub fn with_attributes(mut self) -> Self {
        self.attributes = Some(AttributeContainer::new());
        self
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn set_yaw(&mut self, yaw: f64) {
        self.yaw = yaw;
    }

    /// Sets the velocity; ignored without the velocity capability.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        if let Some(motion) = &mut self.motion {
            motion.set(velocity);
        }
    }

    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.motion.map_or(Vec2::ZERO, |motion| motion.velocity)
    }

    /// Moves by the current velocity.
    pub fn step(&mut self) {
        self.position = self.position + self.velocity();
    }

    pub fn set_data(&mut self, key: u8, value: TrackedValue) -> bool {
        self.data.set(key, value)
    }

    #[must_use]
    pub fn data(&self) -> &DataTracker {
        &self.data
    }

    #[must_use]
    pub fn attributes(&self) -> Option<&AttributeContainer> {
        self.attributes.as_ref()
    }

    pub fn attributes_mut(&mut self) -> Option<&mut AttributeContainer> {
        self.attributes.as_mut()
    }
}

impl TrackedEntity for SimEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> Identifier {
        self.kind.clone()
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn yaw(&self) -> f64 {
        self.yaw
    }

    fn has_dirty_data(&self) -> bool {
        self.data.is_dirty()
    }

    fn drain_dirty_data(&mut self) -> Vec<DataEntry> {
        self.data.drain_dirty()
    }

    fn as_velocity(&mut self) -> Option<&mut dyn HasVelocity> {
        self.motion.as_mut().map(|motion| motion as &mut dyn HasVelocity)
    }

    fn as_attributes(&mut self) -> Option<&mut dyn HasAttributes> {
        self.attributes
            .as_mut()
            .map(|attributes| attributes as &mut dyn HasAttributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zombie() -> SimEntity {
        SimEntity::new(
            EntityId::from_u128(1),
            Identifier::from_static("game", "zombie"),
            Vec2::new(1.0, 2.0),
        )
    }

    #[test]
    fn capabilities_are_opt_in() {
        let mut plain = zombie();
        assert!(plain.as_velocity().is_none());
        assert!(plain.as_attributes().is_none());

        let mut full = zombie().with_velocity().with_attributes();
        assert!(full.as_velocity().is_some());
        assert!(full.as_attributes().is_some());
    }

    #[test]
    fn velocity_changes_mark_dirty() {
        let mut entity = zombie().with_velocity();
        entity.set_velocity(Vec2::new(0.5, 0.0));
        assert!(entity.as_velocity().unwrap().velocity_dirty());
        entity.as_velocity().unwrap().clear_velocity_dirty();
        entity.set_velocity(Vec2::new(0.5, 0.0));
        assert!(!entity.as_velocity().unwrap().velocity_dirty());
    }

    #[test]
    fn step_applies_velocity() {
        let mut entity = zombie().with_velocity();
        entity.set_velocity(Vec2::new(0.5, -1.0));
        entity.step();
        assert_eq!(entity.position(), Vec2::new(1.5, 1.0));

        let mut still = zombie();
        still.set_velocity(Vec2::new(3.0, 3.0));
        still.step();
        assert_eq!(still.position(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn data_flows_through_trait() {
        let mut entity = zombie();
        entity.set_data(0, TrackedValue::Bool(true));
        assert!(entity.has_dirty_data());
        assert_eq!(entity.drain_dirty_data().len(), 1);
        assert!(!entity.has_dirty_data());
    }
}
