//! Numeric attributes with modifiers and a pending-change set.

use std::collections::{BTreeMap, BTreeSet};

use codec::{AttributeSnapshot, Identifier, Modifier};
use uuid::Uuid;

use crate::entity::HasAttributes;

#[derive(Debug, Clone, PartialEq)]
struct Attribute {
    base: f64,
    modifiers: BTreeMap<Uuid, Modifier>,
}

impl Attribute {
    fn snapshot(&self, id: &Identifier) -> AttributeSnapshot {
        AttributeSnapshot {
            attribute: id.clone(),
            base: self.base,
            modifiers: self.modifiers.values().cloned().collect(),
        }
    }
}

/// Attribute values of one entity.
///
/// Every mutation that changes an attribute marks it pending; the tracker
/// drains pending attributes as full snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeContainer {
    attributes: BTreeMap<Identifier, Attribute>,
    pending: BTreeSet<Identifier>,
}

impl AttributeContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base value, creating the attribute if needed.
    pub fn set_base(&mut self, id: Identifier, base: f64) {
        match self.attributes.get_mut(&id) {
            Some(attribute) if attribute.base.to_bits() == base.to_bits() => return,
            Some(attribute) => attribute.base = base,
            None => {
                self.attributes.insert(
                    id.clone(),
                    Attribute {
                        base,
                        modifiers: BTreeMap::new(),
                    },
                );
            }
        }
        self.pending.insert(id);
    }

    /// Adds or replaces a modifier. Returns `false` if the attribute does not exist.
    pub fn add_modifier(&mut self, id: &Identifier, modifier: Modifier) -> bool {
        let Some(attribute) = self.attributes.get_mut(id) else {
            return false;
        };
        if attribute.modifiers.get(&modifier.id) == Some(&modifier) {
            return true;
        }
        attribute.modifiers.insert(modifier.id, modifier);
        self.pending.insert(id.clone());
        true
    }

    /// Removes a modifier by id, returning it if it was present.
    pub fn remove_modifier(&mut self, id: &Identifier, modifier: Uuid) -> Option<Modifier> {
        let removed = self.attributes.get_mut(id)?.modifiers.remove(&modifier)?;
        self.pending.insert(id.clone());
        Some(removed)
    }

    /// Effective value after applying modifiers.
    #[must_use]
    pub fn value(&self, id: &Identifier) -> Option<f64> {
        self.snapshot(id).map(|snapshot| snapshot.value())
    }

    #[must_use]
    pub fn snapshot(&self, id: &Identifier) -> Option<AttributeSnapshot> {
        self.attributes.get(id).map(|attribute| attribute.snapshot(id))
    }

    /// Snapshots of every attribute, for spawn-time state.
    #[must_use]
    pub fn snapshots(&self) -> Vec<AttributeSnapshot> {
        self.attributes
            .iter()
            .map(|(id, attribute)| attribute.snapshot(id))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl HasAttributes for AttributeContainer {
    fn has_pending_attributes(&self) -> bool {
        !self.pending.is_empty()
    }

    fn drain_pending_attributes(&mut self) -> Vec<AttributeSnapshot> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .iter()
            .filter_map(|id| self.snapshot(id))
            .collect()
    }
}
