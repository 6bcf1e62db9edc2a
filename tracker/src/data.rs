//! Keyed tracked properties with per-key dirty flags.

use std::collections::BTreeMap;

use codec::{DataEntry, TrackedValue};

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    value: TrackedValue,
    dirty: bool,
}

/// Small-integer keyed property store.
///
/// Setting a key to a different value marks it dirty; draining returns the
/// dirty entries in key order and clears only their flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTracker {
    slots: BTreeMap<u8, Slot>,
}

impl DataTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`; returns `true` if the key became dirty.
    pub fn set(&mut self, key: u8, value: TrackedValue) -> bool {
        match self.slots.get_mut(&key) {
            Some(slot) if slot.value == value => false,
            Some(slot) => {
                slot.value = value;
                slot.dirty = true;
                true
            }
            None => {
                self.slots.insert(key, Slot { value, dirty: true });
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: u8) -> Option<&TrackedValue> {
        self.slots.get(&key).map(|slot| &slot.value)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.slots.values().any(|slot| slot.dirty)
    }

    pub fn drain_dirty(&mut self) -> Vec<DataEntry> {
        let mut out = Vec::new();
        for (key, slot) in &mut self.slots {
            if slot.dirty {
                slot.dirty = false;
                out.push(DataEntry {
                    key: *key,
                    value: slot.value.clone(),
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_marks_dirty_only_on_change() {
        let mut data = DataTracker::new();
        assert!(data.set(1, TrackedValue::Byte(3)));
        data.drain_dirty();
        assert!(!data.set(1, TrackedValue::Byte(3)));
        assert!(!data.is_dirty());
        assert!(data.set(1, TrackedValue::Byte(4)));
        assert!(data.is_dirty());
    }

    #[test]
    fn drain_clears_only_drained_flags() {
        let mut data = DataTracker::new();
        data.set(2, TrackedValue::Int(1));
        data.set(0, TrackedValue::Bool(true));
        let drained = data.drain_dirty();
        assert_eq!(drained.iter().map(|e| e.key).collect::<Vec<_>>(), vec![0, 2]);
        assert!(!data.is_dirty());

        data.set(5, TrackedValue::Text("x".into()));
        assert_eq!(data.get(2), Some(&TrackedValue::Int(1)));
        let drained = data.drain_dirty();
        assert_eq!(drained.iter().map(|e| e.key).collect::<Vec<_>>(), vec![5]);
    }
}
