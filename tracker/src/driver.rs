//! Owns the tracker entries of one server and ticks them.

use std::collections::{BTreeMap, BTreeSet};

use codec::{EntityId, EntityRemove, Payload};
use log::{debug, warn};

use crate::config::{TrackerConfig, MAX_REMOVALS_PER_PAYLOAD};
use crate::entity::{PayloadSink, TrackedEntity};
use crate::entry::{EntityTrackerEntry, PositionSync, TickOutcome};

/// Cumulative counters over every tick the driver ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverStats {
    pub ticks: u64,
    pub evaluated: u64,
    pub spawned: u64,
    pub removed: u64,
    pub absolute: u64,
    pub relative: u64,
    pub rotate: u64,
    pub move_rotate: u64,
    pub velocity: u64,
    pub data: u64,
    pub attributes: u64,
}

impl DriverStats {
    fn record(&mut self, outcome: &TickOutcome) {
        if !outcome.evaluated {
            return;
        }
        self.evaluated += 1;
        match outcome.position {
            Some(PositionSync::Absolute) => self.absolute += 1,
            Some(PositionSync::Relative) => self.relative += 1,
            Some(PositionSync::Rotate) => self.rotate += 1,
            Some(PositionSync::MoveRotate) => self.move_rotate += 1,
            None => {}
        }
        self.velocity += u64::from(outcome.velocity);
        self.data += u64::from(outcome.data_entries > 0);
        self.attributes += u64::from(outcome.attributes > 0);
    }

    /// Position and orientation payloads of every kind.
    #[must_use]
    pub const fn position_syncs(&self) -> u64 {
        self.absolute + self.relative + self.rotate + self.move_rotate
    }
}

/// Replication driver: one [`EntityTrackerEntry`] per tracked entity.
///
/// Entities stay owned by the simulation; the driver only keeps per-entity
/// replication state keyed by id.
#[derive(Debug, Default)]
pub struct ReplicationDriver {
    default_config: TrackerConfig,
    entries: BTreeMap<EntityId, EntityTrackerEntry>,
    pending_removals: BTreeSet<EntityId>,
    stats: DriverStats,
}

impl ReplicationDriver {
    #[must_use]
    pub fn new(default_config: TrackerConfig) -> Self {
        Self {
            default_config,
            ..Self::default()
        }
    }

    /// Starts tracking with the default config and emits the spawn payload.
    ///
    /// Returns `false` if the entity is already tracked.
    pub fn start_tracking<E, S>(&mut self, entity: &mut E, sink: &mut S) -> bool
    where
        E: TrackedEntity + ?Sized,
        S: PayloadSink + ?Sized,
    {
        let config = self.default_config.clone();
        self.start_tracking_with(entity, config, sink)
    }

    pub fn start_tracking_with<E, S>(
        &mut self,
        entity: &mut E,
        config: TrackerConfig,
        sink: &mut S,
    ) -> bool
    where
        E: TrackedEntity + ?Sized,
        S: PayloadSink + ?Sized,
    {
        let id = entity.id();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.pending_removals.remove(&id);
        let entry = EntityTrackerEntry::new(entity, config);
        sink.emit(entry.spawn_payload(entity));
        debug!("tracking entity {id}");
        self.entries.insert(id, entry);
        self.stats.spawned += 1;
        true
    }

    /// Stops tracking; the removal goes out with the next tick.
    pub fn stop_tracking(&mut self, id: EntityId) -> bool {
        if self.entries.remove(&id).is_none() {
            return false;
        }
        self.pending_removals.insert(id);
        true
    }

    /// Ticks every tracked entity found in `entities`.
    ///
    /// Removals queued since the last tick are emitted first, coalesced into
    /// `EntityRemove` payloads of at most [`MAX_REMOVALS_PER_PAYLOAD`] ids.
    /// Untracked entities are skipped.
    pub fn tick<'a, E, I, S>(&mut self, entities: I, sink: &mut S) -> usize
    where
        E: TrackedEntity + ?Sized + 'a,
        I: IntoIterator<Item = &'a mut E>,
        S: PayloadSink + ?Sized,
    {
        self.stats.ticks += 1;
        let mut emitted = 0;

        if !self.pending_removals.is_empty() {
            let ids: Vec<EntityId> = std::mem::take(&mut self.pending_removals)
                .into_iter()
                .collect();
            self.stats.removed += ids.len() as u64;
            for chunk in ids.chunks(MAX_REMOVALS_PER_PAYLOAD) {
                sink.emit(Payload::EntityRemove(EntityRemove {
                    ids: chunk.to_vec(),
                }));
                emitted += 1;
            }
        }

        let mut seen = 0;
        for entity in entities {
            let Some(entry) = self.entries.get_mut(&entity.id()) else {
                continue;
            };
            seen += 1;
            let outcome = entry.tick(entity, sink);
            self.stats.record(&outcome);
            emitted += outcome.payloads();
        }
        if seen < self.entries.len() {
            warn!(
                "{} tracked entities missing from tick",
                self.entries.len() - seen
            );
        }
        emitted
    }

    #[must_use]
    pub fn is_tracking(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn entry(&self, id: EntityId) -> Option<&EntityTrackerEntry> {
        self.entries.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn stats(&self) -> &DriverStats {
        &self.stats
    }
}
