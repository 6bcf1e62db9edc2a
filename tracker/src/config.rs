//! Tracker configuration and decision thresholds.

/// Squared distance that makes a move worth a relative update (`(1/362)^2`).
pub const MOVE_THRESHOLD_SQ: f64 = 7.629_394_5e-6;

/// A relative update is considered at least this often, in ticks.
pub const RESYNC_INTERVAL: u64 = 60;

/// Consecutive non-absolute updates before an absolute resync is forced.
pub const MAX_RELATIVE_UPDATES: u32 = 400;

/// Squared velocity change that is worth sending.
pub const VELOCITY_EPSILON_SQ: f64 = 1e-7;

/// Entity ids carried by one `EntityRemove`.
///
/// 128 ids encode to a 2074-byte broadcast frame, inside the default
/// 4096-byte frame limit.
pub const MAX_REMOVALS_PER_PAYLOAD: usize = 128;

/// Per-entry tracker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerConfig {
    /// Evaluate position and yaw every `tick_interval` ticks. Zero is treated as one.
    pub tick_interval: u32,

    /// Check velocity on every evaluated tick, not only when it is flagged dirty.
    pub always_track_velocity: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval: 1,
            always_track_velocity: false,
        }
    }
}

impl TrackerConfig {
    /// Settings for fast-moving projectiles: every tick, velocity always checked.
    #[must_use]
    pub const fn projectile() -> Self {
        Self {
            tick_interval: 1,
            always_track_velocity: true,
        }
    }

    /// Settings for slow or static entities evaluated every `interval` ticks.
    #[must_use]
    pub const fn sparse(interval: u32) -> Self {
        Self {
            tick_interval: interval,
            always_track_velocity: false,
        }
    }

    pub(crate) fn effective_interval(&self) -> u64 {
        u64::from(self.tick_interval.max(1))
    }
}
