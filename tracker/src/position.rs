//! Fixed-point reference position shared by sender and receiver.

use codec::Vec2;

/// Fixed-point units per world unit.
pub const POSITION_SCALE: f64 = 4096.0;

/// The last position for which a sync was sent (server) or received (client).
///
/// Deltas are computed and applied in 1/4096 fixed-point units with integer
/// arithmetic, so a receiver that applies every delta it is sent lands on
/// exactly the sender's packed position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackedPosition {
    pos: Vec2,
}

impl TrackedPosition {
    #[must_use]
    pub const fn new(pos: Vec2) -> Self {
        Self { pos }
    }

    #[must_use]
    pub const fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn set_pos(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    /// `round(value * 4096)`, halves away from zero.
    #[must_use]
    pub fn pack(value: f64) -> i64 {
        (value * POSITION_SCALE).round() as i64
    }

    #[must_use]
    pub fn unpack(value: i64) -> f64 {
        value as f64 / POSITION_SCALE
    }

    /// Position reached by applying a packed delta to the stored position.
    #[must_use]
    pub fn with_delta(&self, dx: i64, dy: i64) -> Vec2 {
        Vec2::new(
            Self::unpack(Self::pack(self.pos.x) + dx),
            Self::unpack(Self::pack(self.pos.y) + dy),
        )
    }

    #[must_use]
    pub fn delta_x(&self, pos: Vec2) -> i64 {
        Self::pack(pos.x) - Self::pack(self.pos.x)
    }

    #[must_use]
    pub fn delta_y(&self, pos: Vec2) -> i64 {
        Self::pack(pos.y) - Self::pack(self.pos.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_rounds_to_nearest() {
        assert_eq!(TrackedPosition::pack(100.0), 409_600);
        assert_eq!(TrackedPosition::pack(100.6), 412_058);
        assert_eq!(TrackedPosition::pack(-0.5 / POSITION_SCALE), -1);
        assert_eq!(TrackedPosition::pack(0.4 / POSITION_SCALE), 0);
    }

    #[test]
    fn delta_of_documented_move() {
        let tracked = TrackedPosition::new(Vec2::new(100.0, 200.0));
        let live = Vec2::new(100.6, 200.0);
        assert_eq!(tracked.delta_x(live), 2458);
        assert_eq!(tracked.delta_y(live), 0);

        let rebuilt = tracked.with_delta(2458, 0);
        assert!((rebuilt.x - 100.6).abs() <= 1.0 / POSITION_SCALE);
        assert!((rebuilt.y - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn with_delta_uses_integer_addition() {
        let tracked = TrackedPosition::new(Vec2::new(0.1, 0.2));
        let pos = tracked.with_delta(3, -7);
        assert_eq!(TrackedPosition::pack(pos.x), TrackedPosition::pack(0.1) + 3);
        assert_eq!(TrackedPosition::pack(pos.y), TrackedPosition::pack(0.2) - 7);
    }

    #[test]
    fn set_pos_overwrites() {
        let mut tracked = TrackedPosition::default();
        tracked.set_pos(Vec2::new(5.0, 6.0));
        assert_eq!(tracked.pos(), Vec2::new(5.0, 6.0));
        assert_eq!(tracked.delta_x(Vec2::new(5.0, 6.0)), 0);
    }
}
