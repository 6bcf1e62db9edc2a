use codec::{EntityId, Identifier, Vec2};
use proptest::prelude::*;
use tracker::{
    EntityTrackerEntry, ReplicaWorld, SimEntity, TrackedEntity, TrackedPosition, TrackerConfig,
};

#[derive(Clone, Debug)]
struct Step {
    dx: f64,
    dy: f64,
    yaw: f64,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        // Mostly sub-unit movement.
        4 => (-0.8f64..0.8, -0.8f64..0.8, -7.0f64..7.0)
            .prop_map(|(dx, dy, yaw)| Step { dx, dy, yaw }),
        // Jitter below the move threshold.
        3 => (-0.001f64..0.001, -0.001f64..0.001)
            .prop_map(|(dx, dy)| Step { dx, dy, yaw: 0.0 }),
        // Teleports that overflow the relative range.
        1 => (-50.0f64..50.0, -50.0f64..50.0, -7.0f64..7.0)
            .prop_map(|(dx, dy, yaw)| Step { dx, dy, yaw }),
    ]
}

proptest! {
    #[test]
    fn with_delta_matches_packed_target(
        start in (-1.0e5f64..1.0e5, -1.0e5f64..1.0e5),
        dx in any::<i16>(),
        dy in any::<i16>(),
    ) {
        let tracked = TrackedPosition::new(Vec2::new(start.0, start.1));
        let rebuilt = tracked.with_delta(i64::from(dx), i64::from(dy));
        prop_assert_eq!(
            TrackedPosition::pack(rebuilt.x),
            TrackedPosition::pack(start.0) + i64::from(dx)
        );
        prop_assert_eq!(
            TrackedPosition::pack(rebuilt.y),
            TrackedPosition::pack(start.1) + i64::from(dy)
        );
    }

    #[test]
    fn replica_never_drifts_from_sender(
        origin in (-1000.0f64..1000.0, -1000.0f64..1000.0),
        steps in prop::collection::vec(step_strategy(), 1..300),
    ) {
        let mut entity = SimEntity::new(
            EntityId::from_u128(1),
            Identifier::from_static("game", "walker"),
            Vec2::new(origin.0, origin.1),
        );
        let mut entry = EntityTrackerEntry::new(&mut entity, TrackerConfig::default());
        let mut world = ReplicaWorld::new();
        world.apply(&entry.spawn_payload(&entity)).unwrap();

        for step in &steps {
            let pos = entity.position();
            entity.set_position(Vec2::new(pos.x + step.dx, pos.y + step.dy));
            entity.set_yaw(entity.yaw() + step.yaw);

            let mut out = Vec::new();
            entry.tick(&mut entity, &mut out);
            for payload in &out {
                world.apply(payload).unwrap();
            }

            let replica = world.get(entity.id()).unwrap();
            let sent = entry.tracked_position().pos();
            prop_assert_eq!(
                TrackedPosition::pack(replica.position().x),
                TrackedPosition::pack(sent.x)
            );
            prop_assert_eq!(
                TrackedPosition::pack(replica.position().y),
                TrackedPosition::pack(sent.y)
            );
            prop_assert_eq!(replica.yaw_byte(), entry.last_yaw());
        }

        let replica = world.get(entity.id()).unwrap();
        let live = entity.position();
        let lag = replica.position().distance_squared(live).sqrt();
        prop_assert!(lag < 0.01, "replica lags by {}", lag);
    }
}
