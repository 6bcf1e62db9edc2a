use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use channel::{
    ChannelConfig, ChannelEvent, ClientConnection, MemoryTransport, Relay, RelayConfig,
    ServerConnection,
};
use clap::Parser;
use codec::{
    default_registries, encode_frame, quantize_yaw, Dispatcher, EntityId, Identifier, KeepAlive,
    Modifier, ModifierOp, Payload, PayloadRegistries, PlayerInput, Route, TrackedValue, Vec2,
    WireLimits,
};
use log::{debug, info};
use serde::Serialize;
use tracker::{
    install_handlers, ReplicaWorld, ReplicationDriver, SimEntity, TrackedEntity, TrackedPosition,
    TrackerConfig,
};
use uuid::Uuid;

const WALKER: Identifier = Identifier::from_static("demo", "walker");
const SPEED: Identifier = Identifier::from_static("demo", "speed");
const HEALTH_KEY: u8 = 0;
const WORLD_HALF_EXTENT: f64 = 64.0;
const MAX_SPEED: f64 = 0.4;

#[derive(Parser)]
#[command(
    name = "demo-sim",
    version,
    about = "Deterministic in-memory replication demo"
)]
struct Cli {
    /// Number of simulated entities.
    #[arg(long, default_value_t = 16)]
    entities: u32,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 300)]
    ticks: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Evaluate each tracker every N ticks.
    #[arg(long, default_value_t = 1)]
    tick_interval: u32,
    /// Optional teleport cadence; teleports force absolute resyncs.
    #[arg(long)]
    teleport_every: Option<u32>,
    /// Output directory for frame captures and the summary.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Fail if p95 bytes per tick exceed this value.
    #[arg(long)]
    max_p95_tick_bytes: Option<u64>,
    /// Fail if average bytes per tick exceed this value.
    #[arg(long)]
    max_avg_tick_bytes: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(out_dir) = &cli.out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("create output dir {}", out_dir.display()))?;
    }

    let summary = run(&cli)?;
    summary.assert_budgets(cli.max_p95_tick_bytes, cli.max_avg_tick_bytes)?;
    let contents = serde_json::to_string_pretty(&summary).context("serialize summary")?;
    match &cli.out_dir {
        Some(out_dir) => {
            let path = out_dir.join("summary.json");
            fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        }
        None => println!("{contents}"),
    }
    Ok(())
}

struct Session {
    relay: Relay,
    server: ServerConnection<MemoryTransport>,
    client: ClientConnection<MemoryTransport>,
    host_session: u8,
}

fn connect(registries: &Arc<PayloadRegistries>, now: Instant) -> Result<Session> {
    let relay = Relay::new(RelayConfig::default());

    let mut server = ServerConnection::new(
        relay.transport(),
        Uuid::from_u128(1),
        Arc::clone(registries),
        ChannelConfig::default(),
    );
    server.connect(&relay.address(), now).context("connect host")?;
    let host_session = expect_connected(server.poll(now), "host")?;

    let mut client = ClientConnection::new(
        relay.transport(),
        Uuid::from_u128(2),
        Arc::clone(registries),
        ChannelConfig::default(),
    );
    client.connect(&relay.address(), now).context("connect client")?;
    let client_session = expect_connected(client.poll(now), "client")?;
    info!("host on session {host_session}, client on session {client_session}");

    Ok(Session {
        relay,
        server,
        client,
        host_session,
    })
}

fn expect_connected(events: Vec<ChannelEvent>, who: &str) -> Result<u8> {
    events
        .iter()
        .find_map(|event| match event {
            ChannelEvent::Connected { session_id } => Some(*session_id),
            _ => None,
        })
        .with_context(|| format!("{who} handshake did not complete: {events:?}"))
}

fn run(cli: &Cli) -> Result<Summary> {
    let registries = Arc::new(default_registries().context("build payload registries")?);
    let limits = WireLimits::default();
    let now = Instant::now();
    let mut session = connect(&registries, now)?;

    let mut dispatcher = Dispatcher::new();
    install_handlers(&mut dispatcher);
    let mut world = ReplicaWorld::new();

    let mut rng = Rng::new(cli.seed);
    let mut entities = init_entities(cli.entities, &mut rng);
    let mut driver = ReplicationDriver::new(TrackerConfig::sparse(cli.tick_interval));
    let mut summary = Summary::new(cli);

    let mut outbox = Vec::new();
    for entity in &mut entities {
        driver.start_tracking(entity, &mut outbox);
    }
    let spawn_bytes = send_all(&mut session, &registries, &limits, &outbox, 0, cli, &mut summary)?;
    summary.spawn_bytes = spawn_bytes as u64;
    deliver(&mut session, &mut dispatcher, &mut world, now, 0)?;

    for tick in 1..=cli.ticks {
        step_entities(&mut entities, &mut rng, tick, cli.teleport_every);

        outbox.clear();
        driver.tick(entities.iter_mut(), &mut outbox);
        let tick_bytes = send_all(
            &mut session,
            &registries,
            &limits,
            &outbox,
            tick,
            cli,
            &mut summary,
        )?;
        summary.push_tick(tick_bytes as u64);
        deliver(&mut session, &mut dispatcher, &mut world, now, tick)?;

        let lag = validate_replicas(&driver, &world, &entities, tick)?;
        summary.max_lag = summary.max_lag.max(lag);

        if let Some(lead) = entities.first() {
            let client = &mut session.client;
            client.queue(Payload::PlayerInput(PlayerInput {
                position: lead.position(),
                yaw: quantize_yaw(lead.yaw()),
            }))?;
            client.queue(Payload::KeepAlive(KeepAlive { nonce: tick }))?;
            let report = client.flush().context("flush client queue")?;
            summary.client_bytes += report.bytes as u64;
        }
        for event in session.server.poll(now) {
            if let ChannelEvent::Payload(envelope) = event {
                debug!(
                    "host received {:?} from session {}",
                    envelope.payload.kind(),
                    envelope.origin.session_id
                );
                summary.client_payloads += match &envelope.payload {
                    Payload::Batch(batch) => batch.items.len() as u64,
                    _ => 1,
                };
            }
        }
    }

    summary.finalize(&driver, &world, session.relay.stats().frames_routed);
    Ok(summary)
}

/// Broadcasts every payload, cross-checking each frame with the tools decoder.
fn send_all(
    session: &mut Session,
    registries: &PayloadRegistries,
    limits: &WireLimits,
    payloads: &[Payload],
    tick: u32,
    cli: &Cli,
    summary: &mut Summary,
) -> Result<usize> {
    let mut total = 0;
    for (index, payload) in payloads.iter().enumerate() {
        let kind = payload.kind();
        let host = session.host_session;
        let frame = encode_frame(registries, &Route::Broadcast, host, payload, limits)
            .with_context(|| format!("encode {kind:?} at tick {tick}"))?;
        tools::decode_frame_json(&frame, registries, limits)
            .with_context(|| format!("tools decode {kind:?} at tick {tick}"))?;
        if let Some(out_dir) = &cli.out_dir {
            let name = format!("tick_{tick:06}_{index:03}_{}.bin", kind.path());
            write_frame(&out_dir.join(name), &frame)?;
        }

        let sent = session
            .server
            .send(payload)
            .with_context(|| format!("send {kind:?} at tick {tick}"))?;
        if sent != frame.len() {
            anyhow::bail!("{kind:?} sent {sent} bytes, encoder produced {}", frame.len());
        }
        summary.record(kind.path(), sent);
        total += sent;
    }
    Ok(total)
}

fn write_frame(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

fn deliver(
    session: &mut Session,
    dispatcher: &mut Dispatcher<ReplicaWorld>,
    world: &mut ReplicaWorld,
    now: Instant,
    tick: u32,
) -> Result<()> {
    for event in session.client.poll(now) {
        match event {
            ChannelEvent::Payload(envelope) => {
                let report = dispatcher.dispatch(world, &envelope);
                if !report.is_clean() {
                    anyhow::bail!(
                        "tick {tick}: replica rejected {:?}: {:?}",
                        envelope.payload.kind(),
                        report.failures
                    );
                }
            }
            ChannelEvent::Disconnected => anyhow::bail!("client disconnected at tick {tick}"),
            _ => {}
        }
    }
    Ok(())
}

/// Checks that every replica matches its tracker's last sent state and
/// returns the largest distance between a replica and its live entity.
fn validate_replicas(
    driver: &ReplicationDriver,
    world: &ReplicaWorld,
    entities: &[SimEntity],
    tick: u32,
) -> Result<f64> {
    let mut max_lag: f64 = 0.0;
    for entity in entities {
        let id = entity.id();
        let entry = driver
            .entry(id)
            .with_context(|| format!("entity {id} is not tracked"))?;
        let replica = world
            .get(id)
            .with_context(|| format!("tick {tick}: no replica for {id}"))?;
        let sent = entry.tracked_position().pos();
        let seen = replica.position();
        let packed = |v: Vec2| (TrackedPosition::pack(v.x), TrackedPosition::pack(v.y));
        if packed(sent) != packed(seen) {
            anyhow::bail!("tick {tick}: replica {id} drifted: sent {sent:?}, replica {seen:?}");
        }
        if replica.yaw_byte() != entry.last_yaw() {
            anyhow::bail!(
                "tick {tick}: replica {id} yaw {} != sent {}",
                replica.yaw_byte(),
                entry.last_yaw()
            );
        }
        max_lag = max_lag.max(seen.distance_squared(entity.position()).sqrt());
    }
    Ok(max_lag)
}

fn init_entities(count: u32, rng: &mut Rng) -> Vec<SimEntity> {
    (0..count)
        .map(|index| {
            let position = Vec2::new(
                rng.range_f64(-WORLD_HALF_EXTENT / 2.0, WORLD_HALF_EXTENT / 2.0),
                rng.range_f64(-WORLD_HALF_EXTENT / 2.0, WORLD_HALF_EXTENT / 2.0),
            );
            let id = EntityId::from_u128(u128::from(index) + 1);
            let mut entity = SimEntity::new(id, WALKER, position)
                .with_velocity()
                .with_attributes();
            entity.set_velocity(random_velocity(rng));
            entity.set_yaw(rng.range_f64(0.0, std::f64::consts::TAU));
            entity.set_data(HEALTH_KEY, TrackedValue::Int(20));
            if let Some(attributes) = entity.attributes_mut() {
                attributes.set_base(SPEED, 0.1);
            }
            entity
        })
        .collect()
}

fn random_velocity(rng: &mut Rng) -> Vec2 {
    Vec2::new(
        rng.range_f64(-MAX_SPEED, MAX_SPEED),
        rng.range_f64(-MAX_SPEED, MAX_SPEED),
    )
}

fn step_entities(entities: &mut [SimEntity], rng: &mut Rng, tick: u32, teleport: Option<u32>) {
    let teleport_now = teleport.is_some_and(|every| every > 0 && tick % every == 0);
    for (index, entity) in entities.iter_mut().enumerate() {
        if rng.next_u32() % 20 == 0 {
            entity.set_velocity(random_velocity(rng));
        }
        // One tick in eight the entity stands still.
        if rng.next_u32() % 8 != 0 {
            entity.step();
        }

        let Vec2 { mut x, mut y } = entity.position();
        let mut velocity = entity.velocity();
        if x.abs() > WORLD_HALF_EXTENT {
            x = x.clamp(-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT);
            velocity.x = -velocity.x;
        }
        if y.abs() > WORLD_HALF_EXTENT {
            y = y.clamp(-WORLD_HALF_EXTENT, WORLD_HALF_EXTENT);
            velocity.y = -velocity.y;
        }
        entity.set_position(Vec2::new(x, y));
        entity.set_velocity(velocity);

        if rng.next_u32() % 4 == 0 {
            let turn = rng.range_f64(-0.3, 0.3);
            entity.set_yaw((entity.yaw() + turn).rem_euclid(std::f64::consts::TAU));
        }
        if teleport_now && index % 4 == 0 {
            let jump = if x > 0.0 { -WORLD_HALF_EXTENT / 2.0 } else { WORLD_HALF_EXTENT / 2.0 };
            entity.set_position(Vec2::new(x + jump, y));
        }
        if rng.next_u32() % 50 == 0 {
            let health = i32::try_from(rng.next_u32() % 21).unwrap_or(20);
            entity.set_data(HEALTH_KEY, TrackedValue::Int(health));
        }
        if rng.next_u32() % 100 == 0 {
            let boost = Modifier {
                id: Uuid::from_u128(u128::from(rng.next_u32()) + 1),
                amount: 0.2,
                operation: ModifierOp::MultiplyBase,
            };
            if let Some(attributes) = entity.attributes_mut() {
                attributes.add_modifier(&SPEED, boost);
            }
        }
    }
}

struct Rng {
    state: u64,
}

impl Rng {
    const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        let unit = f64::from(self.next_u32()) / f64::from(u32::MAX);
        (max - min).mul_add(unit, min)
    }
}

#[derive(Debug, Default, Serialize)]
struct KindBytes {
    count: u64,
    bytes: u64,
}

#[derive(Debug, Serialize)]
struct Summary {
    entities: u32,
    ticks: u32,
    seed: u64,
    tick_interval: u32,
    teleport_every: Option<u32>,
    spawn_bytes: u64,
    tick_bytes_total: u64,
    avg_bytes_per_tick: u64,
    p95_bytes_per_tick: u64,
    client_bytes: u64,
    client_payloads: u64,
    relay_frames: u64,
    replicas: usize,
    payloads_applied: u64,
    absolute_syncs: u64,
    relative_syncs: u64,
    max_lag: f64,
    by_kind: BTreeMap<&'static str, KindBytes>,
    #[serde(skip)]
    tick_sizes: Vec<u64>,
}

impl Summary {
    fn new(cli: &Cli) -> Self {
        Self {
            entities: cli.entities,
            ticks: cli.ticks,
            seed: cli.seed,
            tick_interval: cli.tick_interval,
            teleport_every: cli.teleport_every,
            spawn_bytes: 0,
            tick_bytes_total: 0,
            avg_bytes_per_tick: 0,
            p95_bytes_per_tick: 0,
            client_bytes: 0,
            client_payloads: 0,
            relay_frames: 0,
            replicas: 0,
            payloads_applied: 0,
            absolute_syncs: 0,
            relative_syncs: 0,
            max_lag: 0.0,
            by_kind: BTreeMap::new(),
            tick_sizes: Vec::new(),
        }
    }

    fn record(&mut self, kind: &'static str, bytes: usize) {
        let entry = self.by_kind.entry(kind).or_default();
        entry.count += 1;
        entry.bytes += bytes as u64;
    }

    fn push_tick(&mut self, bytes: u64) {
        self.tick_bytes_total += bytes;
        self.tick_sizes.push(bytes);
    }

    fn finalize(&mut self, driver: &ReplicationDriver, world: &ReplicaWorld, relay_frames: u64) {
        let stats = driver.stats();
        self.absolute_syncs = stats.absolute;
        self.relative_syncs = stats.relative + stats.move_rotate;
        self.replicas = world.len();
        self.payloads_applied = world.applied();
        self.relay_frames = relay_frames;
        if !self.tick_sizes.is_empty() {
            self.avg_bytes_per_tick = self.tick_bytes_total / self.tick_sizes.len() as u64;
            self.tick_sizes.sort_unstable();
            let idx = ((self.tick_sizes.len() as f64) * 0.95).ceil() as usize;
            let idx = idx.saturating_sub(1).min(self.tick_sizes.len() - 1);
            self.p95_bytes_per_tick = self.tick_sizes[idx];
        }
    }

    fn assert_budgets(&self, max_p95: Option<u64>, max_avg: Option<u64>) -> Result<()> {
        if let Some(max_p95) = max_p95 {
            if self.p95_bytes_per_tick > max_p95 {
                anyhow::bail!(
                    "p95 bytes per tick {} exceeds budget {}",
                    self.p95_bytes_per_tick,
                    max_p95
                );
            }
        }
        if let Some(max_avg) = max_avg {
            if self.avg_bytes_per_tick > max_avg {
                anyhow::bail!(
                    "avg bytes per tick {} exceeds budget {}",
                    self.avg_bytes_per_tick,
                    max_avg
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(ticks: u32, teleport_every: Option<u32>) -> Cli {
        Cli {
            entities: 6,
            ticks,
            seed: 7,
            tick_interval: 1,
            teleport_every,
            out_dir: None,
            max_p95_tick_bytes: None,
            max_avg_tick_bytes: None,
        }
    }

    #[test]
    fn short_run_keeps_replicas_in_sync() {
        let summary = run(&cli(130, None)).unwrap();
        assert_eq!(summary.replicas, 6);
        assert_eq!(summary.tick_sizes.len(), 130);
        assert!(summary.max_lag < 0.01);
        assert_eq!(summary.absolute_syncs, 0);
        assert!(summary.relative_syncs > 0);
        assert_eq!(summary.client_payloads, 260);
        assert!(summary.by_kind.contains_key("entity_spawn"));
        assert!(summary.by_kind.contains_key("entity_move"));
    }

    #[test]
    fn teleports_force_absolute_syncs() {
        let calm = run(&cli(40, None)).unwrap();
        let jumpy = run(&cli(40, Some(10))).unwrap();
        assert!(jumpy.absolute_syncs > calm.absolute_syncs);
    }

    #[test]
    fn budgets_are_enforced() {
        let summary = run(&cli(20, None)).unwrap();
        assert!(summary.assert_budgets(Some(0), None).is_err());
        assert!(summary.assert_budgets(None, Some(u64::MAX)).is_ok());
    }
}
