use std::sync::Arc;
use std::time::Instant;

use channel::{
    sniff, CancelToken, ChannelConfig, ChannelError, ChannelEvent, ChannelState, ClientConnection,
    HandshakeError, MemoryTransport, Relay, RelayConfig, ServerConnection, SniffOptions,
    PROTOCOL_MISMATCH,
};
use codec::{
    codec_for, default_registries, Dispatcher, Direction, EntityId, EntityRotate, Identifier,
    KeepAlive, Payload, PayloadKind, PayloadRegistries, PlayerInput, Vec2, WireLimits,
};
use uuid::Uuid;

fn registries() -> Arc<PayloadRegistries> {
    Arc::new(default_registries().unwrap())
}

fn host(relay: &Relay, now: Instant) -> ServerConnection<MemoryTransport> {
    let mut host = ServerConnection::new(
        relay.transport(),
        Uuid::from_u128(1),
        registries(),
        ChannelConfig::default(),
    );
    host.connect(&relay.address(), now).unwrap();
    assert_eq!(host.poll(now), vec![ChannelEvent::Connected { session_id: 1 }]);
    host
}

fn client_with(
    relay: &Relay,
    raw: u128,
    config: ChannelConfig,
    now: Instant,
) -> ClientConnection<MemoryTransport> {
    let mut client = ClientConnection::new(
        relay.transport(),
        Uuid::from_u128(raw),
        registries(),
        config,
    );
    client.connect(&relay.address(), now).unwrap();
    let events = client.poll(now);
    assert!(
        matches!(events.as_slice(), [ChannelEvent::Connected { .. }]),
        "{events:?}"
    );
    client
}

fn client(relay: &Relay, raw: u128, now: Instant) -> ClientConnection<MemoryTransport> {
    client_with(relay, raw, ChannelConfig::default(), now)
}

fn payloads(events: Vec<ChannelEvent>) -> Vec<Payload> {
    events
        .into_iter()
        .filter_map(|event| match event {
            ChannelEvent::Payload(envelope) => Some(envelope.payload),
            _ => None,
        })
        .collect()
}

fn input(x: f64) -> Payload {
    Payload::PlayerInput(PlayerInput {
        position: Vec2::new(x, 0.0),
        yaw: 3,
    })
}

#[test]
fn flush_batches_queued_payloads() {
    let now = Instant::now();
    let relay = Relay::new(RelayConfig::default());
    let mut server = host(&relay, now);
    let mut player = client(&relay, 2, now);

    player.queue(input(1.0)).unwrap();
    player.queue(Payload::KeepAlive(KeepAlive { nonce: 9 })).unwrap();
    let report = player.flush().unwrap();
    assert_eq!((report.frames, report.batched, report.individual), (1, 2, 0));
    assert_eq!(player.queued(), 0);

    let events = server.poll(now);
    assert_eq!(server.peer_for_session(2), Some(Uuid::from_u128(2)));
    let received = payloads(events);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind(), PayloadKind::Batch);

    let mut seen = Vec::new();
    let mut dispatcher: Dispatcher<Vec<PayloadKind>> = Dispatcher::new();
    for kind in [PayloadKind::PlayerInput, PayloadKind::KeepAlive] {
        dispatcher.on(kind, |seen: &mut Vec<PayloadKind>, payload, origin| {
            assert_eq!(origin.session_id, 2);
            seen.push(payload.kind());
            Ok(())
        });
    }
    let report = dispatcher.dispatch_payload(
        &mut seen,
        &received[0],
        &codec::Origin {
            route: codec::Route::Client,
            session_id: 2,
        },
    );
    assert!(report.is_clean());
    assert_eq!(seen, vec![PayloadKind::PlayerInput, PayloadKind::KeepAlive]);
}

#[test]
fn single_payload_is_not_wrapped() {
    let now = Instant::now();
    let relay = Relay::new(RelayConfig::default());
    let mut server = host(&relay, now);
    let mut player = client(&relay, 2, now);

    assert_eq!(player.flush().unwrap().frames, 0);
    player.queue(input(4.0)).unwrap();
    let report = player.flush().unwrap();
    assert_eq!((report.frames, report.individual), (1, 1));
    assert_eq!(payloads(server.poll(now)), vec![input(4.0)]);
}

#[test]
fn oversize_batch_falls_back_to_individual_sends() {
    let now = Instant::now();
    let relay = Relay::new(RelayConfig::default());
    let mut server = host(&relay, now);
    // One player input frame is 40 bytes; two batched are 53.
    let tight = ChannelConfig {
        limits: WireLimits {
            max_frame_bytes: 48,
            ..WireLimits::default()
        },
        ..ChannelConfig::default()
    };
    let mut player = client_with(&relay, 2, tight, now);

    player.queue(input(1.0)).unwrap();
    player.queue(input(2.0)).unwrap();
    let report = player.flush().unwrap();
    assert_eq!((report.frames, report.batched, report.individual), (2, 0, 2));
    assert!(report.rejected.is_empty());
    assert_eq!(player.stats().oversize_rejected, 1);

    assert_eq!(payloads(server.poll(now)), vec![input(1.0), input(2.0)]);
}

#[test]
fn queue_refuses_to_client_kinds() {
    let now = Instant::now();
    let relay = Relay::new(RelayConfig::default());
    let _server = host(&relay, now);
    let mut player = client(&relay, 2, now);
    let rotate = Payload::EntityRotate(EntityRotate {
        id: EntityId::from_u128(1),
        yaw: 0,
    });
    assert!(matches!(
        player.queue(rotate),
        Err(ChannelError::WrongDirection { .. })
    ));
}

#[test]
fn server_routes_reach_the_right_clients() {
    let now = Instant::now();
    let relay = Relay::new(RelayConfig::default());
    let mut server = host(&relay, now);
    let mut a = client(&relay, 2, now);
    let mut b = client(&relay, 3, now);
    server.poll(now);
    assert_eq!(server.peers().count(), 2);

    let rotate = Payload::EntityRotate(EntityRotate {
        id: EntityId::from_u128(42),
        yaw: 64,
    });

    server.send(&rotate).unwrap();
    assert_eq!(payloads(a.poll(now)).len(), 1);
    assert_eq!(payloads(b.poll(now)).len(), 1);

    server.send_to(Uuid::from_u128(3), &rotate).unwrap();
    assert!(payloads(a.poll(now)).is_empty());
    assert_eq!(payloads(b.poll(now)), vec![rotate.clone()]);

    server.send_exclude(&[Uuid::from_u128(3)], &rotate).unwrap();
    assert_eq!(payloads(a.poll(now)), vec![rotate]);
    assert!(payloads(b.poll(now)).is_empty());
}

#[test]
fn mismatched_registries_fail_the_handshake() {
    let now = Instant::now();
    let relay = Relay::new(RelayConfig::default());
    let _server = host(&relay, now);

    let mut modded = default_registries().unwrap();
    modded
        .register(
            Direction::ToServer,
            Identifier::from_static("mod", "ping"),
            codec_for(PayloadKind::KeepAlive),
        )
        .unwrap();
    let mut player = ClientConnection::new(
        relay.transport(),
        Uuid::from_u128(2),
        Arc::new(modded),
        ChannelConfig::default(),
    );
    player.connect(&relay.address(), now).unwrap();
    assert_eq!(
        player.poll(now),
        vec![ChannelEvent::HandshakeFailed(HandshakeError::Rejected(
            PROTOCOL_MISMATCH.to_owned()
        ))]
    );
    assert_eq!(player.channel().state(), ChannelState::Disconnected);
    assert_eq!(relay.session_count(), 1);
}

#[test]
fn host_disconnect_reaches_clients() {
    let now = Instant::now();
    let relay = Relay::new(RelayConfig::default());
    let mut server = host(&relay, now);
    let mut player = client(&relay, 2, now);

    server.disconnect();
    server.disconnect();
    assert_eq!(player.poll(now), vec![ChannelEvent::Disconnected]);
    assert_eq!(player.channel().state(), ChannelState::Disconnected);
    player.queue(input(0.0)).unwrap();
    assert!(matches!(player.flush(), Err(ChannelError::NotReady)));
}

#[test]
fn sniff_counts_attempts_against_relay() {
    let mut relay = Relay::new(RelayConfig::default());
    let address = relay.address();
    let options = SniffOptions {
        retry_delay: std::time::Duration::ZERO,
        max_retries: 3,
    };

    relay.set_online(false);
    let mut attempts = Vec::new();
    assert!(!sniff(&mut relay, &address, options, &CancelToken::new(), |a, m| {
        attempts.push((a, m));
    }));
    assert_eq!(attempts, vec![(1, 3), (2, 3), (3, 3)]);

    relay.set_online(true);
    let mut count = 0;
    assert!(sniff(&mut relay, &address, options, &CancelToken::new(), |_, _| count += 1));
    assert_eq!(count, 1);
}
