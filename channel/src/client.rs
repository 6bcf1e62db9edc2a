//! Client side: queued to-server payloads flushed once per tick.

use std::sync::Arc;
use std::time::Instant;

use codec::{Batch, Direction, Payload, PayloadKind, PayloadRegistries};
use log::{debug, warn};
use uuid::Uuid;
use wire::{PeerRole, Route};

use crate::channel::{Channel, ChannelEvent, ChannelState};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, ChannelResult};
use crate::stats::ChannelStats;
use crate::transport::Transport;

/// What one [`ClientConnection::flush`] sent.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Frames handed to the transport.
    pub frames: usize,
    pub bytes: usize,
    /// Payloads carried inside a batch frame.
    pub batched: usize,
    /// Payloads sent in their own frame.
    pub individual: usize,
    /// Payloads that could not be sent even on their own.
    pub rejected: Vec<(PayloadKind, ChannelError)>,
}

impl FlushReport {
    fn sent(&mut self, bytes: usize) {
        self.frames += 1;
        self.bytes += bytes;
    }
}

/// Client connection with an outbound queue.
pub struct ClientConnection<T> {
    channel: Channel<T>,
    queue: Vec<Payload>,
}

impl<T: Transport> ClientConnection<T> {
    pub fn new(
        transport: T,
        peer_id: Uuid,
        registries: Arc<PayloadRegistries>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            channel: Channel::new(transport, PeerRole::Client, peer_id, registries, config),
            queue: Vec::new(),
        }
    }

    pub fn connect(&mut self, address: &str, now: Instant) -> ChannelResult<()> {
        self.channel.connect(address, now)
    }

    pub fn poll(&mut self, now: Instant) -> Vec<ChannelEvent> {
        self.channel.poll(now)
    }

    /// Queues a to-server payload for the next flush.
    ///
    /// Batches and to-client kinds are refused.
    pub fn queue(&mut self, payload: Payload) -> ChannelResult<()> {
        let kind = payload.kind();
        if kind == PayloadKind::Batch || kind.direction() != Direction::ToServer {
            return Err(ChannelError::WrongDirection { kind });
        }
        self.queue.push(payload);
        Ok(())
    }

    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Sends everything queued.
    ///
    /// One payload goes out as-is; two or more go out as one batch. If the
    /// batch is oversize every payload is sent on its own instead, and a
    /// payload too large even alone is dropped into `rejected`. Nothing is
    /// dequeued unless the channel is ready. On any other error the payloads
    /// not yet sent stay queued, in order, for the next flush.
    pub fn flush(&mut self) -> ChannelResult<FlushReport> {
        let mut report = FlushReport::default();
        if self.queue.is_empty() {
            return Ok(report);
        }
        if self.channel.state() != ChannelState::Ready {
            return Err(ChannelError::NotReady);
        }

        let mut items = std::mem::take(&mut self.queue);
        if let [payload] = items.as_slice() {
            return match self.channel.send_payload(&Route::Client, payload) {
                Ok(bytes) => {
                    report.sent(bytes);
                    report.individual = 1;
                    Ok(report)
                }
                Err(err) if err.is_oversize() => Err(err),
                Err(err) => {
                    self.queue = items;
                    Err(err)
                }
            };
        }

        let count = items.len();
        let batch = Payload::Batch(Batch {
            items: items.clone(),
        });
        match self.channel.send_payload(&Route::Client, &batch) {
            Ok(bytes) => {
                debug!("flushed {count} payloads in one batch ({bytes} bytes)");
                report.sent(bytes);
                report.batched = count;
                Ok(report)
            }
            Err(err) if err.is_oversize() => {
                warn!("batch of {count} payloads is oversize ({err}); sending individually");
                for index in 0..items.len() {
                    let payload = &items[index];
                    match self.channel.send_payload(&Route::Client, payload) {
                        Ok(bytes) => {
                            report.sent(bytes);
                            report.individual += 1;
                        }
                        Err(err) if err.is_oversize() => {
                            warn!("dropping oversize {:?}: {err}", payload.kind());
                            report.rejected.push((payload.kind(), err));
                        }
                        Err(err) => {
                            warn!(
                                "flush stopped after {} of {count} payloads: {err}",
                                report.individual
                            );
                            self.queue = items.split_off(index);
                            return Err(err);
                        }
                    }
                }
                Ok(report)
            }
            Err(err) => {
                self.queue = items;
                Err(err)
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.queue.clear();
        self.channel.disconnect();
    }

    #[must_use]
    pub fn channel(&self) -> &Channel<T> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Channel<T> {
        &mut self.channel
    }

    #[must_use]
    pub fn stats(&self) -> &ChannelStats {
        self.channel.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::TransportEvent;
    use codec::{default_registries, KeepAlive, PlayerInput, Vec2, WireLimits};
    use std::collections::VecDeque;
    use wire::{encode_control_frame, ControlMessage};

    /// Transport that accepts `budget` sends, then fails with an I/O error.
    struct Flaky {
        budget: usize,
        sent: Vec<Vec<u8>>,
        events: VecDeque<TransportEvent>,
    }

    impl Transport for Flaky {
        fn open(&mut self, _address: &str) -> Result<(), TransportError> {
            self.events.push_back(TransportEvent::Opened);
            let registered = encode_control_frame(0, &ControlMessage::Registered(3)).unwrap();
            self.events.push_back(TransportEvent::Frame(registered));
            Ok(())
        }

        fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            if self.budget == 0 {
                return Err(TransportError::Io {
                    message: "busy".into(),
                });
            }
            self.budget -= 1;
            self.sent.push(frame.to_vec());
            Ok(())
        }

        fn close(&mut self) {}

        fn poll_event(&mut self) -> Option<TransportEvent> {
            self.events.pop_front()
        }
    }

    /// A ready client whose transport accepts `budget` sends after the hello.
    fn ready(config: ChannelConfig, budget: usize) -> ClientConnection<Flaky> {
        let transport = Flaky {
            budget: 1,
            sent: Vec::new(),
            events: VecDeque::new(),
        };
        let registries = Arc::new(default_registries().unwrap());
        let mut client = ClientConnection::new(transport, Uuid::from_u128(5), registries, config);
        let now = Instant::now();
        client.connect("test", now).unwrap();
        assert_eq!(
            client.poll(now),
            vec![ChannelEvent::Connected { session_id: 3 }]
        );
        client.channel_mut().transport_mut().budget = budget;
        client
    }

    fn keep_alive(nonce: u32) -> Payload {
        Payload::KeepAlive(KeepAlive { nonce })
    }

    fn input(x: f64) -> Payload {
        Payload::PlayerInput(PlayerInput {
            position: Vec2::new(x, 0.0),
            yaw: 3,
        })
    }

    #[test]
    fn failed_batch_send_keeps_the_queue() {
        let mut client = ready(ChannelConfig::default(), 0);
        client.queue(keep_alive(1)).unwrap();
        client.queue(keep_alive(2)).unwrap();

        let err = client.flush().unwrap_err();
        assert!(matches!(err, ChannelError::Transport(TransportError::Io { .. })));
        assert_eq!(client.queued(), 2);

        client.channel_mut().transport_mut().budget = 1;
        let report = client.flush().unwrap();
        assert_eq!((report.frames, report.batched), (1, 2));
        assert_eq!(client.queued(), 0);
    }

    #[test]
    fn failed_single_send_keeps_the_payload() {
        let mut client = ready(ChannelConfig::default(), 0);
        client.queue(keep_alive(7)).unwrap();

        assert!(client.flush().is_err());
        assert_eq!(client.queued(), 1);
    }

    #[test]
    fn failure_during_fallback_requeues_the_rest() {
        // Two player inputs batched exceed 48 bytes; one alone fits.
        let tight = ChannelConfig {
            limits: WireLimits {
                max_frame_bytes: 48,
                ..WireLimits::default()
            },
            ..ChannelConfig::default()
        };
        let mut client = ready(tight, 1);
        client.queue(input(1.0)).unwrap();
        client.queue(input(2.0)).unwrap();
        client.queue(input(3.0)).unwrap();

        assert!(client.flush().is_err());
        assert_eq!(client.queued(), 2);
        assert_eq!(client.channel().transport().sent.len(), 2);

        client.channel_mut().transport_mut().budget = 2;
        let report = client.flush().unwrap();
        assert_eq!((report.frames, report.individual), (2, 2));
        assert_eq!(client.queued(), 0);
    }
}
