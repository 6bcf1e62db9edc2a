//! Host side: broadcast, targeted and exclude sends plus peer bookkeeping.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use codec::{Payload, PayloadRegistries};
use log::debug;
use uuid::Uuid;
use wire::{ControlMessage, PeerRole, Route};

use crate::channel::{Channel, ChannelEvent};
use crate::config::ChannelConfig;
use crate::error::ChannelResult;
use crate::relay::RelayNotice;
use crate::stats::ChannelStats;
use crate::transport::Transport;

/// Host connection.
///
/// Keeps a session id to peer id map from the relay's membership notices so
/// received payloads can be attributed and targeted sends addressed.
pub struct ServerConnection<T> {
    channel: Channel<T>,
    peers: BTreeMap<u8, Uuid>,
}

impl<T: Transport> ServerConnection<T> {
    pub fn new(
        transport: T,
        peer_id: Uuid,
        registries: Arc<PayloadRegistries>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            channel: Channel::new(transport, PeerRole::Server, peer_id, registries, config),
            peers: BTreeMap::new(),
        }
    }

    pub fn connect(&mut self, address: &str, now: Instant) -> ChannelResult<()> {
        self.channel.connect(address, now)
    }

    /// Polls the channel, applying membership notices before returning events.
    pub fn poll(&mut self, now: Instant) -> Vec<ChannelEvent> {
        let events = self.channel.poll(now);
        for event in &events {
            match event {
                ChannelEvent::Control(ControlMessage::Info(detail)) => {
                    match detail.parse::<RelayNotice>() {
                        Ok(RelayNotice::Joined {
                            session_id,
                            peer_id,
                        }) => {
                            debug!("peer {peer_id} joined as session {session_id}");
                            self.peers.insert(session_id, peer_id);
                        }
                        Ok(RelayNotice::Left { session_id }) => {
                            debug!("session {session_id} left");
                            self.peers.remove(&session_id);
                        }
                        Err(()) => debug!("relay info: {detail}"),
                    }
                }
                ChannelEvent::Disconnected | ChannelEvent::HandshakeFailed(_) => {
                    self.peers.clear();
                }
                _ => {}
            }
        }
        events
    }

    /// Sends to every client.
    pub fn send(&mut self, payload: &Payload) -> ChannelResult<usize> {
        self.channel.send_payload(&Route::Broadcast, payload)
    }

    /// Sends to one client.
    pub fn send_to(&mut self, peer: Uuid, payload: &Payload) -> ChannelResult<usize> {
        self.channel.send_payload(&Route::Targeted(peer), payload)
    }

    /// Sends to every client except `excluded`.
    pub fn send_exclude(&mut self, excluded: &[Uuid], payload: &Payload) -> ChannelResult<usize> {
        self.channel
            .send_payload(&Route::Exclude(excluded.to_vec()), payload)
    }

    #[must_use]
    pub fn peer_for_session(&self, session_id: u8) -> Option<Uuid> {
        self.peers.get(&session_id).copied()
    }

    /// Connected clients as `(session id, peer id)`.
    pub fn peers(&self) -> impl Iterator<Item = (u8, Uuid)> + '_ {
        self.peers.iter().map(|(session, peer)| (*session, *peer))
    }

    pub fn disconnect(&mut self) {
        self.peers.clear();
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
