//! Channel, probe and relay settings.

use std::time::Duration;

use wire::Limits;

/// Channel settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelConfig {
    /// How long `Connecting` may last before the handshake fails.
    pub handshake_timeout: Duration,

    /// Connect timeout for a single reachability probe.
    pub probe_timeout: Duration,

    /// Frame limits applied to everything sent and received.
    pub limits: Limits,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(6),
            probe_timeout: Duration::from_secs(2),
            limits: Limits::default(),
        }
    }
}

impl ChannelConfig {
    /// Short timeouts and small frames for tests.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(500),
            probe_timeout: Duration::from_millis(100),
            limits: Limits::for_testing(),
        }
    }
}

/// Reachability retry policy for [`sniff`](crate::sniff).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SniffOptions {
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for SniffOptions {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
            max_retries: 5,
        }
    }
}

/// In-memory relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelayConfig {
    /// Address transports must open to reach the relay.
    pub address: String,

    /// Maximum concurrently registered peers, host included. Capped at 255.
    pub max_sessions: u8,

    /// Frame limits the relay decodes with.
    pub limits: Limits,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            address: "memory://relay".to_owned(),
            max_sessions: u8::MAX,
            limits: Limits::default(),
        }
    }
}
