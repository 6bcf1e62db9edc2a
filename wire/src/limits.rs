//! Configurable limits for bounded framing.

/// Wire-level frame limits.
///
/// Enforced on both encode and decode. A frame that would exceed
/// `max_frame_bytes` is never handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    /// Maximum encoded frame size in bytes.
    pub max_frame_bytes: usize,

    /// Maximum number of excluded peers on an exclude-routed frame.
    pub max_exclusions: usize,

    /// Maximum byte length of a payload type identifier.
    pub max_type_id_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_bytes: 4096,
            max_exclusions: 255,
            max_type_id_len: 128,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_frame_bytes: 512,
            max_exclusions: 8,
            max_type_id_len: 64,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_frame_bytes: usize::MAX,
            max_exclusions: usize::MAX,
            max_type_id_len: u16::MAX as usize,
        }
    }
}
