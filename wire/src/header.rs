//! Frame header bytes and payload routing.

use uuid::Uuid;

/// First byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameHeader {
    /// Relay-to-peer control message during the handshake.
    Control = 0x00,
    /// Peer-to-relay identification sent when the transport opens.
    Hello = 0x01,
    /// Client-originated payload, delivered to the host.
    Client = 0x10,
    /// Server payload for every client.
    Broadcast = 0x11,
    /// Server payload for one client.
    Targeted = 0x12,
    /// Server payload for every client except a listed set.
    Exclude = 0x13,
}

impl FrameHeader {
    /// Parses a header byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Control),
            0x01 => Some(Self::Hello),
            0x10 => Some(Self::Client),
            0x11 => Some(Self::Broadcast),
            0x12 => Some(Self::Targeted),
            0x13 => Some(Self::Exclude),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns `true` for headers that carry a typed payload.
    #[must_use]
    pub const fn is_payload(self) -> bool {
        matches!(
            self,
            Self::Client | Self::Broadcast | Self::Targeted | Self::Exclude
        )
    }
}

/// Where a payload frame is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Client to host.
    Client,
    /// Host to every client.
    Broadcast,
    /// Host to one client.
    Targeted(Uuid),
    /// Host to every client not listed.
    Exclude(Vec<Uuid>),
}

impl Route {
    #[must_use]
    pub const fn header(&self) -> FrameHeader {
        match self {
            Self::Client => FrameHeader::Client,
            Self::Broadcast => FrameHeader::Broadcast,
            Self::Targeted(_) => FrameHeader::Targeted,
            Self::Exclude(_) => FrameHeader::Exclude,
        }
    }

    /// Bytes the route adds between the header and the session id.
    #[must_use]
    pub fn extra_len(&self) -> usize {
        match self {
            Self::Client | Self::Broadcast => 0,
            Self::Targeted(_) => 16,
            Self::Exclude(ids) => {
                bytestream::varu32_len(u32::try_from(ids.len()).unwrap_or(u32::MAX))
                    + ids.len() * 16
            }
        }
    }

    /// Returns `true` if a client with `peer` should receive this route.
    #[must_use]
    pub fn delivers_to(&self, peer: &Uuid) -> bool {
        match self {
            Self::Client => false,
            Self::Broadcast => true,
            Self::Targeted(target) => target == peer,
            Self::Exclude(ids) => !ids.contains(peer),
        }
    }
}

/// Which side of a session a peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeerRole {
    /// The authoritative host.
    Server,
    /// An observer of the host.
    Client,
}

impl PeerRole {
    /// Wire byte; matches the steady-state header the role originates.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Server => FrameHeader::Broadcast.as_byte(),
            Self::Client => FrameHeader::Client.as_byte(),
        }
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x11 => Some(Self::Server),
            0x10 => Some(Self::Client),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bytes_roundtrip() {
        for header in [
            FrameHeader::Control,
            FrameHeader::Hello,
            FrameHeader::Client,
            FrameHeader::Broadcast,
            FrameHeader::Targeted,
            FrameHeader::Exclude,
        ] {
            assert_eq!(FrameHeader::from_byte(header.as_byte()), Some(header));
        }
        assert_eq!(FrameHeader::from_byte(0x14), None);
        assert_eq!(FrameHeader::Targeted.as_byte(), 0x12);
    }

    #[test]
    fn route_delivery() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert!(Route::Broadcast.delivers_to(&a));
        assert!(Route::Targeted(a).delivers_to(&a));
        assert!(!Route::Targeted(a).delivers_to(&b));
        assert!(!Route::Exclude(vec![a]).delivers_to(&a));
        assert!(Route::Exclude(vec![a]).delivers_to(&b));
        assert!(!Route::Client.delivers_to(&a));
    }

    #[test]
    fn route_extra_len() {
        assert_eq!(Route::Broadcast.extra_len(), 0);
        assert_eq!(Route::Targeted(Uuid::nil()).extra_len(), 16);
        assert_eq!(Route::Exclude(vec![Uuid::nil(); 3]).extra_len(), 1 + 48);
    }

    #[test]
    fn role_bytes() {
        assert_eq!(PeerRole::from_byte(PeerRole::Client.as_byte()), Some(PeerRole::Client));
        assert_eq!(PeerRole::from_byte(PeerRole::Server.as_byte()), Some(PeerRole::Server));
        assert_eq!(PeerRole::from_byte(0x00), None);
    }
}
