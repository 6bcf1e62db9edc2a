//! Frame headers, routing and handshake frames for the tether replication protocol.
//!
//! This crate handles the binary frame format: header bytes, payload routing,
//! handshake control/hello frames, and frame size limits. It does not know
//! about payload types; the type identifier and body are opaque here.
//!
//! # Design Principles
//!
//! - **Size checked before write** - An oversize frame is rejected before any bytes are produced.
//! - **Bounded decoding** - Exclusion counts and type ids are validated against limits.
//! - **No domain knowledge** - This crate handles framing, not entities or payload bodies.

mod control;
mod error;
mod frame;
mod header;
mod limits;

pub use control::{
    encode_control_frame, encode_hello_frame, ControlFrame, ControlMessage, HelloFrame,
    HELLO_FRAME_LEN,
};
pub use error::{DecodeError, EncodeError, LimitKind, WireResult};
pub use frame::{decode_frame, encode_payload_frame, payload_frame_len, Frame, PayloadFrame};
pub use header::{FrameHeader, PeerRole, Route};
pub use limits::Limits;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = FrameHeader::Control;
        let _ = Route::Broadcast;
        let _ = PeerRole::Client;
        let _ = Limits::default();
        let _ = HELLO_FRAME_LEN;
        let _: WireResult<()> = Ok(());
    }

    #[test]
    fn limits_default_is_reasonable() {
        let limits = Limits::default();
        assert_eq!(limits.max_frame_bytes, 4096);
        assert!(limits.max_type_id_len >= 32, "should allow useful type ids");
    }
}
