//! Typed payloads and frame encoding/decoding for tether.
//!
//! This crate ties together bytestream, wire, and protocol: it defines the
//! closed [`Payload`] set, registers a codec for every kind, turns payloads
//! into size-checked frames and back, and dispatches received payloads to
//! per-kind handlers.
//!
//! # Features
//!
//! - Entity lifecycle, movement, rotation, velocity, tracked data and attribute payloads
//! - Client input, keep-alive and batch payloads
//! - Default to-server/to-client registries
//! - Frame encode with size checks, frame decode with direction checks
//! - Handler dispatch with isolated failures
//!
//! # Design Principles
//!
//! - **Closed payload set** - Payload kinds are an enum, codecs are matched exhaustively.
//! - **Explicit registries** - Registries are values passed to every encode and decode.
//! - **Deterministic** - Same inputs produce same bytes.

mod batch;
mod body;
mod dispatch;
mod error;
mod frame;
mod payload;
mod types;

pub use body::{codec_for, default_registries};
pub use dispatch::{DispatchReport, Dispatcher, HandlerError, HandlerFailure, HandlerResult};
pub use error::{CodecError, CodecResult};
pub use frame::{decode_frame, decode_payload, encode_frame, route_direction, Envelope, Origin};
pub use payload::{
    AttributeSnapshot, AttributesUpdate, Batch, DataEntry, EntityMove, EntityMoveRotate,
    EntityPosition, EntityRemove, EntityRotate, EntitySpawn, EntityVelocity, KeepAlive, Modifier,
    ModifierOp, Payload, PayloadKind, PlayerInput, TrackedDataUpdate, TrackedValue, NAMESPACE,
};
pub use protocol::{Direction, Identifier};
pub use types::{dequantize_yaw, quantize_yaw, EntityId, Vec2};
pub use wire::{Limits as WireLimits, Route};

/// Shared, immutable registries for the built-in payloads.
pub type PayloadRegistries = protocol::Registries<Payload>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = EntityId::from_u128(0);
        let _ = Vec2::ZERO;
        let _ = WireLimits::default();
        let _ = PayloadKind::ALL;
        let _: CodecResult<()> = Ok(());
    }

    #[test]
    fn default_registries_build() {
        let registries: PayloadRegistries = default_registries().unwrap();
        assert_ne!(registries.fingerprint(), 0);
    }
}
