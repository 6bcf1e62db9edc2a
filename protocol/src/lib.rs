//! Payload identifiers and directional payload type registries for tether.
//!
//! This crate defines how typed payloads are named and looked up:
//! - Namespaced [`Identifier`]s (`namespace:path`)
//! - One [`PayloadRegistry`] per [`Direction`], bundled in [`Registries`]
//! - Codec function pairs stored per registered type
//! - Deterministic registry fingerprinting
//!
//! # Design Principles
//!
//! - **Explicit instances** - Registries are built at startup and passed around, never global.
//! - **Register once** - Re-registering an identifier in the same direction is an error.
//! - **Deterministic hashing** - The fingerprint is stable given the same registrations.

mod error;
mod hash;
mod identifier;
mod registry;

pub use error::{
    IdentifierError, PayloadError, PayloadResult, RegistryError, RegistryResult,
};
pub use hash::registries_fingerprint;
pub use identifier::{Identifier, SEPARATOR};
pub use registry::{
    DecodeFn, Direction, EncodeFn, PayloadCodec, PayloadRegistry, PayloadType, Registries,
    TypedPayload,
};
