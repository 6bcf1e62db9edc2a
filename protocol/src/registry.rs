//! Directional payload type registries.

use std::collections::HashMap;
use std::fmt;

use bytestream::{ByteReader, ByteWriter};

use crate::error::{PayloadError, PayloadResult, RegistryError, RegistryResult};
use crate::Identifier;

/// Which way a payload travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Client to server.
    ToServer,
    /// Server to client.
    ToClient,
}

impl Direction {
    pub const ALL: [Self; 2] = [Self::ToServer, Self::ToClient];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToServer => write!(f, "to-server"),
            Self::ToClient => write!(f, "to-client"),
        }
    }
}

/// A value that knows its registered type identifier.
pub trait TypedPayload {
    fn identifier(&self) -> Identifier;
}

/// Encoder signature; the registry is passed so composite payloads can resolve
/// nested types.
pub type EncodeFn<P> = fn(&P, &mut ByteWriter, &PayloadRegistry<P>) -> PayloadResult<()>;

/// Decoder signature.
pub type DecodeFn<P> = fn(&mut ByteReader<'_>, &PayloadRegistry<P>) -> PayloadResult<P>;

/// The codec pair stored for one payload type.
pub struct PayloadCodec<P> {
    pub encode: EncodeFn<P>,
    pub decode: DecodeFn<P>,
}

impl<P> PayloadCodec<P> {
    #[must_use]
    pub const fn new(encode: EncodeFn<P>, decode: DecodeFn<P>) -> Self {
        Self { encode, decode }
    }
}

impl<P> Clone for PayloadCodec<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PayloadCodec<P> {}

impl<P> fmt::Debug for PayloadCodec<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadCodec").finish_non_exhaustive()
    }
}

/// One registered payload type.
#[derive(Debug, Clone)]
pub struct PayloadType<P> {
    id: Identifier,
    index: u32,
    codec: PayloadCodec<P>,
}

impl<P> PayloadType<P> {
    #[must_use]
    pub const fn id(&self) -> &Identifier {
        &self.id
    }

    /// Stable index assigned in registration order.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    pub fn encode(
        &self,
        payload: &P,
        writer: &mut ByteWriter,
        registry: &PayloadRegistry<P>,
    ) -> PayloadResult<()> {
        (self.codec.encode)(payload, writer, registry)
    }

    pub fn decode(
        &self,
        reader: &mut ByteReader<'_>,
        registry: &PayloadRegistry<P>,
    ) -> PayloadResult<P> {
        (self.codec.decode)(reader, registry)
    }
}

/// Registry of payload types for one direction.
///
/// Populated once at startup, then shared read-only.
#[derive(Debug, Clone)]
pub struct PayloadRegistry<P> {
    direction: Direction,
    types: Vec<PayloadType<P>>,
    by_id: HashMap<Identifier, usize>,
}

impl<P> PayloadRegistry<P> {
    #[must_use]
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            types: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Registers a payload type and returns its index.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Duplicate`] if `id` is already registered here, and
    /// [`RegistryError::InvalidIdentifier`] if `id` does not validate.
    pub fn register(&mut self, id: Identifier, codec: PayloadCodec<P>) -> RegistryResult<u32> {
        id.validate()?;
        if self.by_id.contains_key(&id) {
            return Err(RegistryError::Duplicate {
                id,
                direction: self.direction,
            });
        }
        let index = self.types.len() as u32;
        self.by_id.insert(id.clone(), self.types.len());
        self.types.push(PayloadType { id, index, codec });
        Ok(index)
    }

    #[must_use]
    pub fn get(&self, id: &Identifier) -> Option<&PayloadType<P>> {
        self.by_id.get(id).map(|&slot| &self.types[slot])
    }

    #[must_use]
    pub fn by_index(&self, index: u32) -> Option<&PayloadType<P>> {
        self.types.get(index as usize)
    }

    #[must_use]
    pub fn contains(&self, id: &Identifier) -> bool {
        self.by_id.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &PayloadType<P>> {
        self.types.iter()
    }
}

impl<P: TypedPayload> PayloadRegistry<P> {
    /// Resolves the payload's type in this registry.
    pub fn resolve(&self, payload: &P) -> PayloadResult<&PayloadType<P>> {
        let id = payload.identifier();
        self.get(&id).ok_or(PayloadError::Unregistered {
            id,
            direction: self.direction,
        })
    }

    /// Encodes the payload body with its registered codec.
    pub fn encode(&self, payload: &P, writer: &mut ByteWriter) -> PayloadResult<&PayloadType<P>> {
        let payload_type = self.resolve(payload)?;
        payload_type.encode(payload, writer, self)?;
        Ok(payload_type)
    }

    /// Decodes a complete body for `id`; leftover bytes are an error.
    pub fn decode_body(&self, id: &Identifier, body: &[u8]) -> PayloadResult<P> {
        let payload_type = self.get(id).ok_or_else(|| PayloadError::Unregistered {
            id: id.clone(),
            direction: self.direction,
        })?;
        let mut reader = ByteReader::new(body);
        let payload = payload_type.decode(&mut reader, self)?;
        if !reader.is_empty() {
            return Err(PayloadError::TrailingBytes {
                id: id.clone(),
                count: reader.remaining(),
            });
        }
        Ok(payload)
    }
}

/// The to-server and to-client registries of one protocol.
#[derive(Debug, Clone)]
pub struct Registries<P> {
    to_server: PayloadRegistry<P>,
    to_client: PayloadRegistry<P>,
}

impl<P> Default for Registries<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Registries<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            to_server: PayloadRegistry::new(Direction::ToServer),
            to_client: PayloadRegistry::new(Direction::ToClient),
        }
    }

    #[must_use]
    pub const fn registry(&self, direction: Direction) -> &PayloadRegistry<P> {
        match direction {
            Direction::ToServer => &self.to_server,
            Direction::ToClient => &self.to_client,
        }
    }

    pub fn register(
        &mut self,
        direction: Direction,
        id: Identifier,
        codec: PayloadCodec<P>,
    ) -> RegistryResult<u32> {
        match direction {
            Direction::ToServer => self.to_server.register(id, codec),
            Direction::ToClient => self.to_client.register(id, codec),
        }
    }

    #[must_use]
    pub fn get(&self, direction: Direction, id: &Identifier) -> Option<&PayloadType<P>> {
        self.registry(direction).get(id)
    }

    /// Looks `id` up in the to-server registry, then the to-client one.
    #[must_use]
    pub fn get_global(&self, id: &Identifier) -> Option<(Direction, &PayloadType<P>)> {
        Direction::ALL
            .into_iter()
            .find_map(|direction| self.get(direction, id).map(|entry| (direction, entry)))
    }

    /// Deterministic fingerprint of both registries.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        crate::hash::registries_fingerprint(self)
    }
}
