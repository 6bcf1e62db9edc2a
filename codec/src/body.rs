//! Body codecs for every payload kind and the default registries.

use bytestream::{ByteReader, ByteWriter};
use protocol::{
    Direction, Identifier, PayloadCodec, PayloadError, PayloadRegistry, PayloadResult,
    Registries, RegistryResult,
};

use crate::batch::{decode_batch, encode_batch};
use crate::payload::{
    AttributeSnapshot, AttributesUpdate, DataEntry, EntityMove, EntityMoveRotate, EntityPosition,
    EntityRemove, EntityRotate, EntitySpawn, EntityVelocity, KeepAlive, Modifier, ModifierOp,
    Payload, PayloadKind, PlayerInput, TrackedDataUpdate, TrackedValue,
};
use crate::types::{EntityId, Vec2};

/// A payload body with a fixed codec.
trait Body: Sized {
    const KIND: PayloadKind;

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()>;

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self>;

    fn from_payload(payload: &Payload) -> Option<&Self>;

    fn into_payload(self) -> Payload;
}

macro_rules! variant {
    ($variant:ident) => {
        const KIND: PayloadKind = PayloadKind::$variant;

        fn from_payload(payload: &Payload) -> Option<&Self> {
            match payload {
                Payload::$variant(body) => Some(body),
                _ => None,
            }
        }

        fn into_payload(self) -> Payload {
            Payload::$variant(self)
        }
    };
}

fn encode_body<B: Body>(
    payload: &Payload,
    w: &mut ByteWriter,
    _registry: &PayloadRegistry<Payload>,
) -> PayloadResult<()> {
    B::from_payload(payload)
        .ok_or_else(|| PayloadError::TypeMismatch {
            expected: B::KIND.identifier(),
        })?
        .encode(w)
}

fn decode_body<B: Body>(
    r: &mut ByteReader<'_>,
    _registry: &PayloadRegistry<Payload>,
) -> PayloadResult<Payload> {
    B::decode(r).map(B::into_payload)
}

fn body_codec<B: Body>() -> PayloadCodec<Payload> {
    PayloadCodec::new(encode_body::<B>, decode_body::<B>)
}

/// Codec registered for `kind`.
#[must_use]
pub fn codec_for(kind: PayloadKind) -> PayloadCodec<Payload> {
    match kind {
        PayloadKind::EntitySpawn => body_codec::<EntitySpawn>(),
        PayloadKind::EntityRemove => body_codec::<EntityRemove>(),
        PayloadKind::EntityPosition => body_codec::<EntityPosition>(),
        PayloadKind::EntityMove => body_codec::<EntityMove>(),
        PayloadKind::EntityRotate => body_codec::<EntityRotate>(),
        PayloadKind::EntityMoveRotate => body_codec::<EntityMoveRotate>(),
        PayloadKind::EntityVelocity => body_codec::<EntityVelocity>(),
        PayloadKind::TrackedData => body_codec::<TrackedDataUpdate>(),
        PayloadKind::Attributes => body_codec::<AttributesUpdate>(),
        PayloadKind::PlayerInput => body_codec::<PlayerInput>(),
        PayloadKind::KeepAlive => body_codec::<KeepAlive>(),
        PayloadKind::Batch => PayloadCodec::new(encode_batch, decode_batch),
    }
}

/// Builds both registries with every built-in payload kind.
///
/// Indices follow [`PayloadKind::ALL`] order within each direction.
pub fn default_registries() -> RegistryResult<Registries<Payload>> {
    let mut registries = Registries::new();
    for kind in PayloadKind::ALL {
        registries.register(kind.direction(), kind.identifier(), codec_for(kind))?;
    }
    Ok(registries)
}

fn write_id(w: &mut ByteWriter, id: EntityId) {
    w.write_uuid(&id.raw());
}

fn read_id(r: &mut ByteReader<'_>) -> PayloadResult<EntityId> {
    Ok(EntityId::new(r.read_uuid()?))
}

fn write_vec2(w: &mut ByteWriter, v: Vec2) {
    w.write_f64(v.x);
    w.write_f64(v.y);
}

fn read_vec2(r: &mut ByteReader<'_>) -> PayloadResult<Vec2> {
    Ok(Vec2::new(r.read_f64()?, r.read_f64()?))
}

fn write_identifier(w: &mut ByteWriter, id: &Identifier) -> PayloadResult<()> {
    w.write_str(&id.to_string())?;
    Ok(())
}

fn read_identifier(r: &mut ByteReader<'_>, field: &'static str) -> PayloadResult<Identifier> {
    let text = r.read_str()?;
    Identifier::parse(text).map_err(|err| PayloadError::InvalidValue {
        field,
        reason: err.to_string(),
    })
}

impl Body for EntitySpawn {
    variant!(EntitySpawn);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        write_identifier(w, &self.kind)?;
        write_vec2(w, self.position);
        w.write_u8(self.yaw);
        write_vec2(w, self.velocity);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            id: read_id(r)?,
            kind: read_identifier(r, "entity kind")?,
            position: read_vec2(r)?,
            yaw: r.read_u8()?,
            velocity: read_vec2(r)?,
        })
    }
}

impl Body for EntityRemove {
    variant!(EntityRemove);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        w.write_len(self.ids.len())?;
        for id in &self.ids {
            write_id(w, *id);
        }
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        let count = r.read_count()?;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(read_id(r)?);
        }
        Ok(Self { ids })
    }
}

impl Body for EntityPosition {
    variant!(EntityPosition);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        write_vec2(w, self.position);
        w.write_u8(self.yaw);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            id: read_id(r)?,
            position: read_vec2(r)?,
            yaw: r.read_u8()?,
        })
    }
}

impl Body for EntityMove {
    variant!(EntityMove);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        w.write_i16(self.dx);
        w.write_i16(self.dy);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            id: read_id(r)?,
            dx: r.read_i16()?,
            dy: r.read_i16()?,
        })
    }
}

impl Body for EntityRotate {
    variant!(EntityRotate);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        w.write_u8(self.yaw);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            id: read_id(r)?,
            yaw: r.read_u8()?,
        })
    }
}

impl Body for EntityMoveRotate {
    variant!(EntityMoveRotate);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        w.write_i16(self.dx);
        w.write_i16(self.dy);
        w.write_u8(self.yaw);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            id: read_id(r)?,
            dx: r.read_i16()?,
            dy: r.read_i16()?,
            yaw: r.read_u8()?,
        })
    }
}

impl Body for EntityVelocity {
    variant!(EntityVelocity);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        write_vec2(w, self.velocity);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            id: read_id(r)?,
            velocity: read_vec2(r)?,
        })
    }
}

fn write_value(w: &mut ByteWriter, value: &TrackedValue) -> PayloadResult<()> {
    w.write_u8(value.tag());
    match value {
        TrackedValue::Bool(v) => w.write_u8(u8::from(*v)),
        TrackedValue::Byte(v) => w.write_u8(*v),
        TrackedValue::Int(v) => w.write_i32(*v),
        TrackedValue::VarInt(v) => w.write_varu32(*v),
        TrackedValue::Float(v) => w.write_f32(*v),
        TrackedValue::Text(v) => w.write_str(v)?,
        TrackedValue::Id(v) => w.write_uuid(v),
    }
    Ok(())
}

fn read_value(r: &mut ByteReader<'_>) -> PayloadResult<TrackedValue> {
    let tag = r.read_u8()?;
    let value = match tag {
        0 => match r.read_u8()? {
            0 => TrackedValue::Bool(false),
            1 => TrackedValue::Bool(true),
            other => {
                return Err(PayloadError::InvalidValue {
                    field: "tracked bool",
                    reason: format!("byte {other} is not 0 or 1"),
                })
            }
        },
        1 => TrackedValue::Byte(r.read_u8()?),
        2 => TrackedValue::Int(r.read_i32()?),
        3 => TrackedValue::VarInt(r.read_varu32()?),
        4 => TrackedValue::Float(r.read_f32()?),
        5 => TrackedValue::Text(r.read_str()?.to_owned()),
        6 => TrackedValue::Id(r.read_uuid()?),
        other => {
            return Err(PayloadError::InvalidValue {
                field: "tracked value tag",
                reason: format!("unknown tag {other}"),
            })
        }
    };
    Ok(value)
}

impl Body for TrackedDataUpdate {
    variant!(TrackedData);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        w.write_len(self.entries.len())?;
        for entry in &self.entries {
            w.write_u8(entry.key);
            write_value(w, &entry.value)?;
        }
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        let id = read_id(r)?;
        let count = r.read_count()?;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(DataEntry {
                key: r.read_u8()?,
                value: read_value(r)?,
            });
        }
        Ok(Self { id, entries })
    }
}

fn write_attribute(w: &mut ByteWriter, snapshot: &AttributeSnapshot) -> PayloadResult<()> {
    write_identifier(w, &snapshot.attribute)?;
    w.write_f64(snapshot.base);
    w.write_len(snapshot.modifiers.len())?;
    for modifier in &snapshot.modifiers {
        w.write_uuid(&modifier.id);
        w.write_f64(modifier.amount);
        w.write_u8(modifier.operation.as_byte());
    }
    Ok(())
}

fn read_attribute(r: &mut ByteReader<'_>) -> PayloadResult<AttributeSnapshot> {
    let attribute = read_identifier(r, "attribute")?;
    let base = r.read_f64()?;
    let count = r.read_count()?;
    let mut modifiers = Vec::with_capacity(count);
    for _ in 0..count {
        let id = r.read_uuid()?;
        let amount = r.read_f64()?;
        let op = r.read_u8()?;
        let operation = ModifierOp::from_byte(op).ok_or_else(|| PayloadError::InvalidValue {
            field: "modifier operation",
            reason: format!("unknown operation {op}"),
        })?;
        modifiers.push(Modifier {
            id,
            amount,
            operation,
        });
    }
    Ok(AttributeSnapshot {
        attribute,
        base,
        modifiers,
    })
}

impl Body for AttributesUpdate {
    variant!(Attributes);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_id(w, self.id);
        w.write_len(self.attributes.len())?;
        for snapshot in &self.attributes {
            write_attribute(w, snapshot)?;
        }
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        let id = read_id(r)?;
        let count = r.read_count()?;
        let mut attributes = Vec::with_capacity(count);
        for _ in 0..count {
            attributes.push(read_attribute(r)?);
        }
        Ok(Self { id, attributes })
    }
}

impl Body for PlayerInput {
    variant!(PlayerInput);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        write_vec2(w, self.position);
        w.write_u8(self.yaw);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            position: read_vec2(r)?,
            yaw: r.read_u8()?,
        })
    }
}

impl Body for KeepAlive {
    variant!(KeepAlive);

    fn encode(&self, w: &mut ByteWriter) -> PayloadResult<()> {
        w.write_u32(self.nonce);
        Ok(())
    }

    fn decode(r: &mut ByteReader<'_>) -> PayloadResult<Self> {
        Ok(Self {
            nonce: r.read_u32()?,
        })
    }
}
