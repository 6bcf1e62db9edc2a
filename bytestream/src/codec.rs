//! Composable value codecs.
//!
//! A [`Codec`] is a pair of pure functions turning one value type into bytes
//! and back. The primitive codecs here are zero-sized markers; composite
//! codecs wrap an element codec and prefix a varint count.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use uuid::Uuid;

use crate::{ByteReader, ByteResult, ByteWriter};

/// Encodes and decodes values of one type.
pub trait Codec {
    /// The decoded value type.
    type Value;

    fn encode(&self, value: &Self::Value, writer: &mut ByteWriter) -> ByteResult<()>;

    fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<Self::Value>;
}

macro_rules! fixed_codec {
    ($name:ident, $ty:ty, $write:ident, $read:ident) => {
        #[doc = concat!("Little-endian `", stringify!($ty), "`.")]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Codec for $name {
            type Value = $ty;

            fn encode(&self, value: &$ty, writer: &mut ByteWriter) -> ByteResult<()> {
                writer.$write(*value);
                Ok(())
            }

            fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<$ty> {
                reader.$read()
            }
        }
    };
}

fixed_codec!(U8, u8, write_u8, read_u8);
fixed_codec!(I8, i8, write_i8, read_i8);
fixed_codec!(U16, u16, write_u16, read_u16);
fixed_codec!(I16, i16, write_i16, read_i16);
fixed_codec!(U32, u32, write_u32, read_u32);
fixed_codec!(I32, i32, write_i32, read_i32);
fixed_codec!(F32, f32, write_f32, read_f32);
fixed_codec!(F64, f64, write_f64, read_f64);

/// LEB128 varint `u32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarU32;

impl Codec for VarU32 {
    type Value = u32;

    fn encode(&self, value: &u32, writer: &mut ByteWriter) -> ByteResult<()> {
        writer.write_varu32(*value);
        Ok(())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<u32> {
        reader.read_varu32()
    }
}

/// `u16`-length-prefixed UTF-8 string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Str;

impl Codec for Str {
    type Value = String;

    fn encode(&self, value: &String, writer: &mut ByteWriter) -> ByteResult<()> {
        writer.write_str(value)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<String> {
        reader.read_str().map(str::to_owned)
    }
}

/// 128-bit identifier as 16 raw bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uuid128;

impl Codec for Uuid128 {
    type Value = Uuid;

    fn encode(&self, value: &Uuid, writer: &mut ByteWriter) -> ByteResult<()> {
        writer.write_uuid(value);
        Ok(())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<Uuid> {
        reader.read_uuid()
    }
}

/// Varint-count-prefixed sequence of elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqOf<C>(pub C);

impl<C: Codec> Codec for SeqOf<C> {
    type Value = Vec<C::Value>;

    fn encode(&self, value: &Self::Value, writer: &mut ByteWriter) -> ByteResult<()> {
        writer.write_len(value.len())?;
        for item in value {
            self.0.encode(item, writer)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<Self::Value> {
        let count = reader.read_count()?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.0.decode(reader)?);
        }
        Ok(out)
    }
}

/// Varint-count-prefixed set of elements, encoded in ascending order.
///
/// Duplicate elements on the wire collapse on decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOf<C>(pub C);

impl<C> Codec for SetOf<C>
where
    C: Codec,
    C::Value: Ord,
{
    type Value = BTreeSet<C::Value>;

    fn encode(&self, value: &Self::Value, writer: &mut ByteWriter) -> ByteResult<()> {
        writer.write_len(value.len())?;
        for item in value {
            self.0.encode(item, writer)?;
        }
        Ok(())
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<Self::Value> {
        let count = reader.read_count()?;
        let mut out = BTreeSet::new();
        for _ in 0..count {
            out.insert(self.0.decode(reader)?);
        }
        Ok(out)
    }
}

/// Adapts a pair of plain functions into a [`Codec`].
pub struct FnCodec<T> {
    encode: fn(&T, &mut ByteWriter) -> ByteResult<()>,
    decode: fn(&mut ByteReader<'_>) -> ByteResult<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FnCodec<T> {
    #[must_use]
    pub const fn new(
        encode: fn(&T, &mut ByteWriter) -> ByteResult<()>,
        decode: fn(&mut ByteReader<'_>) -> ByteResult<T>,
    ) -> Self {
        Self {
            encode,
            decode,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for FnCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FnCodec<T> {}

impl<T> Codec for FnCodec<T> {
    type Value = T;

    fn encode(&self, value: &T, writer: &mut ByteWriter) -> ByteResult<()> {
        (self.encode)(value, writer)
    }

    fn decode(&self, reader: &mut ByteReader<'_>) -> ByteResult<T> {
        (self.decode)(reader)
    }
}
