//! Byte cursor and primitive codecs for the tether replication protocol.
//!
//! This crate provides [`ByteWriter`] and [`ByteReader`] for little-endian
//! byte-level encoding and decoding, plus the [`Codec`] trait and the
//! primitive/composite codecs payload bodies are built from.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads are bounds-checked; counts are checked against remaining input.
//! - **No domain knowledge** - This crate knows nothing about entities, payloads, or sessions.
//! - **Explicit errors** - Underflow is an error, never a silent truncation.
//!
//! # Example
//!
//! ```
//! use bytestream::{ByteReader, ByteWriter};
//!
//! let mut writer = ByteWriter::new();
//! writer.write_varu32(300);
//! writer.write_str("tether:entity_move").unwrap();
//!
//! let bytes = writer.finish();
//!
//! let mut reader = ByteReader::new(&bytes);
//! assert_eq!(reader.read_varu32().unwrap(), 300);
//! assert_eq!(reader.read_str().unwrap(), "tether:entity_move");
//! ```

mod codec;
mod error;
mod reader;
mod writer;

pub use codec::{
    Codec, FnCodec, SeqOf, SetOf, Str, Uuid128, VarU32, F32, F64, I16, I32, I8, U16, U32, U8,
};
pub use error::{ByteError, ByteResult};
pub use reader::{ByteReader, VARU32_MAX_BYTES};
pub use writer::{varu32_len, ByteWriter, MAX_STR_LEN};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let writer = ByteWriter::new();
        let bytes = writer.finish();
        assert!(bytes.is_empty());

        let reader = ByteReader::new(&bytes);
        assert!(reader.is_empty());
    }

    #[test]
    fn mixed_roundtrip() {
        let id = uuid::Uuid::from_u128(42);
        let mut writer = ByteWriter::new();
        writer.write_u8(0x11);
        writer.write_i16(-2458);
        writer.write_f64(100.6);
        writer.write_varu32(16_384);
        writer.write_str("ns:path").unwrap();
        writer.write_uuid(&id);
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 0x11);
        assert_eq!(reader.read_i16().unwrap(), -2458);
        assert!((reader.read_f64().unwrap() - 100.6).abs() < f64::EPSILON);
        assert_eq!(reader.read_varu32().unwrap(), 16_384);
        assert_eq!(reader.read_str().unwrap(), "ns:path");
        assert_eq!(reader.read_uuid().unwrap(), id);
        assert!(reader.is_empty());
    }
}
