//! Byte writer for encoding little-endian binary data.

use uuid::Uuid;

use crate::error::{ByteError, ByteResult};

/// Maximum byte length of a `u16`-prefixed string.
pub const MAX_STR_LEN: usize = u16::MAX as usize;

/// A growable byte writer.
///
/// Writes are accumulated in an internal buffer. Call [`finish`](Self::finish)
/// to get the final byte buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    bytes: Vec<u8>,
}

impl ByteWriter {
    /// Creates a new empty `ByteWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `ByteWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
        }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a LEB128 varint `u32` (1 to 5 bytes).
    pub fn write_varu32(&mut self, mut value: u32) {
        while value >= 0x80 {
            self.bytes.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.bytes.push(value as u8);
    }

    /// Writes a `usize` length or count as a varint.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::LengthOverflow`] if `value` does not fit in `u32`.
    pub fn write_len(&mut self, value: usize) -> ByteResult<()> {
        let value = u32::try_from(value).map_err(|_| ByteError::LengthOverflow {
            length: value,
            max: u32::MAX as usize,
        })?;
        self.write_varu32(value);
        Ok(())
    }

    /// Writes a `u16` byte-length prefix followed by the UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::LengthOverflow`] if the string is longer than
    /// [`MAX_STR_LEN`] bytes. Nothing is written in that case.
    pub fn write_str(&mut self, value: &str) -> ByteResult<()> {
        let len = u16::try_from(value.len()).map_err(|_| ByteError::LengthOverflow {
            length: value.len(),
            max: MAX_STR_LEN,
        })?;
        self.write_u16(len);
        self.bytes.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Writes a 128-bit identifier as 16 raw bytes.
    pub fn write_uuid(&mut self, value: &Uuid) {
        self.bytes.extend_from_slice(value.as_bytes());
    }

    /// Appends raw bytes without a prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Finishes writing and returns the byte buffer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Returns the encoded width of a varint `u32`.
#[must_use]
pub const fn varu32_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_writer_is_empty() {
        let writer = ByteWriter::new();
        assert!(writer.is_empty());
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn fixed_width_is_little_endian() {
        let mut writer = ByteWriter::new();
        writer.write_u16(0x1234);
        writer.write_i32(-2);
        assert_eq!(writer.finish(), vec![0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn varint_widths() {
        let cases = [
            (0u32, vec![0x00]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (300, vec![0xAC, 0x02]),
            (u32::MAX, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];
        for (value, expected) in cases {
            let mut writer = ByteWriter::new();
            writer.write_varu32(value);
            assert_eq!(writer.len(), varu32_len(value));
            assert_eq!(writer.finish(), expected, "varint {value}");
        }
    }

    #[test]
    fn string_has_u16_prefix() {
        let mut writer = ByteWriter::new();
        writer.write_str("hi").unwrap();
        assert_eq!(writer.finish(), vec![2, 0, b'h', b'i']);
    }

    #[test]
    fn oversized_string_rejected_without_writing() {
        let long = "x".repeat(MAX_STR_LEN + 1);
        let mut writer = ByteWriter::new();
        let err = writer.write_str(&long).unwrap_err();
        assert!(matches!(err, ByteError::LengthOverflow { .. }));
        assert!(writer.is_empty());
    }

    #[test]
    fn uuid_is_sixteen_raw_bytes() {
        let id = Uuid::from_u128(0x0011_2233_4455_6677_8899_AABB_CCDD_EEFF);
        let mut writer = ByteWriter::new();
        writer.write_uuid(&id);
        let bytes = writer.finish();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[15], 0xFF);
    }
}
