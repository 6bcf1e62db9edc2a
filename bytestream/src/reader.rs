//! Byte reader with bounded operations.

use uuid::Uuid;

use crate::error::{ByteError, ByteResult};

/// Maximum encoded width of a varint `u32`.
pub const VARU32_MAX_BYTES: usize = 5;

/// A byte reader for decoding little-endian binary data.
///
/// All read operations are bounds-checked and return errors on failure.
/// The reader never panics on malformed input.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` from a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of bytes remaining to read.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bytes to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the current byte position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the unread tail without consuming it.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_u8(&mut self) -> ByteResult<u8> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    pub fn read_i8(&mut self) -> ByteResult<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> ByteResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> ByteResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> ByteResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> ByteResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> ByteResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> ByteResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> ByteResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads a LEB128 varint `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`ByteError::InvalidVarint`] if the continuation bit is still
    /// set after [`VARU32_MAX_BYTES`] bytes.
    pub fn read_varu32(&mut self) -> ByteResult<u32> {
        let mut result = 0u32;
        for shift in (0..VARU32_MAX_BYTES * 7).step_by(7) {
            let byte = self.read_u8()?;
            // The fifth byte holds only the top four bits of a u32.
            if shift == 28 && byte & 0x70 != 0 {
                return Err(ByteError::InvalidVarint);
            }
            result |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ByteError::InvalidVarint)
    }

    /// Reads a varint element count, rejecting counts that cannot possibly
    /// be backed by the remaining input.
    pub fn read_count(&mut self) -> ByteResult<usize> {
        let count = self.read_varu32()? as usize;
        let remaining = self.remaining();
        if count > remaining {
            return Err(ByteError::CountExceedsRemaining { count, remaining });
        }
        Ok(count)
    }

    /// Reads a `u16`-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> ByteResult<&'a str> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| ByteError::InvalidUtf8)
    }

    /// Reads a 128-bit identifier from 16 raw bytes.
    pub fn read_uuid(&mut self) -> ByteResult<Uuid> {
        Ok(Uuid::from_bytes(self.read_array()?))
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> ByteResult<&'a [u8]> {
        self.ensure(len)?;
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn ensure(&self, bytes: usize) -> ByteResult<()> {
        let available = self.remaining();
        if bytes > available {
            return Err(ByteError::UnexpectedEof {
                requested: bytes,
                available,
            });
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> ByteResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}
