//! Bounds-checked read-only cursor over in-memory file bytes.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::error::{BlastDbError, Result};

/// A read-only position over a byte buffer.
///
/// Every read checks that enough bytes remain before touching the buffer and
/// fails with [`BlastDbError::Truncated`] otherwise; a failed read leaves the
/// position unchanged.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns the next `n` bytes without advancing.
    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        Ok(&self.data[self.pos..self.pos + n])
    }

    /// Reads a big-endian 32-bit word.
    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let value = BigEndian::read_u32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(value)
    }

    /// Reads the 64-bit residue total.
    ///
    /// The legacy layout stores this one field with its eight bytes reversed
    /// relative to everything else in the file: reconstructing it means
    /// walking the bytes back-to-front and shifting left by 8 each step,
    /// which is exactly a little-endian read.
    pub fn read_u64_mixed(&mut self) -> Result<u64> {
        self.ensure(8)?;
        let value = LittleEndian::read_u64(&self.data[self.pos..]);
        self.pos += 8;
        Ok(value)
    }

    /// Reads a length-prefixed string: a big-endian u32 length followed by
    /// that many raw bytes of 8-bit text.
    ///
    /// The bytes are not transcoded; each byte maps to the Unicode scalar
    /// with the same value. The full span (prefix plus contents) is checked
    /// before the position moves.
    pub fn read_length_prefixed_string(&mut self) -> Result<String> {
        self.ensure(4)?;
        let length = BigEndian::read_u32(&self.data[self.pos..]) as usize;
        self.ensure(4 + length)?;
        let bytes = &self.data[self.pos + 4..self.pos + 4 + length];
        self.pos += 4 + length;
        Ok(latin1_to_string(bytes))
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(BlastDbError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Interprets raw 8-bit text without transcoding.
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
