//! Bounds-checked big-endian reads over an in-memory buffer.

use std::borrow::Cow;

use crate::error::{Error, Result};

/// A read position over a borrowed byte buffer.
///
/// The `*_at` methods read at an explicit offset and never move the
/// position; `read_*` read at the position and advance past the value.
/// Every read is checked against the buffer length.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the read position. Seeking to the end is allowed; reads there fail.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(self.out_of_bounds(offset, 0));
        }
        self.pos = offset;
        Ok(())
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.out_of_bounds(offset, len))?;
        Ok(&self.data[offset..end])
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        let b = self.slice(offset, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Three-byte big-endian value, as used for PDB record unique ids.
    pub fn u24_at(&self, offset: usize) -> Result<u32> {
        let b = self.slice(offset, 3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        let b = self.slice(offset, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.u8_at(self.pos)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let v = self.u16_at(self.pos)?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        let v = self.u24_at(self.pos)?;
        self.pos += 3;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self.u32_at(self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    /// Read `len` bytes at the position and advance.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.slice(self.pos, len)?;
        self.pos += len;
        Ok(bytes)
    }

    /// Read a fixed-width string field, stopping at the first NUL.
    ///
    /// Invalid UTF-8 is replaced rather than rejected: header strings in the
    /// wild are frequently garbage and callers only need best-effort text.
    pub fn fixed_string(&self, offset: usize, len: usize) -> Result<Cow<'a, str>> {
        Ok(String::from_utf8_lossy(trim_nul(self.slice(offset, len)?)))
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> Error {
        Error::OutOfBounds {
            offset,
            len,
            size: self.data.len(),
        }
    }
}

/// Cut a byte field at its first NUL.
pub(crate) fn trim_nul(bytes: &[u8]) -> &[u8] {
    match memchr::memchr(0, bytes) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}
