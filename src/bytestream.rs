//! Byte-level little-endian reader and writer for MDF4 blocks.
//!
//! MDF4 stores every block field little-endian and starts every block on
//! an 8-byte boundary. Forward links are written as placeholders and
//! patched once the target offset is known.

use crate::{Error, Result};

/// Block alignment in bytes.
pub const ALIGNMENT: u64 = 8;

/// Writes little-endian fields into a growable byte buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates a new empty `ByteWriter`.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Current write offset, which is also the file offset of the next block.
    #[inline]
    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    #[inline]
    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    #[inline]
    pub fn write_u16(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn write_i16(&mut self, val: i16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn write_u32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn write_u64(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn write_f64(&mut self, val: f64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Schreibt `n` Null-Bytes (Reserved-Felder, Fill-Bytes).
    pub fn write_zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Pads with zero bytes up to the next 8-byte boundary. No-op if aligned.
    pub fn align(&mut self) {
        let rem = self.position() % ALIGNMENT;
        if rem != 0 {
            self.write_zeros((ALIGNMENT - rem) as usize);
        }
    }

    /// Overwrites eight bytes at `offset` with `val`, used to resolve forward links.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 8` lies beyond the bytes written so far.
    pub fn patch_u64(&mut self, offset: u64, val: u64) {
        let start = offset as usize;
        assert!(
            start + 8 <= self.buf.len(),
            "patch at {offset:#x} beyond written length {:#x}",
            self.buf.len()
        );
        self.buf[start..start + 8].copy_from_slice(&val.to_le_bytes());
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the writer and returns the byte buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads little-endian fields from a byte slice with random access.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Springt zu einem absoluten Offset (Link-Aufloesung).
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.data.len() as u64 {
            return Err(Error::InvalidLink(offset));
        }
        self.pos = offset as usize;
        Ok(())
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::PrematureEndOfData {
                offset: self.data.len() as u64,
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Reads a fixed 4-byte block id such as `##CN`.
    pub fn read_id(&mut self) -> Result<[u8; 4]> {
        self.read_array()
    }
}
