//! Bounded little-endian reader with absolute addressing.
//!
//! Container fields refer to each other by absolute file offset, so the
//! reader always works over the whole file and positions are file offsets.
//! A reader may carry a limit below the end of the file; chunk handlers use
//! one so a short payload cannot spill into the next chunk.

use std::rc::Rc;

use crate::error::LoadError;

/// Cursor over the container bytes.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
    /// Absolute offset reads may not cross.
    limit: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at offset 0.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::at(bytes, 0)
    }

    /// Creates a reader positioned at `offset`.
    pub fn at(bytes: &'a [u8], offset: usize) -> Self {
        Self {
            bytes,
            offset,
            limit: bytes.len(),
        }
    }

    /// Creates a reader positioned at `offset` that fails instead of
    /// reading at or past `limit`.
    pub fn bounded(bytes: &'a [u8], offset: usize, limit: usize) -> Self {
        Self {
            bytes,
            offset,
            limit: limit.min(bytes.len()),
        }
    }

    /// Current absolute offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn skip(&mut self, len: usize) {
        self.offset = self.offset.saturating_add(len);
    }

    /// Absolute offset one past the last readable byte.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total length of the underlying data.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LoadError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or_else(|| LoadError::malformed(self.offset, "offset overflow"))?;
        if end > self.limit {
            let what = if self.limit == self.bytes.len() { "data" } else { "chunk" };
            return Err(LoadError::malformed(
                self.offset,
                format!("read of {len} bytes past end of {what}"),
            ));
        }
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or_else(|| LoadError::malformed(self.offset, format!("read of {len} bytes past end of data")))?;
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], LoadError> {
        self.take(len)
    }

    pub fn u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, LoadError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, LoadError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32, LoadError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, LoadError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, LoadError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, LoadError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64, LoadError> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// A 32-bit boolean: any non-zero value is true.
    pub fn bool32(&mut self) -> Result<bool, LoadError> {
        Ok(self.u32()? != 0)
    }

    /// A 4-byte chunk tag.
    pub fn tag(&mut self) -> Result<[u8; 4], LoadError> {
        self.array()
    }

    /// An absolute offset stored as u32.
    pub fn address(&mut self) -> Result<usize, LoadError> {
        Ok(self.u32()? as usize)
    }

    /// A pointer list: `u32 count` followed by `count` absolute offsets.
    pub fn pointer_list(&mut self) -> Result<Vec<usize>, LoadError> {
        let at = self.offset;
        let count = self.u32()? as usize;
        // Each pointer takes 4 bytes, so a count the data cannot hold is
        // rejected before allocating.
        if count > self.limit.saturating_sub(self.offset) / 4 {
            return Err(LoadError::malformed(at, format!("pointer list of {count} entries runs past end of data")));
        }
        (0..count).map(|_| self.address()).collect()
    }

    /// Reads the length-prefixed string whose character data starts at
    /// `address`. Does not move the cursor.
    pub fn string_at(&self, address: usize) -> Result<Rc<str>, LoadError> {
        let start = address
            .checked_sub(4)
            .ok_or_else(|| LoadError::malformed(address, "string pointer below length field"))?;
        let mut reader = ByteReader::at(self.bytes, start);
        let len = reader.u32()? as usize;
        let bytes = reader.take(len)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| LoadError::malformed(address, format!("string is not UTF-8: {e}")))?;
        Ok(Rc::from(text))
    }
}
