//! Chunk scanning.
//!
//! A container is a sequence of `tag(4) + u32 length + payload` chunks,
//! optionally wrapped in a single `FORM` chunk. The scanner only records
//! boundaries; handlers read payloads later through their own reader, so
//! what a handler consumes never affects where the next chunk starts.

use std::fmt;

use tracing::debug;

use crate::error::LoadError;
use crate::reader::ByteReader;

/// Tag of the wrapper chunk.
pub const FORM: [u8; 4] = *b"FORM";

const HEADER_LEN: usize = 8;

/// Location of one chunk inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub tag: [u8; 4],
    /// Absolute offset of the payload (just past the length field).
    pub offset: usize,
    /// Payload length in bytes.
    pub length: usize,
}

impl Chunk {
    /// Absolute offset one past the payload.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Tag as text. Non-ASCII bytes are replaced.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }

    /// A reader positioned at the start of the payload, bounded to it.
    pub fn reader<'a>(&self, data: &'a [u8]) -> ByteReader<'a> {
        self.reader_at(data, self.offset)
    }

    /// A reader positioned at `address`, bounded to the payload.
    pub fn reader_at<'a>(&self, data: &'a [u8], address: usize) -> ByteReader<'a> {
        ByteReader::bounded(data, address, self.end())
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:#x} ({} bytes)", self.name(), self.offset, self.length)
    }
}

/// Scan the chunk sequence in `data[start..end]`.
pub fn scan_chunks(data: &[u8], start: usize, end: usize) -> Result<Vec<Chunk>, LoadError> {
    if end > data.len() {
        return Err(LoadError::malformed(start, "chunk sequence runs past end of data"));
    }
    let mut chunks = Vec::new();
    let mut reader = ByteReader::at(data, start);
    while reader.offset() < end {
        let at = reader.offset();
        if end - at < HEADER_LEN {
            return Err(LoadError::malformed(at, "truncated chunk header"));
        }
        let tag = reader.tag()?;
        let length = reader.u32()? as usize;
        let offset = reader.offset();
        if length > end - offset {
            return Err(LoadError::malformed(
                at,
                format!(
                    "chunk {} declares {length} bytes but only {} remain",
                    String::from_utf8_lossy(&tag),
                    end - offset
                ),
            ));
        }
        let chunk = Chunk {
            tag,
            offset,
            length,
        };
        debug!(%chunk, "found chunk");
        chunks.push(chunk);
        reader.seek(offset + length);
    }
    Ok(chunks)
}

/// Scan a whole container, unwrapping a leading `FORM` chunk.
pub fn read_chunks(data: &[u8]) -> Result<Vec<Chunk>, LoadError> {
    if data.len() >= HEADER_LEN && data[..4] == FORM {
        let form = scan_chunks(data, 0, HEADER_LEN + read_form_length(data)?)?;
        let Some(form) = form.first() else {
            return Ok(Vec::new());
        };
        if form.end() < data.len() {
            debug!(trailing = data.len() - form.end(), "ignoring bytes after FORM");
        }
        return scan_chunks(data, form.offset, form.end());
    }
    scan_chunks(data, 0, data.len())
}

fn read_form_length(data: &[u8]) -> Result<usize, LoadError> {
    let mut reader = ByteReader::at(data, 4);
    let length = reader.u32()? as usize;
    if length > data.len() - HEADER_LEN {
        return Err(LoadError::malformed(
            0,
            format!("FORM declares {length} bytes but only {} remain", data.len() - HEADER_LEN),
        ));
    }
    Ok(length)
}
