//! Extraction of per-record header blobs from the header file.

use super::error::{BlastDbError, Result};
use super::models::DbIndex;

/// Returns the raw header blob of record `oid`.
///
/// The blob is `header_bytes[header_offsets[oid] .. header_offsets[oid + 1]]`.
/// Fails with [`BlastDbError::CorruptIndex`] when the range is inverted,
/// exceeds the header file, or `oid` is out of range.
pub fn header_blob<'a>(index: &DbIndex, header_bytes: &'a [u8], oid: u32) -> Result<&'a [u8]> {
    let i = oid as usize;
    if i + 1 >= index.header_offsets.len() {
        return Err(BlastDbError::CorruptIndex(format!(
            "record {} is out of range for a volume of {} records",
            oid, index.num_records
        )));
    }

    let start = index.header_offsets[i] as usize;
    let end = index.header_offsets[i + 1] as usize;
    if end < start || end > header_bytes.len() {
        return Err(BlastDbError::CorruptIndex(format!(
            "header offsets for record {} are invalid ({}..{} in a {}-byte file)",
            oid,
            start,
            end,
            header_bytes.len()
        )));
    }

    Ok(&header_bytes[start..end])
}
