//! Parser for the volume index file.
//!
//! The index file opens with a version word (4 or 5), a sequence-type flag,
//! and a handful of metadata strings, then carries two or three offset
//! tables of `num_records + 1` big-endian words each. Those tables are the
//! only way into the companion header and sequence files.

use log::{debug, warn};

use super::cursor::Cursor;
use super::error::{BlastDbError, Result};
use super::models::{DbIndex, DbVersion};

/// Parses a complete index file.
///
/// Fails with [`BlastDbError::UnsupportedVersion`] for versions other than
/// 4 and 5, [`BlastDbError::Truncated`] when the file ends inside a field,
/// and [`BlastDbError::CorruptIndex`] when the offset tables are unusable.
/// Trailing bytes after the last offset table are tolerated with a warning.
pub fn parse_index(data: &[u8]) -> Result<DbIndex> {
    let mut cursor = Cursor::new(data);

    let version = DbVersion::try_from(cursor.read_u32_be()?)?;
    let seq_type_flag = cursor.read_u32_be()?;
    let is_protein = seq_type_flag == 1;

    let volume_number = if version == DbVersion::V5 {
        Some(cursor.read_u32_be()?)
    } else {
        None
    };

    let title = cursor.read_length_prefixed_string()?;
    let lmdb_name = if version == DbVersion::V5 {
        Some(cursor.read_length_prefixed_string()?)
    } else {
        None
    };
    let creation_date = cursor.read_length_prefixed_string()?;

    let num_records = cursor.read_u32_be()?;
    let total_residues = cursor.read_u64_mixed()?;
    let max_length = cursor.read_u32_be()?;

    debug!(
        "Index header: version={}, type={}, records={}, residues={}",
        version,
        if is_protein { "protein" } else { "nucleotide" },
        num_records,
        total_residues
    );

    let header_offsets = read_offset_table(&mut cursor, num_records)?;
    let sequence_offsets = read_offset_table(&mut cursor, num_records)?;
    let ambiguity_offsets = if !is_protein {
        Some(read_offset_table(&mut cursor, num_records)?)
    } else {
        None
    };

    if cursor.remaining() > 0 {
        // Some legacy volumes append extra data past the last table.
        warn!(
            "Index file has {} trailing bytes after the offset tables; ignoring them",
            cursor.remaining()
        );
    }

    let index = DbIndex {
        version,
        is_protein,
        volume_number,
        title,
        lmdb_name,
        creation_date,
        num_records,
        total_residues,
        max_length,
        header_offsets,
        sequence_offsets,
        ambiguity_offsets,
    };
    validate(&index)?;
    Ok(index)
}

/// Reads `num_records + 1` big-endian words.
fn read_offset_table(cursor: &mut Cursor, num_records: u32) -> Result<Vec<u32>> {
    let count = num_records as usize + 1;
    let mut table = Vec::with_capacity(count);
    for _ in 0..count {
        table.push(cursor.read_u32_be()?);
    }
    Ok(table)
}

fn validate(index: &DbIndex) -> Result<()> {
    if index.num_records == 0 {
        return Ok(());
    }

    if index.sequence_offsets.len() < 2 || index.header_offsets.len() < 2 {
        return Err(BlastDbError::CorruptIndex(
            "offset tables are too short for the declared record count".to_string(),
        ));
    }

    let first = index.sequence_offsets[0];
    let last = index.sequence_offsets[index.num_records as usize];
    if first >= last {
        return Err(BlastDbError::CorruptIndex(format!(
            "sequence offsets do not span any data (first={}, last={})",
            first, last
        )));
    }

    Ok(())
}
