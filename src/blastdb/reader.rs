//! High-level access to one database volume.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::defline;
use super::error::{BlastDbError, Result};
use super::headers;
use super::index;
use super::models::{DbIndex, DbRecord, DeflineSet};
use super::sequence;

/// A fully loaded database volume: the parsed index plus the companion
/// header file and, for protein volumes, the sequence file.
///
/// All three files are read into memory once at open time; afterwards every
/// operation works on read-only slices, so independent records can be
/// decoded from several threads without synchronization.
#[derive(Debug)]
pub struct VolumeReader {
    index: DbIndex,
    header_bytes: Vec<u8>,
    sequence_bytes: Option<Vec<u8>>,
}

impl VolumeReader {
    /// Opens a volume given the path of its index file.
    ///
    /// The companion file paths are derived from the index path: protein
    /// volumes use the `phr`/`psq` extensions, nucleotide volumes
    /// `nhr`/`nsq`. The sequence file is only loaded for protein volumes
    /// (nucleotide sequence decoding is not supported).
    ///
    /// # Errors
    /// Returns an error if any required file cannot be read, the index is
    /// truncated or corrupt, or its version is unsupported.
    pub fn open(index_path: impl AsRef<Path>) -> Result<Self> {
        let index_path = index_path.as_ref();
        info!("Opening volume index: {}", index_path.display());
        let index_bytes = fs::read(index_path)?;
        let index = index::parse_index(&index_bytes)?;

        let header_path =
            companion_path(index_path, if index.is_protein { "phr" } else { "nhr" });
        debug!("Reading header file: {}", header_path.display());
        let header_bytes = fs::read(&header_path)?;

        let sequence_bytes = if index.is_protein {
            let sequence_path = companion_path(index_path, "psq");
            debug!("Reading sequence file: {}", sequence_path.display());
            Some(fs::read(&sequence_path)?)
        } else {
            None
        };

        info!(
            "Volume loaded: \"{}\", {} {} record(s)",
            index.title,
            index.num_records,
            if index.is_protein {
                "protein"
            } else {
                "nucleotide"
            }
        );

        Ok(Self {
            index,
            header_bytes,
            sequence_bytes,
        })
    }

    pub fn index(&self) -> &DbIndex {
        &self.index
    }

    pub fn num_records(&self) -> u32 {
        self.index.num_records
    }

    /// The raw header blob of record `oid`.
    pub fn header_blob(&self, oid: u32) -> Result<&[u8]> {
        headers::header_blob(&self.index, &self.header_bytes, oid)
    }

    /// Decodes the definition lines of record `oid`.
    ///
    /// Partial decode failures inside the blob are reported through
    /// [`DeflineSet::warning`], not as errors.
    pub fn deflines(&self, oid: u32) -> Result<DeflineSet> {
        defline::decode_defline_set(self.header_blob(oid)?)
    }

    /// Decodes the residue letters of record `oid`.
    ///
    /// # Errors
    /// [`BlastDbError::UnsupportedDatabase`] for nucleotide volumes;
    /// [`BlastDbError::CorruptIndex`] when the record's offsets do not fit
    /// the sequence file.
    pub fn sequence(&self, oid: u32) -> Result<String> {
        let data = self.sequence_bytes.as_deref().ok_or_else(|| {
            BlastDbError::UnsupportedDatabase(
                "sequence decoding supports protein volumes only".to_string(),
            )
        })?;

        let i = oid as usize;
        if i + 1 >= self.index.sequence_offsets.len() {
            return Err(BlastDbError::CorruptIndex(format!(
                "record {} is out of range for a volume of {} records",
                oid, self.index.num_records
            )));
        }
        sequence::decode_sequence(
            data,
            self.index.sequence_offsets[i],
            self.index.sequence_offsets[i + 1],
        )
    }

    /// Reconstructs one record: definition lines plus, for protein volumes,
    /// the decoded sequence.
    ///
    /// A header blob that fails to decode outright still yields a record;
    /// the failure becomes the record's warning. Only index-level problems
    /// (bad offsets, missing data) are errors.
    pub fn record(&self, oid: u32) -> Result<DbRecord> {
        let blob = self.header_blob(oid)?;
        let set = match defline::decode_defline_set(blob) {
            Ok(set) => set,
            Err(e) => {
                warn!("Record {}: header blob failed to decode: {}", oid, e);
                DeflineSet {
                    deflines: Vec::new(),
                    warning: Some(e.to_string()),
                }
            }
        };

        let sequence = if self.index.is_protein {
            Some(self.sequence(oid)?)
        } else {
            None
        };

        Ok(DbRecord {
            oid,
            deflines: set.deflines,
            warning: set.warning,
            sequence,
        })
    }

    /// Iterates over every record in on-disk order.
    pub fn records(&self) -> Records<'_> {
        Records {
            reader: self,
            next_oid: 0,
        }
    }
}

/// Derives a companion file path by swapping the index extension.
fn companion_path(index_path: &Path, extension: &str) -> PathBuf {
    index_path.with_extension(extension)
}

/// Iterator over the records of a volume, yielding them in OID order.
///
/// Created by [`VolumeReader::records`].
pub struct Records<'a> {
    reader: &'a VolumeReader,
    next_oid: u32,
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<DbRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_oid >= self.reader.num_records() {
            return None;
        }
        let oid = self.next_oid;
        self.next_oid += 1;
        Some(self.reader.record(oid))
    }
}
