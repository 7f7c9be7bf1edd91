//! Core data structures for legacy database volumes.
//!
//! This module defines the fundamental types used throughout the library:
//! - The parsed index record and its version enumeration
//! - Sequence identifiers and their well-known categories
//! - Definition lines and the decoded per-record header

use std::fmt;

use super::error::{BlastDbError, Result};

/// On-disk format version of an index file.
///
/// Version 5 volumes carry two extra fields (volume number and the name of
/// the LMDB sidecar); everything else is shared with version 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbVersion {
    V4,
    V5,
}

impl TryFrom<u32> for DbVersion {
    type Error = BlastDbError;
    fn try_from(v: u32) -> Result<Self> {
        match v {
            4 => Ok(Self::V4),
            5 => Ok(Self::V5),
            other => Err(BlastDbError::UnsupportedVersion(other)),
        }
    }
}

impl fmt::Display for DbVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DbVersion::V4 => write!(f, "4"),
            DbVersion::V5 => write!(f, "5"),
        }
    }
}

/// The fully parsed index file of one database volume.
///
/// The offset tables hold `num_records + 1` entries each; consecutive
/// entries bracket the `[start, end)` byte range of one record in the
/// companion header or sequence file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbIndex {
    pub version: DbVersion,
    pub is_protein: bool,
    /// Present only in version 5 volumes.
    pub volume_number: Option<u32>,
    pub title: String,
    /// Name of the LMDB sidecar file; version 5 only.
    pub lmdb_name: Option<String>,
    pub creation_date: String,
    pub num_records: u32,
    pub total_residues: u64,
    pub max_length: u32,
    pub header_offsets: Vec<u32>,
    pub sequence_offsets: Vec<u32>,
    /// Present only for nucleotide volumes.
    pub ambiguity_offsets: Option<Vec<u32>>,
}

/// The category of a sequence identifier.
///
/// Identifiers cross-reference one of 20 public databases; anything outside
/// the table decodes as `Unknown` with the raw choice number preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqIdType {
    Local,
    Gibbsq,
    Gibbmt,
    Giim,
    Genbank,
    Embl,
    Pir,
    Swissprot,
    Patent,
    Other,
    General,
    Gi,
    Ddbj,
    Prf,
    Pdb,
    Tpg,
    Tpe,
    Tpd,
    Gpipe,
    NamedAnnotTrack,
    Unknown(u32),
}

impl SeqIdType {
    /// Maps a choice tag number to its identifier category.
    pub fn from_tag_number(number: u32) -> Self {
        match number {
            0 => Self::Local,
            1 => Self::Gibbsq,
            2 => Self::Gibbmt,
            3 => Self::Giim,
            4 => Self::Genbank,
            5 => Self::Embl,
            6 => Self::Pir,
            7 => Self::Swissprot,
            8 => Self::Patent,
            9 => Self::Other,
            10 => Self::General,
            11 => Self::Gi,
            12 => Self::Ddbj,
            13 => Self::Prf,
            14 => Self::Pdb,
            15 => Self::Tpg,
            16 => Self::Tpe,
            17 => Self::Tpd,
            18 => Self::Gpipe,
            19 => Self::NamedAnnotTrack,
            other => Self::Unknown(other),
        }
    }

    /// The public name of this category.
    pub fn name(&self) -> String {
        match self {
            Self::Local => "local".to_string(),
            Self::Gibbsq => "gibbsq".to_string(),
            Self::Gibbmt => "gibbmt".to_string(),
            Self::Giim => "giim".to_string(),
            Self::Genbank => "genbank".to_string(),
            Self::Embl => "embl".to_string(),
            Self::Pir => "pir".to_string(),
            Self::Swissprot => "swissprot".to_string(),
            Self::Patent => "patent".to_string(),
            Self::Other => "other".to_string(),
            Self::General => "general".to_string(),
            Self::Gi => "gi".to_string(),
            Self::Ddbj => "ddbj".to_string(),
            Self::Prf => "prf".to_string(),
            Self::Pdb => "pdb".to_string(),
            Self::Tpg => "tpg".to_string(),
            Self::Tpe => "tpe".to_string(),
            Self::Tpd => "tpd".to_string(),
            Self::Gpipe => "gpipe".to_string(),
            Self::NamedAnnotTrack => "named-annot-track".to_string(),
            Self::Unknown(n) => format!("unknown-{}", n),
        }
    }
}

impl fmt::Display for SeqIdType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One cross-reference identifier attached to a definition line.
///
/// For the `pdb` category the value is the molecule name and the version,
/// when present, is the chain number. Integer-choice categories (e.g. `gi`)
/// carry the decimal form of the integer in `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqId {
    pub id_type: SeqIdType,
    pub value: String,
    pub version: Option<i64>,
}

impl fmt::Display for SeqId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = if self.value.is_empty() {
            "<none>"
        } else {
            self.value.as_str()
        };
        write!(f, "{}:{}", self.id_type, value)?;
        if let Some(version) = self.version {
            write!(f, ".{}", version)?;
        }
        Ok(())
    }
}

/// One definition line decoded from a record's header blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defline {
    pub title: String,
    pub seqids: Vec<SeqId>,
    pub taxid: Option<i64>,
}

impl Defline {
    /// True when at least one field was decoded.
    pub fn is_populated(&self) -> bool {
        !self.title.is_empty() || !self.seqids.is_empty() || self.taxid.is_some()
    }
}

/// All definition lines decoded from one header blob, plus a warning when
/// part of the blob had to be abandoned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeflineSet {
    pub deflines: Vec<Defline>,
    pub warning: Option<String>,
}

/// A fully reconstructed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbRecord {
    /// Ordinal index of the record within the volume.
    pub oid: u32,
    pub deflines: Vec<Defline>,
    /// Set when the header blob only decoded partially.
    pub warning: Option<String>,
    /// Decoded residue letters; `None` for nucleotide volumes.
    pub sequence: Option<String>,
}
