//! Reader for legacy biological sequence-database volumes.
//!
//! A volume consists of three companion files: an index file (`.pin` /
//! `.nin`), a header-metadata file (`.phr` / `.nhr`), and a raw-sequence
//! file (`.psq` / `.nsq`). This crate parses the index, slices out each
//! record's header blob, decodes the tag-length-value definition lines
//! inside it (title, cross-reference identifiers, optional taxonomy), and
//! maps packed protein residues back to letters.
//!
//! The header decoder is deliberately tolerant: old volumes deviate from
//! the canonical encoding, and a damaged record should cost one record, not
//! the database.
//!
//! # Example
//! ```no_run
//! # use blastdb_reader::VolumeReader;
//! let reader = VolumeReader::open("swissprot.00.pin").unwrap();
//! for result in reader.records() {
//!     let record = result.unwrap();
//!     for line in &record.deflines {
//!         println!("{}: {}", record.oid, line.title);
//!     }
//! }
//! ```

pub mod blastdb;

pub use blastdb::alias::{parse_alias, read_alias_file, AliasInfo};
pub use blastdb::defline::decode_defline_set;
pub use blastdb::error::{BlastDbError, Result};
pub use blastdb::index::parse_index;
pub use blastdb::models::{DbIndex, DbRecord, DbVersion, Defline, DeflineSet, SeqId, SeqIdType};
pub use blastdb::reader::{Records, VolumeReader};
pub use blastdb::sequence::{decode_residue, decode_sequence};
