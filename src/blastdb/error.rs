//! Custom error types for the blastdb-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum BlastDbError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// A read required more bytes than the buffer still holds.
    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// The data is structurally invalid (bad BER length, indefinite length
    /// on a primitive element, a scan that failed to advance, ...).
    #[error("Bad format: {0}")]
    BadFormat(String),

    /// The index file declares a format version this crate does not read.
    #[error("Unsupported database format version: {0}. Only versions 4 and 5 are supported.")]
    UnsupportedVersion(u32),

    /// An offset-table invariant is violated, or a record range is inverted
    /// or falls outside its companion file.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// The operation only supports protein databases.
    #[error("Unsupported database: {0}")]
    UnsupportedDatabase(String),
}

/// A convenience `Result` type alias using the crate's `BlastDbError` type.
pub type Result<T> = std::result::Result<T, BlastDbError>;
