//! Parser for database alias files.
//!
//! Alias files are line-oriented text: `#` starts a comment, the first
//! whitespace run on a line separates the key from its value. The `DBLIST`
//! key enumerates member volumes; every other key is free-form metadata.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::info;

use super::error::{BlastDbError, Result};

/// The parsed contents of one alias file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasInfo {
    /// Member volume names, in declaration order.
    pub volumes: Vec<String>,
    /// All keys other than `DBLIST`.
    pub metadata: HashMap<String, String>,
}

/// Reads and parses an alias file from disk.
pub fn read_alias_file(path: impl AsRef<Path>) -> Result<AliasInfo> {
    let path = path.as_ref();
    info!("Reading alias file: {}", path.display());
    let text = fs::read_to_string(path)?;
    parse_alias(&text)
}

/// Parses alias-file text.
///
/// Fails with [`BlastDbError::BadFormat`] on a keyless or valueless line,
/// an empty `DBLIST`, or a duplicated metadata key; the message names the
/// offending line.
pub fn parse_alias(text: &str) -> Result<AliasInfo> {
    let mut info = AliasInfo::default();

    for (line_number, raw_line) in text.lines().enumerate() {
        let line_number = line_number + 1;
        let line = match raw_line.find('#') {
            Some(comment) => &raw_line[..comment],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => {
                return Err(BlastDbError::BadFormat(format!(
                    "alias line {} is missing a value: {}",
                    line_number, line
                )))
            }
        };
        if value.is_empty() {
            return Err(BlastDbError::BadFormat(format!(
                "alias line {} has an empty value: {}",
                line_number, line
            )));
        }

        if key == "DBLIST" {
            let volumes: Vec<String> = value.split_whitespace().map(str::to_string).collect();
            if volumes.is_empty() {
                return Err(BlastDbError::BadFormat(format!(
                    "DBLIST on line {} does not list any volumes",
                    line_number
                )));
            }
            info.volumes.extend(volumes);
            continue;
        }

        if info.metadata.contains_key(key) {
            return Err(BlastDbError::BadFormat(format!(
                "duplicate alias key '{}' on line {}",
                key, line_number
            )));
        }
        info.metadata.insert(key.to_string(), value.to_string());
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_volumes_and_metadata() {
        let text = "\
# nightly build
TITLE Example database
DBLIST vol.00 vol.01
DBLIST vol.02
NSEQ 1234
";
        let info = parse_alias(text).unwrap();
        assert_eq!(info.volumes, vec!["vol.00", "vol.01", "vol.02"]);
        assert_eq!(info.metadata.get("TITLE").unwrap(), "Example database");
        assert_eq!(info.metadata.get("NSEQ").unwrap(), "1234");
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "\n  # full-line comment\nTITLE db # trailing comment\n\n";
        let info = parse_alias(text).unwrap();
        assert_eq!(info.metadata.get("TITLE").unwrap(), "db");
        assert!(info.volumes.is_empty());
    }

    #[test]
    fn keyless_line_fails() {
        let err = parse_alias("JUSTAKEY\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn duplicate_key_fails() {
        let err = parse_alias("TITLE a\nTITLE b\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_value_after_comment_strip_fails() {
        assert!(parse_alias("TITLE   # only a comment\n").is_err());
    }
}
