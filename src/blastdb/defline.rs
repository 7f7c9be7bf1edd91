//! Tolerant decoder for the per-record header blob.
//!
//! A blob is a universal SEQUENCE of definition lines; each line is itself a
//! SEQUENCE whose fields carry context-specific tags: 0 = title (wrapped
//! string), 1 = identifier list, 2 = taxonomy integer. Old volumes deviate
//! from the canonical schema in the string types they use and in how deeply
//! the title is wrapped, so the decoder prefers recovering data over
//! validating shape: unknown elements are skipped, a failed wrapper parse
//! falls back to a permissive scan, and a broken definition line surrenders
//! only itself.

use log::debug;

use super::ber::{BerReader, Class, Length, Tag};
use super::error::{BlastDbError, Result};
use super::models::{Defline, DeflineSet, SeqId, SeqIdType};

/// Depth cap for the permissive string scan.
const MAX_SCAN_DEPTH: usize = 64;

/// Decodes every definition line in one header blob.
///
/// Fails only when the blob does not even open with a definition-line
/// sequence; anything that goes wrong further in is recovered into
/// [`DeflineSet::warning`] and the lines decoded so far are returned.
pub fn decode_defline_set(blob: &[u8]) -> Result<DeflineSet> {
    let mut r = BerReader::new(blob);

    let outer_tag = r.read_tag()?;
    if !outer_tag.is_universal(16) || !outer_tag.constructed {
        return Err(BlastDbError::BadFormat(
            "header blob does not start with a definition-line sequence".to_string(),
        ));
    }
    let outer_len = r.read_length()?;
    let outer_indef = outer_len.is_indefinite();
    let outer_end = outer_len.end_or(r.position(), r.len());

    let mut set = DeflineSet::default();

    loop {
        if outer_indef && r.at_eoc() {
            r.consume_eoc();
            break;
        }
        if !outer_indef && r.position() >= outer_end {
            break;
        }

        let line_start = r.position();
        let def_tag = match r.read_tag() {
            Ok(tag) => tag,
            Err(e) => {
                attach_warning(&mut set, &e);
                break;
            }
        };

        if !def_tag.is_universal(16) || !def_tag.constructed {
            // Not a definition line; step over the whole element.
            r.seek(line_start);
            if let Err(e) = r.skip_element() {
                attach_warning(&mut set, &e);
                break;
            }
            continue;
        }

        let def_len = match r.read_length() {
            Ok(len) => len,
            Err(e) => {
                attach_warning(&mut set, &e);
                break;
            }
        };
        let def_indef = def_len.is_indefinite();
        let def_end = def_len.end_or(r.position(), r.len());

        let mut line = Defline::default();
        match parse_defline_fields(&mut r, def_indef, def_end, &mut line) {
            Ok(()) => set.deflines.push(line),
            Err(e) => {
                attach_warning(&mut set, &e);
                if line.is_populated() {
                    set.deflines.push(line);
                }
                // A definite line end lets decoding resume at the next line;
                // without one there is no safe place to continue from.
                if !def_indef && def_end <= r.len() {
                    r.seek(def_end);
                    continue;
                }
                break;
            }
        }
    }

    debug!(
        "Decoded {} definition line(s) from a {}-byte blob{}",
        set.deflines.len(),
        blob.len(),
        if set.warning.is_some() {
            " (partial)"
        } else {
            ""
        }
    );
    Ok(set)
}

fn attach_warning(set: &mut DeflineSet, error: &BlastDbError) {
    if set.warning.is_none() {
        set.warning = Some(error.to_string());
    }
}

/// Parses the context-tagged fields of one definition line.
fn parse_defline_fields(
    r: &mut BerReader,
    indefinite: bool,
    end: usize,
    line: &mut Defline,
) -> Result<()> {
    loop {
        if indefinite && r.at_eoc() {
            r.consume_eoc();
            return Ok(());
        }
        if !indefinite && r.position() >= end {
            return Ok(());
        }

        let field_start = r.position();
        let tag = r.read_tag()?;
        if tag.class != Class::ContextSpecific {
            r.seek(field_start);
            r.skip_element()?;
            continue;
        }

        match tag.number {
            0 => {
                let len = r.read_length()?;
                line.title = match (tag.constructed, len) {
                    (false, Length::Definite(n)) => r.read_string(n)?,
                    _ => parse_explicit_string(r, len)?,
                };
            }
            1 => {
                line.seqids = parse_seqid_field(r)?;
            }
            2 => {
                let len = r.read_length()?;
                line.taxid = Some(match (tag.constructed, len) {
                    (false, Length::Definite(n)) => r.read_integer(n)?,
                    _ => parse_explicit_integer(r, len)?,
                });
            }
            _ => {
                r.seek(field_start);
                r.skip_element()?;
            }
        }
    }
}

/// The universal tag numbers accepted as string payloads.
///
/// Titles are usually VisibleString (26), but older volumes use other
/// string encodings; all of them are accepted.
fn is_string_like(tag: &Tag) -> bool {
    tag.class == Class::Universal
        && matches!(tag.number, 12 | 18 | 19 | 20 | 21 | 22 | 25 | 26 | 27 | 28 | 29 | 30)
}

/// Parses the single string expected inside an explicit wrapper.
///
/// Constructed string-likes are concatenations of their primitive chunks;
/// non-string children are skipped.
fn parse_wrapped_string(r: &mut BerReader) -> Result<String> {
    let inner_tag = r.read_tag()?;
    let inner_len = r.read_length()?;
    if !is_string_like(&inner_tag) {
        return Err(BlastDbError::BadFormat(
            "expected a string inside the wrapper".to_string(),
        ));
    }

    if !inner_tag.constructed {
        return match inner_len {
            Length::Definite(n) => r.read_string(n),
            Length::Indefinite => Err(BlastDbError::BadFormat(
                "indefinite length on a primitive string".to_string(),
            )),
        };
    }

    let inner_indef = inner_len.is_indefinite();
    let inner_end = inner_len.end_or(r.position(), r.len());
    let mut combined = String::new();

    loop {
        if inner_indef && r.at_eoc() {
            r.consume_eoc();
            break;
        }
        if !inner_indef && r.position() >= inner_end {
            break;
        }

        let chunk_start = r.position();
        let chunk_tag = r.read_tag()?;
        let chunk_len = r.read_length()?;
        match (is_string_like(&chunk_tag) && !chunk_tag.constructed, chunk_len) {
            (true, Length::Definite(n)) => combined.push_str(&r.read_string(n)?),
            _ => {
                r.seek(chunk_start);
                r.skip_element()?;
            }
        }
    }

    if !inner_indef && r.position() < inner_end {
        r.seek(inner_end);
    }

    Ok(combined)
}

/// Walks a wrapper's body and returns the first string-like payload found,
/// skipping everything else.
///
/// This is the fallback for wrappers that nest extra layers or order their
/// contents unexpectedly. Every iteration checks that the position moved.
fn scan_for_string(r: &mut BerReader, limit: usize, depth: usize) -> Result<Option<String>> {
    if depth > MAX_SCAN_DEPTH {
        return Err(BlastDbError::BadFormat(format!(
            "string scan nests deeper than {} levels",
            MAX_SCAN_DEPTH
        )));
    }

    while r.position() < limit {
        if r.at_eoc() {
            r.consume_eoc();
            break;
        }

        let element_start = r.position();
        let tag = r.read_tag()?;
        let len = r.read_length()?;

        if is_string_like(&tag) {
            if tag.constructed {
                let indef = len.is_indefinite();
                let end = len.end_or(r.position(), limit);
                if let Some(inner) = scan_for_string(r, end, depth + 1)? {
                    return Ok(Some(inner));
                }
                if !indef && r.position() < end {
                    r.seek(end);
                }
            } else {
                match len {
                    Length::Definite(n) => return Ok(Some(r.read_string(n)?)),
                    Length::Indefinite => {
                        return Err(BlastDbError::BadFormat(
                            "indefinite length on a primitive string".to_string(),
                        ))
                    }
                }
            }
        } else if len.is_indefinite() {
            if !tag.constructed {
                return Err(BlastDbError::BadFormat(
                    "indefinite length on a primitive element".to_string(),
                ));
            }
            loop {
                if r.at_eoc() {
                    r.consume_eoc();
                    break;
                }
                if r.position() >= limit {
                    return Err(BlastDbError::BadFormat(
                        "unterminated indefinite element".to_string(),
                    ));
                }
                let before = r.position();
                if let Some(inner) = scan_for_string(r, limit, depth + 1)? {
                    return Ok(Some(inner));
                }
                if r.position() <= before {
                    return Err(BlastDbError::BadFormat(
                        "failed to advance while scanning for a string".to_string(),
                    ));
                }
            }
        } else {
            match len {
                Length::Definite(n) => r.skip(n)?,
                Length::Indefinite => unreachable!(),
            }
        }

        if r.position() <= element_start {
            return Err(BlastDbError::BadFormat(
                "failed to advance while scanning for a string".to_string(),
            ));
        }
    }

    Ok(None)
}

/// Parses the string inside an explicit wrapper whose length is `len`,
/// falling back to the permissive scan when the direct parse fails, and
/// consuming the remainder of the wrapper either way.
fn parse_explicit_string(r: &mut BerReader, len: Length) -> Result<String> {
    let start = r.position();
    let end = len.end_or(start, r.len());

    let result = match parse_wrapped_string(r) {
        Ok(s) => s,
        Err(_) => {
            r.seek(start);
            scan_for_string(r, end, 0)?.unwrap_or_default()
        }
    };

    match len {
        Length::Indefinite => {
            while r.position() < end && !r.at_eoc() {
                r.skip_element()?;
            }
            if r.at_eoc() {
                r.consume_eoc();
            }
        }
        Length::Definite(_) => {
            if r.position() < end {
                r.seek(end);
            }
        }
    }

    Ok(result)
}

/// Parses the universal integer inside an explicit wrapper and consumes the
/// remainder of the wrapper.
fn parse_explicit_integer(r: &mut BerReader, len: Length) -> Result<i64> {
    let start = r.position();
    let inner_tag = r.read_tag()?;
    let inner_len = r.read_length()?;

    let value = match (inner_tag.is_universal(2) && !inner_tag.constructed, inner_len) {
        (true, Length::Definite(n)) => r.read_integer(n)?,
        _ => {
            return Err(BlastDbError::BadFormat(
                "expected an integer inside the wrapper".to_string(),
            ))
        }
    };

    match len {
        Length::Indefinite => {
            while !r.at_eoc() {
                r.skip_element()?;
            }
            r.consume_eoc();
        }
        Length::Definite(n) => {
            let end = start + n;
            if r.position() < end {
                r.seek(end);
            }
        }
    }

    Ok(value)
}

/// Skips the body of an element whose tag and length are already consumed.
fn skip_body(r: &mut BerReader, len: Length) -> Result<()> {
    match len {
        Length::Definite(n) => r.skip(n),
        Length::Indefinite => {
            while !r.at_eoc() {
                r.skip_element()?;
            }
            r.consume_eoc();
            Ok(())
        }
    }
}

/// Parses the identifier-list field: a wrapper holding a universal SEQUENCE
/// of identifier variants. Trailing wrapper content is consumed.
fn parse_seqid_field(r: &mut BerReader) -> Result<Vec<SeqId>> {
    let len = r.read_length()?;
    let start = r.position();

    let ids = parse_seqid_list(r)?;

    match len {
        Length::Indefinite => {
            while !r.at_eoc() {
                r.skip_element()?;
            }
            r.consume_eoc();
        }
        Length::Definite(n) => {
            let end = start + n;
            if r.position() < end {
                r.seek(end);
            }
        }
    }

    Ok(ids)
}

fn parse_seqid_list(r: &mut BerReader) -> Result<Vec<SeqId>> {
    let tag = r.read_tag()?;
    if !tag.is_universal(16) || !tag.constructed {
        return Err(BlastDbError::BadFormat(
            "expected a sequence of identifiers".to_string(),
        ));
    }

    let len = r.read_length()?;
    let indefinite = len.is_indefinite();
    let end = len.end_or(r.position(), r.len());

    let mut ids = Vec::new();
    loop {
        if indefinite && r.at_eoc() {
            r.consume_eoc();
            break;
        }
        if !indefinite && r.position() >= end {
            break;
        }
        ids.push(parse_seqid(r)?);
    }
    Ok(ids)
}

/// Parses one identifier variant, selected by its context-specific tag
/// number.
///
/// Primitive variants carry an integer whose decimal form becomes the
/// value; constructed tag 14 is the structural-database variant; any other
/// constructed tag is decoded as a text-style identifier. When structured
/// decoding yields no value at all, the longest identifier-looking run in
/// the element's raw bytes is used instead.
fn parse_seqid(r: &mut BerReader) -> Result<SeqId> {
    let seqid_start = r.position();
    let tag = r.read_tag()?;
    if tag.class != Class::ContextSpecific {
        return Err(BlastDbError::BadFormat(
            "identifier uses an unexpected tag class".to_string(),
        ));
    }

    let mut id = if tag.constructed {
        if tag.number == 14 {
            parse_pdb_seqid(r)?
        } else {
            parse_text_seqid(r)?
        }
    } else {
        let len = r.read_length()?;
        match len {
            Length::Definite(n) => SeqId {
                id_type: SeqIdType::Unknown(0),
                value: r.read_integer(n)?.to_string(),
                version: None,
            },
            Length::Indefinite => {
                return Err(BlastDbError::BadFormat(
                    "indefinite length on a primitive identifier".to_string(),
                ))
            }
        }
    };
    id.id_type = SeqIdType::from_tag_number(tag.number);

    if id.value.is_empty() {
        if let Some(best) = longest_identifier_run(r.span(seqid_start, r.position())) {
            id.value = best;
        }
    }

    Ok(id)
}

/// Structural-database identifier: the body holds the molecule name as a
/// universal-26 string and the chain number as a universal-2 integer.
fn parse_pdb_seqid(r: &mut BerReader) -> Result<SeqId> {
    let len = r.read_length()?;
    let indefinite = len.is_indefinite();
    let end = len.end_or(r.position(), r.len());

    let mut value = String::new();
    let mut version = None;

    loop {
        if indefinite && r.at_eoc() {
            r.consume_eoc();
            break;
        }
        if !indefinite && r.position() >= end {
            break;
        }

        let field_tag = r.read_tag()?;
        let field_len = match r.read_length()? {
            Length::Definite(n) => n,
            Length::Indefinite => {
                return Err(BlastDbError::BadFormat(
                    "indefinite length inside a structural identifier".to_string(),
                ))
            }
        };

        if field_tag.is_universal(26) && value.is_empty() {
            value = r.read_string(field_len)?;
        } else if field_tag.is_universal(2) && version.is_none() {
            version = Some(r.read_integer(field_len)?);
        } else {
            r.skip(field_len)?;
        }
    }

    Ok(SeqId {
        id_type: SeqIdType::Pdb,
        value,
        version,
    })
}

/// Text-style identifier: context tags 0 and 1 both carry the value string
/// (1 wins when both are present), tag 3 carries the version integer.
fn parse_text_seqid(r: &mut BerReader) -> Result<SeqId> {
    let len = r.read_length()?;
    let indefinite = len.is_indefinite();
    let end = len.end_or(r.position(), r.len());

    let mut id = SeqId {
        id_type: SeqIdType::Unknown(0),
        value: String::new(),
        version: None,
    };

    loop {
        if indefinite && r.at_eoc() {
            r.consume_eoc();
            break;
        }
        if !indefinite && r.position() >= end {
            break;
        }

        let tag = r.read_tag()?;
        let field_len = r.read_length()?;

        match tag.number {
            0 if id.value.is_empty() => {
                id.value = match (tag.constructed, field_len) {
                    (false, Length::Definite(n)) => r.read_string(n)?,
                    _ => parse_explicit_string(r, field_len)?,
                };
            }
            1 => {
                id.value = match (tag.constructed, field_len) {
                    (false, Length::Definite(n)) => r.read_string(n)?,
                    _ => parse_explicit_string(r, field_len)?,
                };
            }
            3 => {
                id.version = Some(match (tag.constructed, field_len) {
                    (false, Length::Definite(n)) => r.read_integer(n)?,
                    _ => parse_explicit_integer(r, field_len)?,
                });
            }
            _ => skip_body(r, field_len)?,
        }
    }

    Ok(id)
}

/// Longest run of `[A-Za-z0-9_.]` in the raw element bytes; the last-resort
/// value for identifiers whose structure decoded to nothing.
fn longest_identifier_run(bytes: &[u8]) -> Option<String> {
    let is_id_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'.';

    let mut best: &[u8] = &[];
    let mut run_start = None;
    for (i, &b) in bytes.iter().enumerate() {
        if is_id_byte(b) {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            if i - start > best.len() {
                best = &bytes[start..i];
            }
        }
    }
    if let Some(start) = run_start {
        if bytes.len() - start > best.len() {
            best = &bytes[start..];
        }
    }

    if best.is_empty() {
        None
    } else {
        Some(best.iter().map(|&b| b as char).collect())
    }
}
