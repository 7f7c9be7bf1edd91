use std::fs;
use std::path::{Path, PathBuf};

use blastdb_reader::{BlastDbError, DbRecord, DbVersion, SeqIdType, VolumeReader};

// --- TLV builders for synthesized header blobs ---

fn element(tag_byte: u8, body: &[u8]) -> Vec<u8> {
    assert!(body.len() < 128, "test builder only emits short-form lengths");
    let mut out = vec![tag_byte, body.len() as u8];
    out.extend_from_slice(body);
    out
}

fn seq(body: &[u8]) -> Vec<u8> {
    element(0x30, body)
}

fn visible(s: &str) -> Vec<u8> {
    element(0x1A, s.as_bytes())
}

fn int(body: &[u8]) -> Vec<u8> {
    element(0x02, body)
}

fn ctx_prim(number: u8, body: &[u8]) -> Vec<u8> {
    element(0x80 | number, body)
}

fn ctx_cons(number: u8, body: &[u8]) -> Vec<u8> {
    element(0xA0 | number, body)
}

fn concat(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.iter().flatten().copied().collect()
}

// --- index-file builder ---

struct IndexSpec<'a> {
    version: u32,
    is_protein: bool,
    title: &'a str,
    date: &'a str,
    total_residues: u64,
    max_length: u32,
    header_offsets: &'a [u32],
    sequence_offsets: &'a [u32],
    ambiguity_offsets: Option<&'a [u32]>,
}

fn build_index(spec: &IndexSpec) -> Vec<u8> {
    let num_records = (spec.header_offsets.len() - 1) as u32;
    let mut data = Vec::new();
    data.extend_from_slice(&spec.version.to_be_bytes());
    data.extend_from_slice(&u32::from(spec.is_protein).to_be_bytes());
    data.extend_from_slice(&(spec.title.len() as u32).to_be_bytes());
    data.extend_from_slice(spec.title.as_bytes());
    data.extend_from_slice(&(spec.date.len() as u32).to_be_bytes());
    data.extend_from_slice(spec.date.as_bytes());
    data.extend_from_slice(&num_records.to_be_bytes());
    // The residue total is the one field stored byte-reversed.
    data.extend_from_slice(&spec.total_residues.to_le_bytes());
    data.extend_from_slice(&spec.max_length.to_be_bytes());
    for table in [Some(spec.header_offsets), Some(spec.sequence_offsets), spec.ambiguity_offsets]
        .into_iter()
        .flatten()
    {
        for &offset in table {
            data.extend_from_slice(&offset.to_be_bytes());
        }
    }
    data
}

// --- fixture volume: three protein records, the last one damaged ---

struct Fixture {
    _dir: tempfile::TempDir,
    index_path: PathBuf,
}

fn protein_fixture() -> Fixture {
    // Record 0: one defline with title, genbank accession, taxid.
    let genbank = ctx_cons(
        4,
        &concat(&[ctx_prim(1, b"NP_000001"), ctx_prim(3, &[0x02])]),
    );
    let blob0 = seq(&seq(&concat(&[
        ctx_cons(0, &visible("alpha protein")),
        ctx_cons(1, &seq(&genbank)),
        ctx_cons(2, &int(&[0x25, 0x86])),
    ])));

    // Record 1: two deflines, a pdb chain and a bare gi number.
    let pdb = ctx_cons(14, &concat(&[visible("2HBS"), int(&[0x05])]));
    let line1 = seq(&concat(&[
        ctx_cons(0, &visible("hemoglobin")),
        ctx_cons(1, &seq(&pdb)),
    ]));
    let line2 = seq(&ctx_cons(1, &seq(&ctx_prim(11, &[0x12, 0x34]))));
    let blob1 = seq(&concat(&[line1, line2]));

    // Record 2: a taxid whose integer claims four bytes but the blob ends
    // after one.
    let blob2: Vec<u8> = vec![0x30, 0x06, 0x30, 0x04, 0x82, 0x04, 0x00];

    let header_bytes = concat(&[blob0.clone(), blob1.clone(), blob2.clone()]);
    let header_offsets = [
        0,
        blob0.len() as u32,
        (blob0.len() + blob1.len()) as u32,
        header_bytes.len() as u32,
    ];

    // MKV / ACD / GG, each NUL-terminated in-band.
    let sequence_bytes = [12u8, 10, 19, 0, 1, 3, 4, 0, 7, 7, 0];
    let sequence_offsets = [0, 4, 8, 11];

    let index_bytes = build_index(&IndexSpec {
        version: 4,
        is_protein: true,
        title: "test volume",
        date: "Jun 1, 2024",
        total_residues: 8,
        max_length: 3,
        header_offsets: &header_offsets,
        sequence_offsets: &sequence_offsets,
        ambiguity_offsets: None,
    });

    write_volume(&index_bytes, &header_bytes, Some(&sequence_bytes), "pin")
}

fn write_volume(
    index_bytes: &[u8],
    header_bytes: &[u8],
    sequence_bytes: Option<&[u8]>,
    index_ext: &str,
) -> Fixture {
    let dir = tempfile::tempdir().expect("create temp dir");
    let index_path = dir.path().join(format!("vol.{}", index_ext));
    fs::write(&index_path, index_bytes).expect("write index file");

    let header_ext = if index_ext == "pin" { "phr" } else { "nhr" };
    fs::write(index_path.with_extension(header_ext), header_bytes).expect("write header file");
    if let Some(bytes) = sequence_bytes {
        fs::write(index_path.with_extension("psq"), bytes).expect("write sequence file");
    }

    Fixture {
        _dir: dir,
        index_path,
    }
}

fn assert_offsets_bracket(offsets: &[u32], file_len: usize) {
    for pair in offsets.windows(2) {
        assert!(pair[0] <= pair[1], "offsets must be non-decreasing");
    }
    assert!(*offsets.last().unwrap() as usize <= file_len);
}

#[test]
fn protein_volume_end_to_end() {
    let fixture = protein_fixture();
    let reader = VolumeReader::open(&fixture.index_path).expect("open volume");

    let index = reader.index();
    assert_eq!(index.version, DbVersion::V4);
    assert!(index.is_protein);
    assert_eq!(index.title, "test volume");
    assert_eq!(index.creation_date, "Jun 1, 2024");
    assert_eq!(index.num_records, 3);
    assert_eq!(index.total_residues, 8);
    assert_eq!(index.max_length, 3);
    assert_eq!(index.header_offsets.len(), 4);
    assert_eq!(index.sequence_offsets.len(), 4);
    assert!(index.ambiguity_offsets.is_none());

    let header_len = *index.header_offsets.last().unwrap() as usize;
    assert_offsets_bracket(&index.header_offsets, header_len);
    assert_offsets_bracket(&index.sequence_offsets, 11);

    // Record 0
    let r0 = reader.record(0).expect("record 0");
    assert!(r0.warning.is_none());
    assert_eq!(r0.deflines.len(), 1);
    assert_eq!(r0.deflines[0].title, "alpha protein");
    assert_eq!(r0.deflines[0].taxid, Some(9606));
    let id = &r0.deflines[0].seqids[0];
    assert_eq!(id.id_type, SeqIdType::Genbank);
    assert_eq!(id.value, "NP_000001");
    assert_eq!(id.version, Some(2));
    assert_eq!(r0.sequence.as_deref(), Some("MKV"));

    // Record 1
    let r1 = reader.record(1).expect("record 1");
    assert!(r1.warning.is_none());
    assert_eq!(r1.deflines.len(), 2);
    assert_eq!(r1.deflines[0].title, "hemoglobin");
    let pdb = &r1.deflines[0].seqids[0];
    assert_eq!(pdb.id_type, SeqIdType::Pdb);
    assert_eq!(pdb.value, "2HBS");
    assert_eq!(pdb.version, Some(5));
    let gi = &r1.deflines[1].seqids[0];
    assert_eq!(gi.id_type, SeqIdType::Gi);
    assert_eq!(gi.value, "4660");
    assert_eq!(r1.sequence.as_deref(), Some("ACD"));

    // Record 2 is damaged but still reported, with a warning.
    let r2 = reader.record(2).expect("record 2");
    assert!(r2.warning.is_some());
    assert!(r2.deflines.is_empty());
    assert_eq!(r2.sequence.as_deref(), Some("GG"));

    // Identifier names satisfy the naming property.
    const KNOWN: &[&str] = &[
        "local",
        "gibbsq",
        "gibbmt",
        "giim",
        "genbank",
        "embl",
        "pir",
        "swissprot",
        "patent",
        "other",
        "general",
        "gi",
        "ddbj",
        "prf",
        "pdb",
        "tpg",
        "tpe",
        "tpd",
        "gpipe",
        "named-annot-track",
    ];
    for record in [&r0, &r1, &r2] {
        for line in &record.deflines {
            for id in &line.seqids {
                let name = id.id_type.name();
                assert!(
                    KNOWN.contains(&name.as_str())
                        || name
                            .strip_prefix("unknown-")
                            .is_some_and(|n| n.parse::<u32>().is_ok()),
                    "unexpected identifier type name: {}",
                    name
                );
            }
        }
    }
}

#[test]
fn iteration_preserves_oid_order() {
    let fixture = protein_fixture();
    let reader = VolumeReader::open(&fixture.index_path).expect("open volume");

    let oids: Vec<u32> = reader
        .records()
        .map(|r| r.expect("record ok").oid)
        .collect();
    assert_eq!(oids, vec![0, 1, 2]);
}

#[test]
fn parallel_decoding_matches_sequential() {
    let fixture = protein_fixture();
    let reader = VolumeReader::open(&fixture.index_path).expect("open volume");

    let sequential: Vec<DbRecord> = reader.records().map(|r| r.expect("record ok")).collect();

    let parallel: Vec<DbRecord> = std::thread::scope(|scope| {
        let reader = &reader;
        let handles: Vec<_> = (0..reader.num_records())
            .map(|oid| scope.spawn(move || reader.record(oid).expect("record ok")))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread ok"))
            .collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn decoding_twice_is_identical() {
    let fixture = protein_fixture();
    let reader = VolumeReader::open(&fixture.index_path).expect("open volume");

    let first: Vec<DbRecord> = reader.records().map(|r| r.expect("record ok")).collect();
    let second: Vec<DbRecord> = reader.records().map(|r| r.expect("record ok")).collect();
    assert_eq!(first, second);
}

#[test]
fn empty_volume_yields_no_records() {
    let index_bytes = build_index(&IndexSpec {
        version: 4,
        is_protein: true,
        title: "empty",
        date: "",
        total_residues: 0,
        max_length: 0,
        header_offsets: &[0],
        sequence_offsets: &[0],
        ambiguity_offsets: None,
    });
    let fixture = write_volume(&index_bytes, &[], Some(&[]), "pin");

    let reader = VolumeReader::open(&fixture.index_path).expect("open volume");
    assert_eq!(reader.num_records(), 0);
    assert_eq!(reader.index().header_offsets.len(), 1);
    assert!(reader.records().next().is_none());
}

#[test]
fn unsupported_version_is_fatal() {
    let mut index_bytes = build_index(&IndexSpec {
        version: 4,
        is_protein: true,
        title: "t",
        date: "d",
        total_residues: 0,
        max_length: 0,
        header_offsets: &[0],
        sequence_offsets: &[0],
        ambiguity_offsets: None,
    });
    index_bytes[..4].copy_from_slice(&3u32.to_be_bytes());
    let fixture = write_volume(&index_bytes, &[], Some(&[]), "pin");

    assert!(matches!(
        VolumeReader::open(&fixture.index_path),
        Err(BlastDbError::UnsupportedVersion(3))
    ));
}

#[test]
fn nucleotide_volume_decodes_headers_but_not_sequences() {
    let blob = seq(&seq(&ctx_cons(0, &visible("some nucleotide"))));
    let index_bytes = build_index(&IndexSpec {
        version: 4,
        is_protein: false,
        title: "nt",
        date: "d",
        total_residues: 4,
        max_length: 4,
        header_offsets: &[0, blob.len() as u32],
        sequence_offsets: &[0, 4],
        ambiguity_offsets: Some(&[0, 0]),
    });
    let fixture = write_volume(&index_bytes, &blob, None, "nin");

    let reader = VolumeReader::open(&fixture.index_path).expect("open volume");
    assert!(!reader.index().is_protein);
    assert_eq!(reader.index().ambiguity_offsets, Some(vec![0, 0]));

    let set = reader.deflines(0).expect("deflines");
    assert_eq!(set.deflines[0].title, "some nucleotide");

    assert!(matches!(
        reader.sequence(0),
        Err(BlastDbError::UnsupportedDatabase(_))
    ));

    let record = reader.record(0).expect("record");
    assert_eq!(record.sequence, None);
}

#[test]
fn missing_header_file_is_an_io_error() {
    let index_bytes = build_index(&IndexSpec {
        version: 4,
        is_protein: true,
        title: "t",
        date: "d",
        total_residues: 0,
        max_length: 0,
        header_offsets: &[0],
        sequence_offsets: &[0],
        ambiguity_offsets: None,
    });
    let dir = tempfile::tempdir().expect("create temp dir");
    let index_path = dir.path().join("orphan.pin");
    fs::write(&index_path, &index_bytes).expect("write index file");

    assert!(matches!(
        VolumeReader::open(&index_path),
        Err(BlastDbError::Io(_))
    ));
}

#[test]
fn header_offsets_past_file_end_surface_as_corrupt_index() {
    let blob = seq(&seq(&ctx_cons(0, &visible("x"))));
    let index_bytes = build_index(&IndexSpec {
        version: 4,
        is_protein: true,
        title: "t",
        date: "d",
        total_residues: 1,
        max_length: 1,
        header_offsets: &[0, blob.len() as u32 + 40],
        sequence_offsets: &[0, 2],
        ambiguity_offsets: None,
    });
    let fixture = write_volume(&index_bytes, &blob, Some(&[1, 0]), "pin");

    let reader = VolumeReader::open(&fixture.index_path).expect("open volume");
    assert!(matches!(
        reader.header_blob(0),
        Err(BlastDbError::CorruptIndex(_))
    ));
}

#[test]
fn open_accepts_canonicalized_paths() {
    let fixture = protein_fixture();
    let absolute = Path::new(&fixture.index_path)
        .canonicalize()
        .expect("canonicalize");
    assert!(VolumeReader::open(absolute).is_ok());
}
