use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use blastdb_reader::{Result, VolumeReader};

#[derive(Parser)]
#[command(version)]
#[command(about = "Inspect a legacy sequence-database volume")]
struct Cli {
    /// Volume index file (.pin or .nin)
    index_file: PathBuf,

    /// Directory that receives each record's raw header blob
    output_dir: Option<PathBuf>,

    /// Verbosity
    #[arg(long = "verbose", default_value_t = false)]
    verbose: bool,
}

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
        .module(module_path!())
        .quiet(false)
        .verbosity(log_max_level)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
        .unwrap();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_log(if cli.verbose { 3 } else { 1 });

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let reader = VolumeReader::open(&cli.index_file)?;

    if let Some(dir) = &cli.output_dir {
        dump_header_blobs(&reader, dir)?;
    }

    print_summary(&reader)
}

/// Writes each record's raw header blob to `<dir>/header_<oid>.bin`.
fn dump_header_blobs(reader: &VolumeReader, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for oid in 0..reader.num_records() {
        let blob = reader.header_blob(oid)?;
        fs::write(dir.join(format!("header_{}.bin", oid)), blob)?;
    }
    Ok(())
}

fn print_summary(reader: &VolumeReader) -> Result<()> {
    let index = reader.index();

    println!("Database version : {}", index.version);
    println!(
        "Sequence type    : {}",
        if index.is_protein {
            "protein"
        } else {
            "nucleotide"
        }
    );
    if let Some(volume) = index.volume_number {
        println!("Volume number    : {}", volume);
    }
    println!("Title            : {}", index.title);
    if let Some(lmdb) = &index.lmdb_name {
        println!("LMDB file        : {}", lmdb);
    }
    println!("Date             : {}", index.creation_date);
    println!("Sequences        : {}", index.num_records);
    println!("Total length     : {}", index.total_residues);
    println!("Max sequence len : {}", index.max_length);
    println!();
    println!("Header blocks:");

    for result in reader.records() {
        let record = result?;
        let blob = reader.header_blob(record.oid)?;
        println!("  OID {} -> {} bytes", record.oid, blob.len());

        if record.deflines.is_empty() {
            println!("    (no deflines decoded)");
        }
        for (i, line) in record.deflines.iter().enumerate() {
            let title = if line.title.is_empty() {
                "<no title>"
            } else {
                line.title.as_str()
            };
            println!("    Defline {}: {}", i, title);
            if !line.seqids.is_empty() {
                let ids: Vec<String> = line.seqids.iter().map(|id| id.to_string()).collect();
                println!("      IDs    : {}", ids.join(", "));
            }
            if let Some(taxid) = line.taxid {
                println!("      TaxID  : {}", taxid);
            }
        }
        if let Some(sequence) = &record.sequence {
            println!("      Length : {} residues", sequence.len());
        }
        if let Some(warning) = &record.warning {
            println!("    Warning: partial decode - {}", warning);
            println!("    Raw: {}", hex_preview(blob, 32));
        }
    }

    Ok(())
}

/// First `max_bytes` of a blob as spaced hex, with an ellipsis when cut.
fn hex_preview(data: &[u8], max_bytes: usize) -> String {
    let shown: Vec<String> = data
        .iter()
        .take(max_bytes)
        .map(|b| format!("{:02x}", b))
        .collect();
    let mut out = shown.join(" ");
    if data.len() > max_bytes {
        out.push_str(" ...");
    }
    out
}
