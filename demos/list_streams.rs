//! Command-line tool for inspecting Windows Installer packages.
//!
//! Prints the storage/stream hierarchy of an .msi, .msp or .mst file, marks
//! streams holding cabinet archives, and optionally extracts one stream.
//!
//! # Usage
//!
//! List the hierarchy:
//! ```sh
//! cargo run --example list_streams -- update.msp
//! ```
//!
//! Extract a stream by path, using raw or decoded names:
//! ```sh
//! cargo run --example list_streams -- update.msp --extract PCW_CAB_NetFX -o netfx.cab
//! ```

use clap::Parser;
use msiole::ole::{CompoundFile, Storage, decode_msi_name};
use std::fs::File;
use std::path::PathBuf;

/// Inspect the structured storage of an installer package
#[derive(Parser, Debug)]
#[command(name = "list_streams", version)]
struct Args {
    /// Package to inspect
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Stream to extract, as a '/'-separated path of raw or decoded entry names
    #[arg(long, value_name = "PATH", requires = "output")]
    extract: Option<String>,

    /// Destination file for --extract
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Show raw entry names instead of decoded installer names
    #[arg(long)]
    raw: bool,
}

fn print_storage(storage: Storage<'_, File>, depth: usize, raw: bool) -> msiole::Result<()> {
    let indent = "  ".repeat(depth);
    for stream in storage.streams()? {
        let name = if raw {
            stream.name().to_string()
        } else {
            stream.display_name()
        };
        let marker = if stream.is_cabinet()? { " [cabinet]" } else { "" };
        println!("{}{} ({} bytes){}", indent, name, stream.len(), marker);
    }
    for sub in storage.sub_storages()? {
        println!("{}{}/", indent, sub.name());
        print_storage(sub, depth + 1, raw)?;
    }
    Ok(())
}

/// Find the raw path of the stream whose components match `path`, either
/// literally or after installer name decoding.
fn resolve_path(package: &CompoundFile<File>, path: &str) -> msiole::Result<Vec<String>> {
    let wanted: Vec<&str> = path.split('/').collect();
    let matches = |raw: &[String]| {
        raw.len() == wanted.len()
            && raw
                .iter()
                .zip(&wanted)
                .all(|(raw, want)| raw == want || decode_msi_name(raw) == *want)
    };
    package
        .list_streams()?
        .into_iter()
        .find(|raw| matches(raw))
        .ok_or_else(|| msiole::Error::ComponentNotFound(path.to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let package = CompoundFile::open(&args.input)?;

    println!("{} ({:?})", args.input.display(), package.package_kind());

    if let (Some(path), Some(output)) = (&args.extract, &args.output) {
        let raw = resolve_path(&package, path)?;
        let parts: Vec<&str> = raw.iter().map(String::as_str).collect();
        let stream = package.stream_at(&parts)?;
        let mut out = File::create(output)?;
        let bytes = stream.copy_to(&mut out)?;
        println!("wrote {} bytes to {}", bytes, output.display());
    } else {
        print_storage(package.root()?, 1, args.raw)?;
    }

    package.close();
    Ok(())
}
