//! diskimageprocessor - Package disk images as Submission Information Packages.
//!
//! For every disk image in the source directory, builds a SIP holding the
//! image, the files carved from each of its volumes, DFXML and Brunnhilde
//! reports, then writes a `description.csv` archival description.
//!
//! # Usage
//!
//! ```bash
//! diskimageprocessor [OPTIONS] <SOURCE> <DESTINATION>
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Checksummed SIPs from a directory of floppy images
//! diskimageprocessor /media/transfer/floppies /home/archivist/processed
//!
//! # Bagged SIPs, deleted files included, PII scan
//! diskimageprocessor -b -e -p /media/transfer/floppies /home/archivist/processed
//! ```

use std::path::{self, PathBuf};

use clap::Parser;

use diskimage_toolkit::processor::{self, ProcessorOptions};
use diskimage_toolkit::{SystemRunner, ToolkitConfig, VERSION};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "diskimageprocessor")]
#[command(version = VERSION)]
#[command(about = "Create SIPs and an archival description from a directory of disk images")]
struct Args {
    /// Directory containing the disk images
    source: PathBuf,

    /// Output directory
    destination: PathBuf,

    /// Bag SIPs with bagit.py instead of writing checksum.md5
    #[arg(short, long)]
    bagfiles: bool,

    /// Export all files, including deleted ones
    #[arg(short, long = "exportall")]
    exportall: bool,

    /// Run bulk_extractor PII scan through Brunnhilde
    #[arg(short, long)]
    piiscan: bool,

    /// Export AppleDouble resource forks from HFS-formatted disks
    #[arg(short, long)]
    resforks: bool,

    /// Log errors only
    #[arg(long)]
    quiet: bool,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let source = path::absolute(&args.source)?;
    if !source.is_dir() {
        eprintln!("Error: source {} is not a directory", source.display());
        std::process::exit(1);
    }

    let config = ToolkitConfig::load_or_default(args.config.as_deref())?;
    let options = ProcessorOptions {
        source,
        destination: path::absolute(&args.destination)?,
        bagfiles: args.bagfiles,
        export_all: args.exportall,
        piiscan: args.piiscan,
        resforks: args.resforks,
        quiet: args.quiet,
    };

    let summary = processor::run(&options, &config, &SystemRunner)?;
    if !summary.unprocessed.is_empty() {
        eprintln!("Skipped disks: {}", summary.unprocessed.join(", "));
    }
    Ok(())
}
