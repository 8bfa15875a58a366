//! diskimageanalyzer - Report on the contents of disk images.
//!
//! Carves the files from every disk image in the source directory, runs
//! Brunnhilde over them, and summarizes each disk in `analysis.csv`.
//! The destination directory is replaced.
//!
//! # Usage
//!
//! ```bash
//! diskimageanalyzer [OPTIONS] <SOURCE> <DESTINATION>
//! ```

use std::path::{self, PathBuf};

use clap::Parser;

use diskimage_toolkit::analyzer::{self, AnalyzerOptions};
use diskimage_toolkit::{SystemRunner, ToolkitConfig, VERSION};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "diskimageanalyzer")]
#[command(version = VERSION)]
#[command(about = "Analyze a directory of disk images and write analysis.csv")]
struct Args {
    /// Directory containing the disk images
    source: PathBuf,

    /// Output directory (replaced if it exists)
    destination: PathBuf,

    /// Export all files, including deleted ones
    #[arg(short, long = "exportall")]
    exportall: bool,

    /// Keep carved files in <DESTINATION>/files
    #[arg(short, long)]
    keepfiles: bool,

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
    let destination = path::absolute(&args.destination)?;
    if destination.starts_with(&source) || source.starts_with(&destination) {
        eprintln!("Error: source and destination directories must not overlap");
        std::process::exit(1);
    }

    let config = ToolkitConfig::load_or_default(args.config.as_deref())?;
    let options = AnalyzerOptions {
        source,
        destination,
        export_all: args.exportall,
        keepfiles: args.keepfiles,
        resforks: args.resforks,
        quiet: args.quiet,
    };

    let summary = analyzer::run(&options, &config, &SystemRunner)?;
    if !summary.unanalyzed.is_empty() {
        eprintln!("Skipped disks: {}", summary.unanalyzed.join(", "));
    }
    Ok(())
}
