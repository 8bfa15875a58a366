//! Disk image processing for digital archives.
//!
//! This crate turns forensic disk images into collections of files with
//! descriptive metadata. It identifies the volumes on a disk, recovers
//! their files with the tool that suits each file system, restores
//! original modification dates, and summarizes what it found.
//!
//! # Features
//!
//! - **Volume parsing**: reads `disktype` reports into [`Volume`] records.
//! - **Carving**: SleuthKit, HFS Explorer or mount-and-copy per file system.
//! - **DFXML**: a streaming reader and a writer for Digital Forensics XML.
//! - **Batch modes**: [`processor`] builds SIPs, [`analyzer`] builds reports.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use diskimage_toolkit::{carve, DiskImage, SystemRunner, Toolbox, ToolkitConfig};
//! use std::path::Path;
//!
//! let config = ToolkitConfig::default();
//! let runner = SystemRunner;
//! let mut image = DiskImage::new("floppy.dd", Toolbox::new(&config, &runner)).unwrap();
//!
//! let volumes = carve::carve_files_from_all_volumes(
//!     &mut image,
//!     Path::new("out/files"),
//!     carve::DiskCarveOptions::default(),
//!     Path::new("out/reports"),
//! )
//! .unwrap();
//! for volume in volumes {
//!     println!("{}: carved={}", volume.output_directory_name, volume.carved);
//! }
//! ```
//!
//! # Module Structure
//!
//! - [`disktype`] - Volume descriptors and file system kinds
//! - [`diskimage`] - Disk image normalization and probing
//! - [`carve`] - Carving strategies
//! - [`walk`] - DFXML for directory trees
//! - [`restore`] - Modification date restoration
//! - [`stats`] - Per-volume and per-disk statistics
//! - [`objects`], [`reader`], [`writer`] - DFXML model and I/O

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod analyzer;
pub mod carve;
pub mod config;
pub mod diskimage;
pub mod disktype;
pub mod error;
pub mod logging;
pub mod objects;
pub mod package;
pub mod processor;
pub mod reader;
pub mod report;
pub mod restore;
pub mod stats;
pub mod tools;
pub mod walk;
pub mod writer;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types at the crate root
pub use config::ToolkitConfig;
pub use diskimage::DiskImage;
pub use disktype::{CarvingStrategy, FileSystem, Volume};
pub use error::{Error, Result};
pub use objects::{DFXMLObject, FileObject, HashType, Hashes, Timestamp};
pub use reader::{parse, parse_file_objects, DFXMLReader, Event};
pub use stats::VolumeStatistics;
pub use tools::{SystemRunner, ToolCommand, ToolRunner, Toolbox};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
