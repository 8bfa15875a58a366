//! Processor mode: one SIP per disk image plus `description.csv`.
//!
//! ```text
//! <destination>/
//!   diskimageprocessor.log
//!   description.csv
//!   SIPs/<image>/objects/{diskimage,files}/
//!   SIPs/<image>/metadata/{checksum.md5,submissionDocumentation/}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::carve::{carve_files_from_all_volumes, normalize_permissions, DiskCarveOptions};
use crate::config::ToolkitConfig;
use crate::diskimage::{is_disk_image_name, DiskImage};
use crate::disktype::{CarvingStrategy, Volume};
use crate::error::Result;
use crate::logging::RunLogger;
use crate::package::{
    copy_image_family, run_brunnhilde, write_checksum_manifest, SipLayout, SIP_DIR_MODE,
    SIP_FILE_MODE,
};
use crate::report::{create_spreadsheet, read_top_formats, DESCRIPTION_HEADER};
use crate::stats::{combine, convert_size, find_dfxml_documents, summarize_document};
use crate::tools::{ToolRunner, Toolbox};

/// Name of the run log written to the destination.
pub const LOG_FILE_NAME: &str = "diskimageprocessor.log";

/// Processor run settings.
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Directory holding the disk images
    pub source: PathBuf,
    /// Output directory
    pub destination: PathBuf,
    /// Bag SIPs instead of writing `checksum.md5`
    pub bagfiles: bool,
    /// Carve unallocated files too
    pub export_all: bool,
    /// Have Brunnhilde run bulk_extractor
    pub piiscan: bool,
    /// Export HFS resource forks as AppleDouble files
    pub resforks: bool,
    /// Log errors only
    pub quiet: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorSummary {
    /// Images that produced a SIP with carved files
    pub processed: Vec<String>,
    /// Images that were attempted but not fully processed
    pub unprocessed: Vec<String>,
    /// The description spreadsheet
    pub spreadsheet: PathBuf,
}

struct DiskRecord {
    name: String,
    layout: SipLayout,
    volumes: Vec<Volume>,
}

/// Processes every disk image in `options.source`.
pub fn run(
    options: &ProcessorOptions,
    config: &ToolkitConfig,
    runner: &dyn ToolRunner,
) -> Result<ProcessorSummary> {
    let sips = options.destination.join("SIPs");
    fs::create_dir_all(&sips)?;
    let logger = RunLogger::start(&options.destination.join(LOG_FILE_NAME), options.quiet)?;
    info!("Log file started at {}", logger.path().display());
    info!("Source of disk images: {}", options.source.display());

    let toolbox = Toolbox::new(config, runner);
    let mut summary = ProcessorSummary::default();
    let mut records = Vec::new();

    let mut names: Vec<String> = fs::read_dir(&options.source)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    for name in names {
        info!(">>> NEW FILE: {}", name);
        if !is_disk_image_name(&name) {
            info!("File is not a disk image. Skipping file.");
            continue;
        }

        let layout = SipLayout::new(sips.join(&name));
        let mut record = DiskRecord {
            name: name.clone(),
            layout,
            volumes: Vec::new(),
        };
        match process_disk(options, toolbox, &mut record) {
            Ok(true) => summary.processed.push(name),
            Ok(false) => summary.unprocessed.push(name),
            Err(e) => {
                error!("Error processing {}: {}", name, e);
                summary.unprocessed.push(name);
            }
        }
        records.push(record);
    }

    summary.spreadsheet = options.destination.join("description.csv");
    let mut writer = create_spreadsheet(&summary.spreadsheet, &DESCRIPTION_HEADER)?;
    for record in &records {
        writer.write_record(description_row(record, options.export_all))?;
        info!("Described {} successfully.", record.name);
    }
    writer.flush()?;

    if summary.unprocessed.is_empty() {
        info!(
            "Processing complete. All disk images processed. Results in {}.",
            options.destination.display()
        );
    } else {
        info!(
            "Processing complete. Skipped disks: {}",
            summary.unprocessed.join(", ")
        );
    }
    Ok(summary)
}

/// Builds one SIP. `Ok(false)` means the disk was skipped part way.
fn process_disk(
    options: &ProcessorOptions,
    toolbox: Toolbox<'_>,
    record: &mut DiskRecord,
) -> Result<bool> {
    info!("Making SIP directory {}", record.layout.root().display());
    record.layout.create()?;
    let subdoc = record.layout.submission_documentation();

    let source_image = options.source.join(&record.name);
    let mut image = DiskImage::new(&source_image, toolbox)?;
    if image.is_ewf() {
        let target = record
            .layout
            .diskimage()
            .join(format!("{}.img", image.identifier()));
        image = image.with_raw_target(target);
        if let Err(e) = image.ensure_raw() {
            error!(
                "Disk image {} could not be converted to raw image format. Skipping disk. {}",
                record.name, e
            );
            return Ok(false);
        }
        info!("Successfully converted {} to raw format", record.name);
    } else {
        let identifier = image.identifier().to_string();
        copy_image_family(&options.source, &identifier, &record.layout.diskimage())?;
        image = DiskImage::new(record.layout.diskimage().join(&record.name), toolbox)?;
    }

    if let Err(e) = image.write_disktype(&subdoc.join("disktype.txt")) {
        error!("No disktype output for {}. Skipping disk. {}", record.name, e);
        return Ok(false);
    }
    info!("Disktype info written to submissionDocumentation");

    let carve_options = DiskCarveOptions {
        export_unallocated: options.export_all,
        appledouble_resforks: options.resforks,
    };
    record.volumes =
        carve_files_from_all_volumes(&mut image, &record.layout.files(), carve_options, &subdoc)?;
    if !record.volumes.iter().any(|v| v.carved) {
        error!("No files carved from disk image {}. Skipping disk.", record.name);
        return Ok(false);
    }

    if options.bagfiles {
        if let Err(e) = record.layout.bag(&toolbox) {
            error!("SIP {} not bagged: {}", record.name, e);
        }
    } else if let Err(e) = write_checksum_manifest(&record.layout) {
        error!("Checksums for {} not written: {}", record.name, e);
    }

    normalize_permissions(record.layout.root(), SIP_DIR_MODE, SIP_FILE_MODE);
    info!("File permissions rewritten.");

    // Failure is logged by the toolbox; the SIP stands without a report.
    let _ = run_brunnhilde(
        &toolbox,
        &record.layout.files(),
        &record.layout.submission_documentation(),
        "brunnhilde",
        options.piiscan,
    );
    Ok(true)
}

/// Phrase naming how files came off the disk, e.g. `using SleuthKit's tsk_recover`.
fn carving_methods(volumes: &[Volume]) -> String {
    let mut strategies: Vec<CarvingStrategy> = Vec::new();
    for strategy in volumes
        .iter()
        .filter(|v| v.carved)
        .filter_map(|v| v.file_system().carving_strategy())
    {
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }
    strategies
        .iter()
        .map(CarvingStrategy::description)
        .collect::<Vec<_>>()
        .join(" and ")
}

fn error_row(name: &str) -> Vec<String> {
    let mut row: Vec<String> = ["", name, "", "", "Error", "Error", "Error", "File", "Error", "Error"]
        .iter()
        .map(|cell| cell.to_string())
        .collect();
    row.resize(DESCRIPTION_HEADER.len(), String::new());
    row
}

fn description_row(record: &DiskRecord, export_all: bool) -> Vec<String> {
    let subdoc = record.layout.submission_documentation();
    let documents = find_dfxml_documents(&subdoc);

    let mut per_document = Vec::new();
    let mut failures = 0;
    for document in &documents {
        match summarize_document(document, export_all) {
            Ok(Some(stats)) => per_document.push(stats),
            Ok(None) => warn!(
                "No fileobjects in DFXML file {} - possibly file system fiwalk doesn't recognize",
                document.display()
            ),
            Err(e) => {
                error!("Error reading DFXML file {}: {}", document.display(), e);
                failures += 1;
            }
        }
    }
    if !documents.is_empty() && failures == documents.len() {
        return error_row(&record.name);
    }

    let stats = combine(&per_document);
    let size = convert_size(stats.total_bytes);
    let (extent, date_statement, earliest, latest, scope) = match stats.file_count {
        0 => (
            "EMPTY".to_string(),
            "N/A".to_string(),
            "N/A".to_string(),
            "N/A".to_string(),
            String::new(),
        ),
        count => {
            let extent = if count == 1 {
                format!("1 digital file ({})", size)
            } else {
                format!("{} digital files ({})", count, size)
            };
            (
                extent,
                stats.date_statement(),
                stats.earliest_date.clone(),
                stats.latest_date.clone(),
                scope_note(record),
            )
        }
    };

    let mut row = vec![
        String::new(),
        record.name.clone(),
        String::new(),
        String::new(),
        date_statement,
        earliest,
        latest,
        "File".to_string(),
        extent,
        scope,
    ];
    row.resize(DESCRIPTION_HEADER.len(), String::new());
    row
}

fn scope_note(record: &DiskRecord) -> String {
    let methods = carving_methods(&record.volumes);
    let formats = read_top_formats(&record.layout.submission_documentation().join("brunnhilde"));
    let carved_from = if methods.is_empty() {
        "carved from the disk image".to_string()
    } else {
        format!("carved from the disk image {}", methods)
    };
    format!(
        "File includes both a disk image and logical files {}. Most common file formats: {}",
        carved_from,
        formats.join(", ")
    )
}

/// Where the processor puts the SIP for `image_name`.
pub fn sip_path(destination: &Path, image_name: &str) -> PathBuf {
    destination.join("SIPs").join(image_name)
}
