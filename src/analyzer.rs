//! Analyzer mode: carve each disk image, report on it, and summarize the
//! batch in `analysis.csv`.
//!
//! Working copies of the images and carved files are scratch data; only
//! `reports/` and the spreadsheet survive unless `keepfiles` is set.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::carve::{carve_files_from_all_volumes, DiskCarveOptions};
use crate::config::ToolkitConfig;
use crate::diskimage::{is_disk_image_name, DiskImage};
use crate::disktype::Volume;
use crate::error::Result;
use crate::logging::RunLogger;
use crate::package::{copy_image_family, run_brunnhilde};
use crate::report::{bool_cell, create_spreadsheet, read_top_formats, virus_found, ANALYSIS_HEADER};
use crate::stats::{combine, convert_size, distinct_file_systems, find_dfxml_documents, summarize_document};
use crate::tools::{ToolRunner, Toolbox};

/// Name of the run log written to the destination.
pub const LOG_FILE_NAME: &str = "diskimageanalyzer.log";

/// Analyzer run settings.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOptions {
    /// Directory holding the disk images
    pub source: PathBuf,
    /// Output directory; replaced if it exists
    pub destination: PathBuf,
    /// Carve unallocated files too
    pub export_all: bool,
    /// Keep carved files in `files/`
    pub keepfiles: bool,
    /// Export HFS resource forks as AppleDouble files
    pub resforks: bool,
    /// Log errors only
    pub quiet: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzerSummary {
    /// Images carved and reported on
    pub analyzed: Vec<String>,
    /// Images with no carved files
    pub unanalyzed: Vec<String>,
    /// The analysis spreadsheet
    pub spreadsheet: PathBuf,
}

struct AnalyzedDisk {
    name: String,
    volumes: Vec<Volume>,
}

/// Analyzes every disk image in `options.source`.
pub fn run(
    options: &AnalyzerOptions,
    config: &ToolkitConfig,
    runner: &dyn ToolRunner,
) -> Result<AnalyzerSummary> {
    let destination = &options.destination;
    if destination.exists() {
        fs::remove_dir_all(destination)?;
    }
    let diskimages_dir = destination.join("diskimages");
    let files_dir = destination.join("files");
    let reports_dir = destination.join("reports");
    for dir in [&diskimages_dir, &files_dir, &reports_dir] {
        fs::create_dir_all(dir)?;
    }

    let logger = RunLogger::start(&destination.join(LOG_FILE_NAME), options.quiet)?;
    info!("Log file started at {}", logger.path().display());
    info!("Source of disk images: {}", options.source.display());

    let toolbox = Toolbox::new(config, runner);
    let carve_options = DiskCarveOptions {
        export_unallocated: options.export_all,
        appledouble_resforks: options.resforks,
    };
    let mut summary = AnalyzerSummary::default();
    let mut disks = Vec::new();

    let mut names: Vec<String> = fs::read_dir(&options.source)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    for name in names {
        if !is_disk_image_name(&name) {
            continue;
        }
        info!(">>> NEW FILE: {}", name);

        let reports = reports_dir.join(&name);
        let files = files_dir.join(&name);
        fs::create_dir_all(&reports)?;

        let mut disk = AnalyzedDisk {
            name: name.clone(),
            volumes: Vec::new(),
        };
        let analyzed = match analyze_disk(options, toolbox, carve_options, &mut disk) {
            Ok(()) => files.is_dir() && fs::read_dir(&files)?.next().is_some(),
            Err(e) => {
                error!("Error analyzing {}: {}", name, e);
                false
            }
        };

        if analyzed {
            // Failure is logged by the toolbox; the row falls back to placeholders.
            let _ = run_brunnhilde(&toolbox, &files, &reports, "brunnhilde", true);
            summary.analyzed.push(name.clone());
        } else {
            warn!("No files carved from {}", name);
            summary.unanalyzed.push(name.clone());
        }

        if !options.keepfiles && files.exists() {
            fs::remove_dir_all(&files)?;
        }
        disks.push(disk);
    }

    fs::remove_dir_all(&diskimages_dir)?;
    if !options.keepfiles {
        fs::remove_dir_all(&files_dir)?;
    }

    summary.spreadsheet = destination.join("analysis.csv");
    let mut writer = create_spreadsheet(&summary.spreadsheet, &ANALYSIS_HEADER)?;
    for disk in &disks {
        writer.write_record(analysis_row(disk, &reports_dir.join(&disk.name), options.export_all))?;
    }
    writer.flush()?;

    if summary.unanalyzed.is_empty() {
        info!(
            "Analysis complete. All disk images analyzed. Results in {}.",
            destination.display()
        );
    } else {
        info!(
            "Analysis complete. Skipped disks: {}",
            summary.unanalyzed.join(", ")
        );
    }
    Ok(summary)
}

fn analyze_disk(
    options: &AnalyzerOptions,
    toolbox: Toolbox<'_>,
    carve_options: DiskCarveOptions,
    disk: &mut AnalyzedDisk,
) -> Result<()> {
    let destination = &options.destination;
    let diskimages_dir = destination.join("diskimages");
    let reports = destination.join("reports").join(&disk.name);

    let family_image = DiskImage::new(options.source.join(&disk.name), toolbox)?;
    copy_image_family(&options.source, family_image.identifier(), &diskimages_dir)?;

    let mut image = DiskImage::new(diskimages_dir.join(&disk.name), toolbox)?;
    image.write_disktype(&reports.join("disktype.txt"))?;
    disk.volumes = carve_files_from_all_volumes(
        &mut image,
        &destination.join("files").join(&disk.name),
        carve_options,
        &reports,
    )?;
    Ok(())
}

fn error_row(name: &str) -> Vec<String> {
    let mut row = vec![name.to_string(), "0".to_string()];
    row.extend(vec!["N/A".to_string(); 6]);
    row.push("Error reading DFXML files.".to_string());
    row
}

fn analysis_row(disk: &AnalyzedDisk, reports: &Path, export_all: bool) -> Vec<String> {
    let mut per_document = Vec::new();
    for document in find_dfxml_documents(reports) {
        match summarize_document(&document, export_all) {
            Ok(Some(stats)) => per_document.push(stats),
            Ok(None) => {}
            Err(e) => error!("Error reading DFXML file {}: {}", document.display(), e),
        }
    }
    let stats = combine(&per_document);
    if stats.file_count == 0 {
        error!("Error reading DFXML files for {}", disk.name);
        return error_row(&disk.name);
    }

    let volumes: Vec<&Volume> = disk.volumes.iter().filter(|v| !v.is_placeholder()).collect();
    let file_systems = distinct_file_systems(volumes.iter().map(|v| v.file_system.as_str()));
    let brunnhilde = reports.join("brunnhilde");
    let virus = virus_found(&brunnhilde).unwrap_or_else(|e| {
        warn!("No virus log for {}: {}", disk.name, e);
        false
    });

    vec![
        disk.name.clone(),
        volumes.len().to_string(),
        file_systems.join(", "),
        stats.date_statement(),
        stats.earliest_date.clone(),
        stats.latest_date.clone(),
        format!(
            "{} digital files ({})",
            stats.file_count,
            convert_size(stats.total_bytes)
        ),
        bool_cell(virus).to_string(),
        format!("File formats: {}", read_top_formats(&brunnhilde).join(", ")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FAT12_DFXML, FAT12_DISKTYPE};
    use crate::tools::testing::{arg_after, ScriptedRunner};
    use crate::tools::ToolCommand;

    fn floppy_tools(disktype: &'static str) -> ScriptedRunner {
        ScriptedRunner::new(move |cmd: &ToolCommand| {
            let argv = cmd.argv();
            match argv[0].as_str() {
                "disktype" => return Ok(disktype.as_bytes().to_vec()),
                "fiwalk" => fs::write(arg_after(&argv, "-X").unwrap(), FAT12_DFXML).unwrap(),
                "tsk_recover" => fs::write(Path::new(&argv[3]).join("ARP.EXE"), b"MZ").unwrap(),
                "brunnhilde.py" => {
                    let out = Path::new(&argv[3]).join(&argv[4]);
                    fs::create_dir_all(out.join("csv_reports")).unwrap();
                    fs::create_dir_all(out.join("logs")).unwrap();
                    fs::write(
                        out.join("csv_reports").join("formats.csv"),
                        "Format,ID,Count\nWindows Portable Executable,x-fmt/411,1\n",
                    )
                    .unwrap();
                    fs::write(out.join("logs").join("viruscheck-log.txt"), "\n").unwrap();
                }
                _ => {}
            }
            Ok(Vec::new())
        })
    }

    #[test]
    fn test_floppy_analysis() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("practical.floppy.dd"), b"sectors").unwrap();
        fs::write(source.path().join("readme.txt"), b"notes").unwrap();
        let out = tempfile::tempdir().unwrap();
        let destination = out.path().join("analysis");
        fs::create_dir_all(destination.join("stale")).unwrap();

        let options = AnalyzerOptions {
            source: source.path().to_path_buf(),
            destination: destination.clone(),
            ..Default::default()
        };
        let config = ToolkitConfig::default();
        let runner = floppy_tools(FAT12_DISKTYPE);
        let summary = run(&options, &config, &runner).unwrap();

        assert_eq!(summary.analyzed, vec!["practical.floppy.dd"]);
        assert!(!destination.join("stale").exists());
        assert!(!destination.join("diskimages").exists());
        assert!(!destination.join("files").exists());
        let reports = destination.join("reports").join("practical.floppy.dd");
        assert!(reports.join("disktype.txt").is_file());
        assert!(reports.join("dfxml.xml").is_file());

        let brunnhilde = runner
            .calls()
            .into_iter()
            .find(|c| c[0] == "brunnhilde.py")
            .unwrap();
        assert_eq!(brunnhilde[1], "-zwb");

        let csv = fs::read_to_string(&summary.spreadsheet).unwrap();
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(
            lines[1],
            "\"practical.floppy.dd\",1,\"FAT12\",1999,\"1999-04-23\",\"1999-04-23\",\
             \"1 digital files (19 KB)\",\"False\",\"File formats: Windows Portable Executable\""
        );
        let log = fs::read_to_string(destination.join(LOG_FILE_NAME)).unwrap();
        assert!(log.contains("All disk images analyzed"));
    }

    #[test]
    fn test_keepfiles_and_skipped_disk() {
        let source = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.img"), b"sectors").unwrap();
        fs::write(source.path().join("b.iso"), b"sectors").unwrap();
        let out = tempfile::tempdir().unwrap();
        let options = AnalyzerOptions {
            source: source.path().to_path_buf(),
            destination: out.path().to_path_buf(),
            keepfiles: true,
            export_all: true,
            ..Default::default()
        };
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::new(|cmd: &ToolCommand| {
            let argv = cmd.argv();
            if argv[0] == "disktype" && argv[1].ends_with("a.img") {
                return Ok(FAT12_DISKTYPE.as_bytes().to_vec());
            }
            if argv[0] == "tsk_recover" {
                fs::write(Path::new(&argv[3]).join("ARP.EXE"), b"MZ").unwrap();
            }
            Ok(Vec::new())
        });

        let summary = run(&options, &config, &runner).unwrap();
        assert_eq!(summary.analyzed, vec!["a.img"]);
        assert_eq!(summary.unanalyzed, vec!["b.iso"]);
        assert!(out.path().join("files").join("a.img").join("volume-1-fat12").join("ARP.EXE").is_file());

        let csv = fs::read_to_string(&summary.spreadsheet).unwrap();
        assert!(csv.contains(
            "\"b.iso\",0,\"N/A\",\"N/A\",\"N/A\",\"N/A\",\"N/A\",\"N/A\",\"Error reading DFXML files.\""
        ));
        let log = fs::read_to_string(out.path().join(LOG_FILE_NAME)).unwrap();
        assert!(log.contains("Analysis complete. Skipped disks: b.iso"));
    }
}
