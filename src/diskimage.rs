//! DiskImage - one disk image moving through ingest.
//!
//! A [`DiskImage`] starts [`Stage::Unprobed`] and advances as its accessors
//! run: [`DiskImage::ensure_raw`] resolves a raw image (converting EWF
//! images once), [`DiskImage::ensure_disktype`] runs disktype on it, and
//! [`DiskImage::ensure_metadata`] runs fiwalk over it. Each step runs its
//! tool at most once, and only after the steps before it; later calls
//! return the cached result. A failed fiwalk run is remembered too.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::disktype::{parse_volumes, Volume};
use crate::error::{Error, Result};
use crate::tools::{ToolCommand, Toolbox};

const EWF_EXTENSIONS: [&str; 4] = ["e00", "e01", "ewf", "ex0"];

/// How far a [`DiskImage`] has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing has run yet
    Unprobed,
    /// A raw image path is known
    RawResolved,
    /// disktype output is cached
    TypeProbed,
    /// A disk-level DFXML document has been written
    MetadataGenerated,
}

/// A disk image and the artifacts derived from it.
pub struct DiskImage<'a> {
    path: PathBuf,
    filename: String,
    identifier: String,
    extension: String,
    raw_target: PathBuf,
    stage: Stage,
    raw_disk_image: Option<PathBuf>,
    disktype: Option<String>,
    disk_dfxml_path: Option<PathBuf>,
    metadata_failed: bool,
    walk_dfxml_paths: Vec<PathBuf>,
    toolbox: Toolbox<'a>,
}

impl<'a> DiskImage<'a> {
    /// Wraps the image at `path`. EWF images convert next to the source,
    /// as `<identifier>.img`, unless [`DiskImage::with_raw_target`] says otherwise.
    pub fn new(path: impl AsRef<Path>, toolbox: Toolbox<'a>) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let identifier = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let raw_target = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{}.img", identifier));

        Ok(Self {
            path,
            filename,
            identifier,
            extension,
            raw_target,
            stage: Stage::Unprobed,
            raw_disk_image: None,
            disktype: None,
            disk_dfxml_path: None,
            metadata_failed: false,
            walk_dfxml_paths: Vec::new(),
            toolbox,
        })
    }

    /// Sets where an EWF image's raw conversion is written.
    pub fn with_raw_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.raw_target = target.into();
        self
    }

    /// Absolute path of the source image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the source image.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// File name without its extension.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Extension without the leading dot, as written.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Tools this image runs through.
    pub fn toolbox(&self) -> Toolbox<'a> {
        self.toolbox
    }

    /// True for Expert Witness Format images.
    pub fn is_ewf(&self) -> bool {
        let extension = self.extension.to_lowercase();
        EWF_EXTENSIONS.iter().any(|ewf| extension.ends_with(ewf))
    }

    /// Current processing stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    // Stages only move forward one at a time.
    fn advance(&mut self, next: Stage) {
        debug_assert!(next <= self.stage || next as u8 == self.stage as u8 + 1);
        if next > self.stage {
            self.stage = next;
        }
    }

    /// Raw image path, if resolved.
    pub fn raw_disk_image(&self) -> Option<&Path> {
        self.raw_disk_image.as_deref()
    }

    /// Cached disktype output, once disktype has run.
    pub fn disktype(&self) -> Option<&str> {
        self.disktype.as_deref()
    }

    /// Disk-level DFXML document, if generated.
    pub fn disk_dfxml_path(&self) -> Option<&Path> {
        self.disk_dfxml_path.as_deref()
    }

    /// Documents written by walking carved volumes.
    pub fn walk_dfxml_paths(&self) -> &[PathBuf] {
        &self.walk_dfxml_paths
    }

    pub(crate) fn record_walk_dfxml(&mut self, path: PathBuf) {
        self.walk_dfxml_paths.push(path);
    }

    /// Returns a raw image for this disk, converting from EWF on first use.
    ///
    /// Non-EWF images are used as they are. EWF images are exported with
    /// `ewfexport` into a scratch directory and the image and its `.info`
    /// sidecar are moved to the raw target.
    pub fn ensure_raw(&mut self) -> Result<PathBuf> {
        if let Some(raw) = &self.raw_disk_image {
            return Ok(raw.clone());
        }

        if !self.is_ewf() {
            self.raw_disk_image = Some(self.path.clone());
            self.advance(Stage::RawResolved);
            return Ok(self.path.clone());
        }

        info!("Converting EWF disk image {} to raw format", self.filename);
        let scratch = tempfile::tempdir()?;
        let export_base = scratch.path().join(&self.identifier);
        let command = ToolCommand::new(&self.toolbox.config.tools.ewfexport)
            .arg("-t")
            .arg(&export_base)
            .args(["-f", "raw", "-o", "0", "-S", "0", "-u"])
            .arg(&self.path);
        self.toolbox.run(
            "Error running ewfexport to convert disk image to raw format",
            &command,
        )?;

        if let Some(parent) = self.raw_target.parent() {
            fs::create_dir_all(parent)?;
        }
        move_file(
            &scratch.path().join(format!("{}.raw", self.identifier)),
            &self.raw_target,
        )?;

        let info_source = scratch.path().join(format!("{}.raw.info", self.identifier));
        let mut info_target = self.raw_target.clone().into_os_string();
        info_target.push(".info");
        if info_source.is_file() {
            move_file(&info_source, Path::new(&info_target))?;
        } else {
            warn!("ewfexport wrote no .info sidecar for {}", self.filename);
        }

        self.raw_disk_image = Some(self.raw_target.clone());
        self.advance(Stage::RawResolved);
        Ok(self.raw_target.clone())
    }

    /// Runs disktype on the raw image once and returns its output.
    pub fn ensure_disktype(&mut self) -> Result<&str> {
        if self.disktype.is_none() {
            let raw = self.ensure_raw()?;
            let command = ToolCommand::new(&self.toolbox.config.tools.disktype).arg(&raw);
            let stdout = self.toolbox.run("Error running disktype", &command)?;
            self.disktype = Some(String::from_utf8_lossy(&stdout).into_owned());
            self.advance(Stage::TypeProbed);
        }
        Ok(self.disktype.as_deref().unwrap_or_default())
    }

    /// Writes the disktype report to `output`, probing first if needed.
    pub fn write_disktype(&mut self, output: &Path) -> Result<()> {
        let report = self.ensure_disktype()?.to_string();
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, report)?;
        Ok(())
    }

    /// Volumes described by the disktype report.
    pub fn volumes(&mut self) -> Result<Vec<Volume>> {
        Ok(parse_volumes(self.ensure_disktype()?))
    }

    /// Writes a disk-level DFXML document with fiwalk to `dfxml_path`, once.
    ///
    /// disktype runs first. Once a document exists its
    /// path is returned without rerunning fiwalk, even if a different
    /// `dfxml_path` is passed. After a failed run, later calls fail with
    /// [`Error::MetadataUnavailable`] without rerunning it.
    pub fn ensure_metadata(&mut self, dfxml_path: &Path) -> Result<PathBuf> {
        if let Some(existing) = &self.disk_dfxml_path {
            return Ok(existing.clone());
        }
        if self.metadata_failed {
            return Err(Error::MetadataUnavailable(self.path.clone()));
        }

        self.ensure_disktype()?;
        let raw = self.ensure_raw()?;
        if let Some(parent) = dfxml_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let command = ToolCommand::new(&self.toolbox.config.tools.fiwalk)
            .arg("-X")
            .arg(dfxml_path)
            .arg(&raw);
        if let Err(e) = self
            .toolbox
            .run("Unable to create DFXML with fiwalk", &command)
        {
            self.metadata_failed = true;
            return Err(e);
        }

        info!("DFXML written to {}", dfxml_path.display());
        self.disk_dfxml_path = Some(dfxml_path.to_path_buf());
        self.advance(Stage::MetadataGenerated);
        Ok(dfxml_path.to_path_buf())
    }
}

/// Renames `from` to `to`, copying across filesystems when a rename can't.
pub(crate) fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

/// Extensions (lowercase, with dot) recognized as disk images in a source directory.
pub const DISK_IMAGE_EXTENSIONS: [&str; 8] =
    [".e01", ".000", ".ewf", ".001", ".raw", ".img", ".dd", ".iso"];

/// True when `filename` ends with a recognized disk image extension.
pub fn is_disk_image_name(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    DISK_IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

impl std::fmt::Debug for DiskImage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImage")
            .field("path", &self.path)
            .field("stage", &self.stage())
            .field("raw_disk_image", &self.raw_disk_image)
            .field("disk_dfxml_path", &self.disk_dfxml_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolkitConfig;
    use crate::fixtures::FAT12_DISKTYPE;
    use crate::tools::testing::{arg_after, ScriptedRunner};

    fn ewfexport_runner() -> ScriptedRunner {
        ScriptedRunner::new(|cmd| {
            let argv = cmd.argv();
            if argv[0] == "ewfexport" {
                let base = arg_after(&argv, "-t").unwrap();
                fs::write(format!("{}.raw", base), b"raw sectors").unwrap();
                fs::write(format!("{}.raw.info", base), b"MD5 hash calculated").unwrap();
            }
            Ok(Vec::new())
        })
    }

    #[test]
    fn test_ewf_detection() {
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::succeeding();
        let toolbox = Toolbox::new(&config, &runner);
        for (name, expected) in [
            ("disk.E01", true),
            ("disk.e00", true),
            ("disk.ewf", true),
            ("disk.Ex0", true),
            ("disk.dd", false),
            ("disk.iso", false),
            ("disk", false),
        ] {
            let image = DiskImage::new(name, toolbox).unwrap();
            assert_eq!(image.is_ewf(), expected, "{name}");
        }
    }

    #[test]
    fn test_names() {
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::succeeding();
        let image =
            DiskImage::new("/images/practical.floppy.dd", Toolbox::new(&config, &runner)).unwrap();
        assert_eq!(image.filename(), "practical.floppy.dd");
        assert_eq!(image.identifier(), "practical.floppy");
        assert_eq!(image.extension(), "dd");
        assert!(image.path().is_absolute());
    }

    #[test]
    fn test_raw_image_passes_through() {
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::succeeding();
        let mut image =
            DiskImage::new("/images/practical.floppy.dd", Toolbox::new(&config, &runner)).unwrap();
        assert_eq!(image.stage(), Stage::Unprobed);

        let raw = image.ensure_raw().unwrap();
        assert_eq!(raw, PathBuf::from("/images/practical.floppy.dd"));
        assert_eq!(image.stage(), Stage::RawResolved);
        assert_eq!(runner.count("ewfexport"), 0);
    }

    #[test]
    fn test_ewf_conversion_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("floppy.E01");
        fs::write(&source, b"ewf").unwrap();
        let target = dir.path().join("out").join("floppy.img");

        let config = ToolkitConfig::default();
        let runner = ewfexport_runner();
        let mut image = DiskImage::new(&source, Toolbox::new(&config, &runner))
            .unwrap()
            .with_raw_target(&target);

        assert_eq!(image.ensure_raw().unwrap(), target);
        assert_eq!(image.ensure_raw().unwrap(), target);
        assert_eq!(runner.count("ewfexport"), 1);

        assert_eq!(fs::read(&target).unwrap(), b"raw sectors");
        assert!(dir.path().join("out").join("floppy.img.info").is_file());

        let argv = &runner.calls()[0];
        assert_eq!(&argv[3..], ["-f", "raw", "-o", "0", "-S", "0", "-u", source.to_str().unwrap()]);
        assert!(arg_after(argv, "-t").unwrap().ends_with("floppy"));
    }

    #[test]
    fn test_failed_conversion_leaves_image_unresolved() {
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::new(|cmd| {
            Err(Error::Subprocess {
                program: cmd.argv()[0].clone(),
                status: "exit status: 1".to_string(),
                stderr: "libewf: unable to open".to_string(),
            })
        });
        let mut image = DiskImage::new("/images/broken.E01", Toolbox::new(&config, &runner)).unwrap();
        assert!(image.ensure_raw().is_err());
        assert_eq!(image.stage(), Stage::Unprobed);
    }

    #[test]
    fn test_disktype_cached() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::new(|cmd| {
            Ok(if cmd.argv()[0] == "disktype" {
                FAT12_DISKTYPE.as_bytes().to_vec()
            } else {
                Vec::new()
            })
        });
        let mut image =
            DiskImage::new("/images/practical.floppy.dd", Toolbox::new(&config, &runner)).unwrap();

        let report_path = dir.path().join("disktype.txt");
        image.write_disktype(&report_path).unwrap();
        assert_eq!(fs::read_to_string(&report_path).unwrap(), FAT12_DISKTYPE);

        let volumes = image.volumes().unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].output_directory_name, "volume-1-fat12");
        assert_eq!(image.stage(), Stage::TypeProbed);
        assert_eq!(runner.count("disktype"), 1);
    }

    #[test]
    fn test_metadata_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::succeeding();
        let mut image =
            DiskImage::new("/images/practical.floppy.dd", Toolbox::new(&config, &runner)).unwrap();

        let first = dir.path().join("dfxml.xml");
        assert_eq!(image.ensure_metadata(&first).unwrap(), first);
        assert_eq!(
            image.ensure_metadata(&dir.path().join("other.xml")).unwrap(),
            first
        );
        assert_eq!(image.stage(), Stage::MetadataGenerated);
        assert_eq!(runner.count("fiwalk"), 1);
        assert_eq!(
            runner.calls()[1],
            vec![
                "fiwalk".to_string(),
                "-X".to_string(),
                first.to_string_lossy().into_owned(),
                "/images/practical.floppy.dd".to_string(),
            ]
        );
    }

    #[test]
    fn test_metadata_runs_disktype_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::succeeding();
        let mut image =
            DiskImage::new("/images/practical.floppy.dd", Toolbox::new(&config, &runner)).unwrap();

        image.ensure_metadata(&dir.path().join("dfxml.xml")).unwrap();
        assert_eq!(image.stage(), Stage::MetadataGenerated);
        assert!(image.raw_disk_image().is_some());
        assert!(image.disktype().is_some());
        let programs: Vec<String> = runner.calls().into_iter().map(|c| c[0].clone()).collect();
        assert_eq!(programs, vec!["disktype", "fiwalk"]);
    }

    #[test]
    fn test_failed_disktype_blocks_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::new(|cmd| {
            Err(Error::Subprocess {
                program: cmd.argv()[0].clone(),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            })
        });
        let mut image =
            DiskImage::new("/images/practical.floppy.dd", Toolbox::new(&config, &runner)).unwrap();

        assert!(image.ensure_metadata(&dir.path().join("dfxml.xml")).is_err());
        assert_eq!(image.stage(), Stage::RawResolved);
        assert_eq!(runner.count("fiwalk"), 0);
    }

    #[test]
    fn test_failed_fiwalk_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolkitConfig::default();
        let runner = ScriptedRunner::new(|cmd| {
            if cmd.argv()[0] == "fiwalk" {
                return Err(Error::Subprocess {
                    program: "fiwalk".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                });
            }
            Ok(Vec::new())
        });
        let mut image =
            DiskImage::new("/images/practical.floppy.dd", Toolbox::new(&config, &runner)).unwrap();
        let path = dir.path().join("dfxml.xml");

        assert!(matches!(image.ensure_metadata(&path), Err(Error::Subprocess { .. })));
        assert!(matches!(
            image.ensure_metadata(&path),
            Err(Error::MetadataUnavailable(_))
        ));
        assert_eq!(runner.count("fiwalk"), 1);
        assert_eq!(image.stage(), Stage::TypeProbed);
    }

    #[test]
    fn test_disk_image_names() {
        assert!(is_disk_image_name("floppy.E01"));
        assert!(is_disk_image_name("cd.ISO"));
        assert!(is_disk_image_name("disk.001"));
        assert!(!is_disk_image_name("floppy.E01.txt"));
        assert!(!is_disk_image_name("notes.md"));
    }
}
