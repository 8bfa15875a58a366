//! SIP assembly: directory layout, image copies, checksums, bagging and
//! Brunnhilde reports.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use digest::Digest;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::error::Result;
use crate::tools::{ToolCommand, Toolbox};

/// Directory mode for finished SIPs.
pub const SIP_DIR_MODE: u32 = 0o755;
/// File mode for finished SIPs.
pub const SIP_FILE_MODE: u32 = 0o644;

/// Paths inside one Submission Information Package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipLayout {
    root: PathBuf,
    bagged: bool,
}

impl SipLayout {
    /// Layout rooted at `root`, before bagging.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bagged: false,
        }
    }

    /// SIP directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the payload has moved under `data/`.
    pub fn is_bagged(&self) -> bool {
        self.bagged
    }

    fn payload(&self) -> PathBuf {
        if self.bagged {
            self.root.join("data")
        } else {
            self.root.clone()
        }
    }

    /// `objects/`
    pub fn objects(&self) -> PathBuf {
        self.payload().join("objects")
    }

    /// `objects/diskimage/`
    pub fn diskimage(&self) -> PathBuf {
        self.objects().join("diskimage")
    }

    /// `objects/files/`
    pub fn files(&self) -> PathBuf {
        self.objects().join("files")
    }

    /// `metadata/`
    pub fn metadata(&self) -> PathBuf {
        self.payload().join("metadata")
    }

    /// `metadata/submissionDocumentation/`
    pub fn submission_documentation(&self) -> PathBuf {
        self.metadata().join("submissionDocumentation")
    }

    /// Creates the unbagged directory tree.
    pub fn create(&self) -> Result<()> {
        for dir in [self.diskimage(), self.files(), self.submission_documentation()] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Runs `bagit.py --processes 4` on the SIP. On success the layout
    /// points under `data/`.
    pub fn bag(&mut self, toolbox: &Toolbox<'_>) -> Result<()> {
        let command = ToolCommand::new(&toolbox.config.tools.bagit)
            .args(["--processes", "4"])
            .arg(&self.root);
        toolbox.run("bagit.py could not bag SIP", &command)?;
        self.bagged = true;
        info!("SIP {} bagged", self.root.display());
        Ok(())
    }
}

/// Copies every file in `source_dir` whose name starts with `identifier`
/// into `dest_dir`: segments, sidecars and logs travel with the image.
///
/// Returns the names copied. A file that fails to copy is logged and skipped.
pub fn copy_image_family(source_dir: &Path, identifier: &str, dest_dir: &Path) -> Result<Vec<String>> {
    fs::create_dir_all(dest_dir)?;
    let mut names: Vec<String> = fs::read_dir(source_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(identifier))
        .collect();
    names.sort();

    let mut copied = Vec::with_capacity(names.len());
    for name in names {
        match fs::copy(source_dir.join(&name), dest_dir.join(&name)) {
            Ok(_) => {
                info!("Copied {} to {}", name, dest_dir.display());
                copied.push(name);
            }
            Err(e) => error!("File {} not successfully copied to {}: {}", name, dest_dir.display(), e),
        }
    }
    Ok(copied)
}

fn md5_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = md5::Md5::new();
    let mut buffer = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Writes `metadata/checksum.md5` covering every file under `objects/`.
///
/// One line per file, `<md5>  ../objects/<relative path>`, in sorted path order.
pub fn write_checksum_manifest(layout: &SipLayout) -> Result<PathBuf> {
    let objects = layout.objects();
    let manifest = layout.metadata().join("checksum.md5");
    let mut out = BufWriter::new(File::create(&manifest)?);

    for entry in WalkDir::new(&objects).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(&objects).unwrap_or(entry.path());
        let digest = md5_file(entry.path())?;
        writeln!(out, "{}  ../objects/{}", digest, rel.display())?;
    }
    out.flush()?;

    info!("Checksums for objects/ written to {}", manifest.display());
    Ok(manifest)
}

/// Runs Brunnhilde over `files_dir`, writing `<out_dir>/<name>/`.
///
/// `-z` scans archives and `-w` prints the HTML report; `pii_scan` adds `-b`
/// for bulk_extractor.
pub fn run_brunnhilde(
    toolbox: &Toolbox<'_>,
    files_dir: &Path,
    out_dir: &Path,
    name: &str,
    pii_scan: bool,
) -> Result<()> {
    let flags = if pii_scan { "-zwb" } else { "-zw" };
    let command = ToolCommand::new(&toolbox.config.tools.brunnhilde)
        .arg(flags)
        .arg(files_dir)
        .arg(out_dir)
        .arg(name);
    toolbox.run("Brunnhilde could not report on carved files", &command)?;
    info!("Brunnhilde report written to {}", out_dir.join(name).display());
    Ok(())
}
