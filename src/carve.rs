//! Carving files out of disk image volumes.
//!
//! [`carve_files`] picks a strategy from the volume's [`FileSystem`]:
//!
//! - **TSK**: `tsk_recover` against the raw image, then modification
//!   times restored from the disk-level DFXML.
//! - **HFS Explorer**: `unhfs` for classic HFS volumes.
//! - **Mount and copy**: loop-mount the image read-only and copy its tree.
//!
//! Carved trees get `755` directories and `664` files. A destination left
//! empty is removed, which is how callers tell a volume failed.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::diskimage::DiskImage;
use crate::disktype::{CarvingStrategy, FileSystem, Volume};
use crate::error::{Error, Result};
use crate::restore::restore_modified_dates;
use crate::tools::{ToolCommand, Toolbox};
use crate::walk::write_dfxml_from_path;

/// Directory mode for carved trees.
pub const CARVED_DIR_MODE: u32 = 0o755;
/// File mode for carved trees.
pub const CARVED_FILE_MODE: u32 = 0o664;

/// Parameters for carving one volume.
#[derive(Debug, Clone, Default)]
pub struct CarveOptions {
    /// Recover deleted files too (`tsk_recover -e`)
    pub export_unallocated: bool,
    /// Export HFS resource forks as AppleDouble files
    pub appledouble_resforks: bool,
    /// Walk HFS and mount-and-copy output into a DFXML document
    pub create_dfxml: bool,
    /// Where fiwalk writes the disk-level document if it doesn't exist yet
    pub disk_dfxml_path: PathBuf,
    /// Where the walk document for this volume goes
    pub volume_dfxml_path: PathBuf,
}

/// Sets every directory under `root` to `dir_mode` and every file to `file_mode`.
///
/// `root` itself and symlinks are left alone. Failures are logged per path.
pub fn normalize_permissions(root: &Path, dir_mode: u32, file_mode: u32) {
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!("Error setting permissions: {}", e);
                continue;
            }
        };
        let mode = if entry.file_type().is_dir() {
            dir_mode
        } else if entry.file_type().is_file() {
            file_mode
        } else {
            continue;
        };
        if let Err(e) = fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode)) {
            error!("Error setting permissions on {}: {}", entry.path().display(), e);
        }
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

/// Carves the volume formatted as `file_system` into `dest`.
///
/// Returns whether anything was carved. Tool failures are logged and show
/// up as an empty (and removed) destination rather than an error; only a
/// destination that can't be created is an `Err`.
pub fn carve_files(
    image: &mut DiskImage<'_>,
    file_system: &FileSystem,
    dest: &Path,
    options: &CarveOptions,
) -> Result<bool> {
    fs::create_dir_all(dest)?;

    let outcome = match file_system.carving_strategy() {
        Some(CarvingStrategy::Tsk) => carve_with_tsk_recover(image, dest, options),
        Some(CarvingStrategy::HfsExplorer) => carve_with_hfs_explorer(image, dest, options),
        Some(CarvingStrategy::MountAndCopy) => {
            mount_and_copy(image, file_system, dest, options)
        }
        None => {
            error!(
                "Unable to carve files from volume {} with unknown file system {}",
                dest.file_name().unwrap_or_default().to_string_lossy(),
                file_system.to_string().to_lowercase()
            );
            Ok(())
        }
    };
    if let Err(e) = outcome {
        error!("Error carving files into {}: {}", dest.display(), e);
    }

    if is_empty_dir(dest) {
        error!(
            "Files not exported to {} from file system {}. Cleaning up empty directory",
            dest.file_name().unwrap_or_default().to_string_lossy(),
            file_system.to_string().to_lowercase()
        );
        let _ = fs::remove_dir_all(dest);
        return Ok(false);
    }
    Ok(true)
}

fn carve_with_tsk_recover(
    image: &mut DiskImage<'_>,
    dest: &Path,
    options: &CarveOptions,
) -> Result<()> {
    let raw = image.ensure_raw()?;
    let disk_dfxml = match image.ensure_metadata(&options.disk_dfxml_path) {
        Ok(path) => Some(path),
        Err(e) => {
            error!("No disk-level DFXML for {}: {}", image.filename(), e);
            None
        }
    };

    let toolbox = image.toolbox();
    let flag = if options.export_unallocated { "-e" } else { "-a" };
    let command = ToolCommand::new(&toolbox.config.tools.tsk_recover)
        .arg(flag)
        .arg(&raw)
        .arg(dest);
    toolbox.run("tsk_recover could not carve files", &command)?;

    normalize_permissions(dest, CARVED_DIR_MODE, CARVED_FILE_MODE);

    if let Some(dfxml) = disk_dfxml {
        match restore_modified_dates(dest, &dfxml) {
            Ok(summary) => info!(
                "Restored last modified dates for {} file(s) in {}",
                summary.restored,
                dest.display()
            ),
            Err(e) => error!(
                "Error restoring file last modified dates from DFXML values: {}",
                e
            ),
        }
    }
    Ok(())
}

fn carve_with_hfs_explorer(
    image: &mut DiskImage<'_>,
    dest: &Path,
    options: &CarveOptions,
) -> Result<()> {
    let raw = image.ensure_raw()?;
    let toolbox = image.toolbox();

    let mut command = ToolCommand::new(&toolbox.config.tools.bash)
        .arg(&toolbox.config.tools.unhfs)
        .arg("-v");
    if options.appledouble_resforks {
        command = command.args(["-resforks", "APPLEDOUBLE"]);
    }
    let command = command.arg("-o").arg(dest).arg(&raw);
    toolbox.run("HFS Explorer could not carve files from disk image", &command)?;

    normalize_permissions(dest, CARVED_DIR_MODE, CARVED_FILE_MODE);
    walk_volume(image, dest, options)
}

/// Unmounts the shared mount point when dropped.
struct MountGuard<'a> {
    toolbox: Toolbox<'a>,
    point: PathBuf,
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        let command = self
            .toolbox
            .privileged(&self.toolbox.config.tools.umount)
            .arg(&self.point);
        // Toolbox::run already logged the failure.
        let _ = self.toolbox.run("Unable to unmount disk image", &command);
    }
}

fn mount_and_copy(
    image: &mut DiskImage<'_>,
    file_system: &FileSystem,
    dest: &Path,
    options: &CarveOptions,
) -> Result<()> {
    let raw = image.ensure_raw()?;
    let toolbox = image.toolbox();
    let point = toolbox.config.mount.point.clone();

    let command = toolbox
        .privileged(&toolbox.config.tools.mount)
        .arg("-t")
        .arg(file_system.mount_type())
        .arg("-o")
        .arg(&toolbox.config.mount.options)
        .arg(&raw)
        .arg(&point);
    toolbox.run("Unable to mount disk image", &command)?;

    {
        let _guard = MountGuard {
            toolbox,
            point: point.clone(),
        };
        if let Err(e) = replace_tree(&point, dest) {
            error!(
                "Error copying files from disk image {} mounted at {}: {}",
                raw.display(),
                point.display(),
                e
            );
        }
    }

    normalize_permissions(dest, CARVED_DIR_MODE, CARVED_FILE_MODE);
    walk_volume(image, dest, options)
}

/// Replaces `dest` with a copy of `src`, following symlinks.
fn replace_tree(src: &Path, dest: &Path) -> Result<()> {
    if dest.is_dir() {
        fs::remove_dir_all(dest)?;
    }
    fs::create_dir_all(dest)?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn walk_volume(image: &mut DiskImage<'_>, dest: &Path, options: &CarveOptions) -> Result<()> {
    if !options.create_dfxml || is_empty_dir(dest) {
        return Ok(());
    }
    let toolbox = image.toolbox();
    write_dfxml_from_path(dest, &options.volume_dfxml_path, &toolbox.config.walk)?;
    image.record_walk_dfxml(options.volume_dfxml_path.clone());
    Ok(())
}

/// Options that apply to every volume of a disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskCarveOptions {
    /// Recover deleted files too
    pub export_unallocated: bool,
    /// Export HFS resource forks as AppleDouble files
    pub appledouble_resforks: bool,
}

/// Carves every volume disktype reports into `dest/<volume dir>`.
///
/// DFXML goes to `dfxml_dir`: the disk-level document as `dfxml.xml` and
/// walk documents as `dfxml_<volume dir>.xml`. Returns the volumes with
/// their `carved` flags set.
pub fn carve_files_from_all_volumes(
    image: &mut DiskImage<'_>,
    dest: &Path,
    options: DiskCarveOptions,
    dfxml_dir: &Path,
) -> Result<Vec<Volume>> {
    if image.ensure_disktype()?.trim().is_empty() {
        error!("No disktype output - skipping");
        return Err(Error::NoDisktypeOutput(image.path().to_path_buf()));
    }

    let disk_dfxml_path = dfxml_dir.join("dfxml.xml");
    if let Err(e) = image.ensure_metadata(&disk_dfxml_path) {
        warn!("fiwalk could not describe {}: {}", image.filename(), e);
    }

    let mut volumes = image.volumes()?;
    for volume in volumes.iter_mut() {
        if volume.is_placeholder() {
            warn!(
                "Skipping disktype section without a file system in {}",
                image.filename()
            );
            continue;
        }

        let carve_options = CarveOptions {
            export_unallocated: options.export_unallocated,
            appledouble_resforks: options.appledouble_resforks,
            create_dfxml: true,
            disk_dfxml_path: disk_dfxml_path.clone(),
            volume_dfxml_path: dfxml_dir.join(format!("dfxml_{}.xml", volume.output_directory_name)),
        };
        let volume_dest = dest.join(&volume.output_directory_name);
        volume.carved = carve_files(image, &volume.file_system(), &volume_dest, &carve_options)?;
    }

    let attempted = volumes.iter().filter(|v| !v.is_placeholder()).count();
    info!(
        "File export attempted from {} volume{}",
        attempted,
        if attempted == 1 { "" } else { "s" }
    );
    Ok(volumes)
}
