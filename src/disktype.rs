//! Volume detection from `disktype` output.
//!
//! `disktype` prints one free-text report per image. Each line containing
//! `file system` opens a new volume section; `Volume name`, `Volume size`
//! and `Disk size` lines inside a section fill it in.
//!
//! ```rust
//! use diskimage_toolkit::disktype::{parse_volumes, FileSystem};
//!
//! let report = "FAT12 file system (hints score 5 of 5)\n  Volume size 1.390 MiB (1457664 bytes, 2847 clusters of 512 bytes)\n";
//! let volumes = parse_volumes(report);
//! assert_eq!(volumes[0].output_directory_name, "volume-1-fat12");
//! assert_eq!(volumes[0].file_system(), FileSystem::Fat("FAT12".to_string()));
//! ```

use std::fmt;

/// Filesystems the toolkit distinguishes when choosing how to carve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileSystem {
    /// Any FAT variant; keeps the reported spelling (e.g. `FAT12`)
    Fat(String),
    /// NTFS
    Ntfs,
    /// Linux ext, as reported bare
    Ext,
    /// ISO 9660
    Iso9660,
    /// HFS+
    HfsPlus,
    /// UFS
    Ufs,
    /// Raw data
    Raw,
    /// Swap
    Swap,
    /// YAFFS2
    Yaffs2,
    /// Classic Mac HFS
    Hfs,
    /// UDF
    Udf,
    /// Anything else disktype reports
    Unknown(String),
}

/// How files are extracted from a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarvingStrategy {
    /// Sleuth Kit `tsk_recover`
    Tsk,
    /// HFS Explorer `unhfs`
    HfsExplorer,
    /// Loop mount and copy the tree
    MountAndCopy,
}

impl FileSystem {
    /// Classifies a filesystem name as reported by disktype, ignoring case.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("fat") {
            return FileSystem::Fat(name.to_string());
        }
        match lower.as_str() {
            "ntfs" => FileSystem::Ntfs,
            "ext" => FileSystem::Ext,
            "iso9660" => FileSystem::Iso9660,
            "hfs+" => FileSystem::HfsPlus,
            "ufs" => FileSystem::Ufs,
            "raw" => FileSystem::Raw,
            "swap" => FileSystem::Swap,
            "yaffs2" => FileSystem::Yaffs2,
            "hfs" => FileSystem::Hfs,
            "udf" => FileSystem::Udf,
            _ => FileSystem::Unknown(name.to_string()),
        }
    }

    /// The extraction strategy for this filesystem, if any.
    pub fn carving_strategy(&self) -> Option<CarvingStrategy> {
        match self {
            FileSystem::Fat(_)
            | FileSystem::Ntfs
            | FileSystem::Ext
            | FileSystem::Iso9660
            | FileSystem::HfsPlus
            | FileSystem::Ufs
            | FileSystem::Raw
            | FileSystem::Swap
            | FileSystem::Yaffs2 => Some(CarvingStrategy::Tsk),
            FileSystem::Hfs => Some(CarvingStrategy::HfsExplorer),
            FileSystem::Udf => Some(CarvingStrategy::MountAndCopy),
            FileSystem::Unknown(_) => None,
        }
    }

    /// Lowercase name, as used for `mount -t` and directory names.
    pub fn mount_type(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileSystem::Fat(name) | FileSystem::Unknown(name) => name.as_str(),
            FileSystem::Ntfs => "NTFS",
            FileSystem::Ext => "ext",
            FileSystem::Iso9660 => "ISO9660",
            FileSystem::HfsPlus => "HFS+",
            FileSystem::Ufs => "UFS",
            FileSystem::Raw => "raw",
            FileSystem::Swap => "swap",
            FileSystem::Yaffs2 => "YAFFS2",
            FileSystem::Hfs => "HFS",
            FileSystem::Udf => "UDF",
        };
        f.write_str(name)
    }
}

impl CarvingStrategy {
    /// Phrase used in archival scope notes.
    pub fn description(&self) -> &'static str {
        match self {
            CarvingStrategy::Tsk => "using SleuthKit's tsk_recover",
            CarvingStrategy::HfsExplorer => "using the HFSExplorer command line utility unhfs",
            CarvingStrategy::MountAndCopy => "by mounting the disk image and copying its files",
        }
    }
}

/// One volume found in a disk image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Volume {
    /// 1-based position in the disktype report; 0 for the trailing section
    /// of a report that never named a filesystem
    pub id: u32,
    /// Filesystem name exactly as reported (e.g. `FAT12`, `HFS`)
    pub file_system: String,
    /// Volume label, quotes removed
    pub name: String,
    /// Label reduced to path-safe characters
    pub formatted_name: String,
    /// `volume-{id}-{fs}[-{formatted_name}]`
    pub output_directory_name: String,
    /// Size text as printed by disktype
    pub size: Option<String>,
    /// Whether carving left any files behind
    pub carved: bool,
}

impl Volume {
    /// Classified filesystem type.
    pub fn file_system(&self) -> FileSystem {
        FileSystem::from_name(&self.file_system)
    }

    /// True when the report produced this section without a filesystem line.
    pub fn is_placeholder(&self) -> bool {
        self.id == 0
    }
}

/// Reduces a volume label to alphanumerics, `-` and `_`.
///
/// Whitespace survives the filter and spaces then become underscores, so
/// `"ok_images + rome2"` yields `"ok_images__rome2"`.
pub fn format_volume_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    kept.replace(' ', "_").trim_end_matches('/').to_string()
}

/// Parses a disktype report into volumes, in report order.
///
/// A section is flushed when the next `file system` line arrives only if it
/// recorded a filesystem, but the final section is always appended. A report
/// with no filesystem lines therefore yields one placeholder volume.
pub fn parse_volumes(report: &str) -> Vec<Volume> {
    let mut volumes = Vec::new();
    let mut current = Volume::default();
    let mut next_id = 0;

    for raw_line in report.lines() {
        let line = raw_line.trim();

        if line.contains("file system") {
            if !current.file_system.is_empty() {
                volumes.push(std::mem::take(&mut current));
            }
            next_id += 1;
            let file_system = line
                .split(" file system")
                .next()
                .unwrap_or_default()
                .to_string();
            current.id = next_id;
            current.name.clear();
            current.formatted_name.clear();
            current.output_directory_name =
                format!("volume-{}-{}", next_id, file_system.to_lowercase());
            current.file_system = file_system;
        } else if line.contains("Volume name") {
            if current.id == 0 {
                continue;
            }
            current.name = line.replace("Volume name ", "").replace('"', "");
            current.formatted_name = format_volume_name(&current.name);
            current.output_directory_name =
                format!("{}-{}", current.output_directory_name, current.formatted_name);
        } else if line.contains("Volume size") {
            current.size = Some(line.replace("Volume size ", ""));
        } else if line.contains("Disk size") {
            current.size = Some(line.replace("Disk size ", ""));
        }
    }

    volumes.push(current);
    volumes
}
