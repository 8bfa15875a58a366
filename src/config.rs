//! Configuration - external tool locations and carving parameters.
//!
//! Loaded from a TOML file passed with `--config`; every key is optional.
//!
//! ```toml
//! [tools]
//! unhfs = "/opt/hfsexplorer/bin/unhfs"
//! sudo = "doas"
//!
//! [mount]
//! point = "/mnt/diskid/"
//!
//! [walk]
//! jobs = 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Toolkit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// External program locations
    pub tools: ToolPaths,
    /// Mount-and-copy settings
    pub mount: MountConfig,
    /// Directory walk settings
    pub walk: WalkConfig,
}

/// Programs invoked as subprocesses. Bare names are resolved through `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// libewf's EWF-to-raw exporter
    pub ewfexport: String,
    /// Filesystem identifier
    pub disktype: String,
    /// Sleuth Kit DFXML generator
    pub fiwalk: String,
    /// Sleuth Kit file recovery
    pub tsk_recover: String,
    /// Shell used to run the HFS Explorer launcher script
    pub bash: String,
    /// HFS Explorer command line extractor
    pub unhfs: PathBuf,
    /// Brunnhilde reporting script
    pub brunnhilde: String,
    /// BagIt packaging script
    pub bagit: String,
    /// mount(8)
    pub mount: String,
    /// umount(8)
    pub umount: String,
    /// Privilege wrapper for mount/umount; empty runs them directly
    pub sudo: Option<String>,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ewfexport: "ewfexport".to_string(),
            disktype: "disktype".to_string(),
            fiwalk: "fiwalk".to_string(),
            tsk_recover: "tsk_recover".to_string(),
            bash: "bash".to_string(),
            unhfs: PathBuf::from("/usr/share/hfsexplorer/bin/unhfs"),
            brunnhilde: "brunnhilde.py".to_string(),
            bagit: "bagit.py".to_string(),
            mount: "mount".to_string(),
            umount: "umount".to_string(),
            sudo: Some("sudo".to_string()),
        }
    }
}

/// Mount-and-copy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Fixed mount point shared by every mount in a run
    pub point: PathBuf,
    /// Value passed to `mount -o`
    pub options: String,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            point: PathBuf::from("/mnt/diskid/"),
            options: "loop,ro,noexec".to_string(),
        }
    }
}

/// Directory walk settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Worker threads for hashing (1 = sequential)
    pub jobs: usize,
    /// Compute md5/sha1/sha256 digests for regular files
    pub hashes: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            hashes: true,
        }
    }
}

impl ToolkitConfig {
    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Reads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolkitConfig::default();
        assert_eq!(config.mount.point, PathBuf::from("/mnt/diskid/"));
        assert_eq!(
            config.tools.unhfs,
            PathBuf::from("/usr/share/hfsexplorer/bin/unhfs")
        );
        assert_eq!(config.tools.sudo.as_deref(), Some("sudo"));
        assert_eq!(config.walk.jobs, 1);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolkit.toml");
        fs::write(
            &path,
            "[tools]\nfiwalk = \"/usr/local/bin/fiwalk\"\n\n[walk]\njobs = 4\n",
        )
        .unwrap();

        let config = ToolkitConfig::load(&path).unwrap();
        assert_eq!(config.tools.fiwalk, "/usr/local/bin/fiwalk");
        assert_eq!(config.tools.disktype, "disktype");
        assert_eq!(config.walk.jobs, 4);
        assert!(config.walk.hashes);
    }

    #[test]
    fn test_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolkit.toml");
        fs::write(&path, "[tools\n").unwrap();
        assert!(matches!(
            ToolkitConfig::load(&path),
            Err(crate::Error::Config(_))
        ));
        assert!(ToolkitConfig::load_or_default(None).is_ok());
    }
}
