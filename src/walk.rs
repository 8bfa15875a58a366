//! Directory-tree DFXML generation.
//!
//! Walks a carved tree in sorted order and records one file object per
//! entry, the root itself included as `.`. Regular files are hashed;
//! with `walk.jobs > 1` hashing runs on a rayon pool but the document
//! keeps the walk order.

use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use digest::Digest;
use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::WalkConfig;
use crate::error::Result;
use crate::objects::{
    DFXMLObject, FileObject, HashType, Hashes, LibraryObject, NameType, Timestamp,
};
use crate::writer;

/// Program name recorded in walk documents.
pub const PROGRAM_NAME: &str = "Disk Image Toolkit";

const HASH_BUFFER_SIZE: usize = 1024 * 1024;

fn name_type_of(metadata: &Metadata) -> NameType {
    let file_type = metadata.file_type();

    if file_type.is_symlink() {
        NameType::SymbolicLink
    } else if file_type.is_dir() {
        NameType::Directory
    } else if file_type.is_file() {
        NameType::Regular
    } else if file_type.is_char_device() {
        NameType::CharacterDevice
    } else if file_type.is_block_device() {
        NameType::BlockDevice
    } else if file_type.is_fifo() {
        NameType::Fifo
    } else if file_type.is_socket() {
        NameType::Socket
    } else {
        NameType::Unknown
    }
}

fn system_time_to_timestamp(st: SystemTime) -> Timestamp {
    let datetime: DateTime<Utc> = st.into();
    Timestamp::from_datetime(datetime)
}

/// md5, sha1 and sha256 of the file at `path`, in one pass.
fn compute_hashes(path: &Path) -> io::Result<Hashes> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    let mut md5_hasher = md5::Md5::new();
    let mut sha1_hasher = sha1::Sha1::new();
    let mut sha256_hasher = sha2::Sha256::new();

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        let data = &buffer[..n];
        md5_hasher.update(data);
        sha1_hasher.update(data);
        sha256_hasher.update(data);
    }

    let mut hashes = Hashes::default();
    hashes.set(HashType::Md5, format!("{:x}", md5_hasher.finalize()));
    hashes.set(HashType::Sha1, format!("{:x}", sha1_hasher.finalize()));
    hashes.set(HashType::Sha256, format!("{:x}", sha256_hasher.finalize()));
    Ok(hashes)
}

/// Builds the file object for `path`, named relative to `root`.
fn path_to_fileobject(path: &Path, root: &Path, hash: bool) -> FileObject {
    let rel_path = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    let mut fobj = FileObject::with_filename(if rel_path.is_empty() {
        ".".to_string()
    } else {
        rel_path
    });

    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) => {
            fobj.error = Some(format!("Failed to get metadata: {}", e));
            return fobj;
        }
    };

    let name_type = name_type_of(&metadata);
    fobj.name_type = Some(name_type);
    if name_type == NameType::Regular {
        fobj.filesize = Some(metadata.len());
    }

    // Everything on a live filesystem is allocated.
    fobj.alloc = Some(true);
    fobj.inode = Some(metadata.ino());
    fobj.mode = Some(metadata.permissions().mode());
    fobj.nlink = u32::try_from(metadata.nlink()).ok();
    fobj.uid = Some(metadata.uid());
    fobj.gid = Some(metadata.gid());

    if let Ok(mtime) = metadata.modified() {
        fobj.mtime = Some(system_time_to_timestamp(mtime));
    }
    if let Ok(atime) = metadata.accessed() {
        fobj.atime = Some(system_time_to_timestamp(atime));
    }
    if let Some(ctime) = DateTime::<Utc>::from_timestamp(metadata.ctime(), 0) {
        fobj.ctime = Some(Timestamp::from_datetime(ctime));
    }
    if let Ok(crtime) = metadata.created() {
        fobj.crtime = Some(system_time_to_timestamp(crtime));
    }

    if name_type == NameType::SymbolicLink {
        if let Ok(target) = fs::read_link(path) {
            fobj.link_target = Some(target.to_string_lossy().into_owned());
        }
    }

    if hash && name_type == NameType::Regular {
        match compute_hashes(path) {
            Ok(hashes) => fobj.hashes = hashes,
            Err(e) => fobj.error = Some(format!("Error reading file for hashing: {}", e)),
        }
    }

    fobj
}

/// Walks `root` and returns the resulting document without writing it.
pub fn dfxml_from_path(root: &Path, config: &WalkConfig) -> Result<DFXMLObject> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(e) => paths.push(e.into_path()),
            Err(e) => warn!("Error walking {}: {}", root.display(), e),
        }
    }

    let file_objects: Vec<FileObject> = if config.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs)
            .build()
            .map_err(|e| io::Error::other(e.to_string()))?;
        pool.install(|| {
            paths
                .par_iter()
                .map(|path| path_to_fileobject(path, root, config.hashes))
                .collect()
        })
    } else {
        paths
            .iter()
            .map(|path| path_to_fileobject(path, root, config.hashes))
            .collect()
    };

    let mut dobj = DFXMLObject::new();
    dobj.program = Some(PROGRAM_NAME.to_string());
    dobj.program_version = Some(crate::VERSION.to_string());
    dobj.dc.insert("type".to_string(), "File system walk".to_string());
    dobj.add_creator_library(LibraryObject::new("walkdir", "2"));
    dobj.add_creator_library(LibraryObject::new("diskimage-toolkit", crate::VERSION));

    for fobj in file_objects {
        dobj.append_file(fobj);
    }
    Ok(dobj)
}

/// Walks `root` and writes its DFXML document to `dfxml_path`.
pub fn write_dfxml_from_path(root: &Path, dfxml_path: &Path, config: &WalkConfig) -> Result<()> {
    let dobj = dfxml_from_path(root, config)?;
    if let Some(parent) = dfxml_path.parent() {
        fs::create_dir_all(parent)?;
    }
    writer::write_to_path(&dobj, dfxml_path)?;
    info!("DFXML written to {}", dfxml_path.display());
    Ok(())
}
