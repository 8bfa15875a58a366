//! FileObject - a single directory entry recorded in a DFXML document.
//!
//! Documents produced by fiwalk describe what the Sleuth Kit saw on a volume,
//! including deleted entries; documents produced by a directory walk describe
//! carved output on the host filesystem. Both land in the same record.

use crate::objects::common::{Hashes, Timestamp, TimestampName};

/// File system name type (regular file, directory, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameType {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Symbolic link
    SymbolicLink,
    /// Block device
    BlockDevice,
    /// Character device
    CharacterDevice,
    /// Named pipe (FIFO)
    Fifo,
    /// Socket
    Socket,
    /// Shadow/whiteout entry
    Shadow,
    /// Virtual file
    Virtual,
    /// Unknown type
    Unknown,
}

impl NameType {
    /// Maps the single-character code used in `<name_type>`.
    pub fn from_char(c: char) -> Self {
        match c {
            'r' => NameType::Regular,
            'd' => NameType::Directory,
            'l' => NameType::SymbolicLink,
            'b' => NameType::BlockDevice,
            'c' => NameType::CharacterDevice,
            'p' => NameType::Fifo,
            's' => NameType::Socket,
            'w' => NameType::Shadow,
            'v' => NameType::Virtual,
            _ => NameType::Unknown,
        }
    }

    /// Returns the single-character string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NameType::Regular => "r",
            NameType::Directory => "d",
            NameType::SymbolicLink => "l",
            NameType::BlockDevice => "b",
            NameType::CharacterDevice => "c",
            NameType::Fifo => "p",
            NameType::Socket => "s",
            NameType::Shadow => "w",
            NameType::Virtual => "v",
            NameType::Unknown => "-",
        }
    }
}

impl std::str::FromStr for NameType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        Ok(match (chars.next(), chars.next()) {
            (Some(c), None) => NameType::from_char(c.to_ascii_lowercase()),
            _ => match s.trim().to_lowercase().as_str() {
                "regular" => NameType::Regular,
                "directory" => NameType::Directory,
                "symlink" | "symbolic_link" => NameType::SymbolicLink,
                _ => NameType::Unknown,
            },
        })
    }
}

/// A file object in DFXML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileObject {
    /// Unique identifier within the document
    pub id: Option<u64>,
    /// Path of the entry, relative to the volume or walk root
    pub filename: Option<String>,
    /// Partition number
    pub partition: Option<u32>,
    /// Inode number
    pub inode: Option<u64>,

    /// Overall allocation status
    pub alloc: Option<bool>,
    /// Inode allocation status
    pub alloc_inode: Option<bool>,
    /// Name allocation status
    pub alloc_name: Option<bool>,
    /// Explicit unallocated marker
    pub unalloc: Option<bool>,
    /// Used flag
    pub used: Option<bool>,
    /// Orphan flag
    pub orphan: Option<bool>,
    /// Compressed flag
    pub compressed: Option<bool>,

    /// Name type (file, directory, etc.)
    pub name_type: Option<NameType>,
    /// Sleuth Kit meta type code
    pub meta_type: Option<u32>,
    /// Logical file size in bytes
    pub filesize: Option<u64>,

    /// Modification time
    pub mtime: Option<Timestamp>,
    /// Access time
    pub atime: Option<Timestamp>,
    /// Metadata change time
    pub ctime: Option<Timestamp>,
    /// Creation time
    pub crtime: Option<Timestamp>,
    /// Deletion time
    pub dtime: Option<Timestamp>,
    /// Backup time
    pub bkup_time: Option<Timestamp>,

    /// User ID
    pub uid: Option<u32>,
    /// Group ID
    pub gid: Option<u32>,
    /// File mode/permissions
    pub mode: Option<u32>,
    /// Number of hard links
    pub nlink: Option<u32>,

    /// Target path for symbolic links
    pub link_target: Option<String>,
    /// Content digests
    pub hashes: Hashes,
    /// File type from libmagic
    pub libmagic: Option<String>,
    /// Error message if the generator failed on this entry
    pub error: Option<String>,
}

impl FileObject {
    /// Creates a FileObject with a filename.
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Returns true if the file is allocated.
    ///
    /// Collapses potentially partial allocation information into a single answer.
    pub fn is_allocated(&self) -> Option<bool> {
        if self.alloc_inode == Some(true) && self.alloc_name == Some(true) {
            return Some(true);
        }
        if self.alloc_inode.is_none() && self.alloc_name.is_none() {
            return self.alloc;
        }
        Some(false)
    }

    /// True when the entry is only recoverable from unallocated space.
    pub fn is_unallocated(&self) -> bool {
        self.unalloc == Some(true) || self.is_allocated() == Some(false)
    }

    /// True for regular files, and for entries that carry no name type at all.
    pub fn is_regular_or_untyped(&self) -> bool {
        matches!(self.name_type, None | Some(NameType::Regular))
    }

    /// Sets a timestamp by name.
    pub fn set_timestamp(&mut self, name: TimestampName, ts: Timestamp) {
        match name {
            TimestampName::Mtime => self.mtime = Some(ts),
            TimestampName::Atime => self.atime = Some(ts),
            TimestampName::Ctime => self.ctime = Some(ts),
            TimestampName::Crtime => self.crtime = Some(ts),
            TimestampName::Dtime => self.dtime = Some(ts),
            TimestampName::BkupTime => self.bkup_time = Some(ts),
        }
    }

    /// Gets a timestamp by name.
    pub fn get_timestamp(&self, name: TimestampName) -> Option<&Timestamp> {
        match name {
            TimestampName::Mtime => self.mtime.as_ref(),
            TimestampName::Atime => self.atime.as_ref(),
            TimestampName::Ctime => self.ctime.as_ref(),
            TimestampName::Crtime => self.crtime.as_ref(),
            TimestampName::Dtime => self.dtime.as_ref(),
            TimestampName::BkupTime => self.bkup_time.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_type_codes() {
        assert_eq!("r".parse::<NameType>().unwrap(), NameType::Regular);
        assert_eq!("D".parse::<NameType>().unwrap(), NameType::Directory);
        assert_eq!("symlink".parse::<NameType>().unwrap(), NameType::SymbolicLink);
        assert_eq!("??".parse::<NameType>().unwrap(), NameType::Unknown);
        assert_eq!(NameType::from_char('p').as_str(), "p");
    }

    #[test]
    fn test_is_allocated() {
        let mut fo = FileObject::default();
        assert!(fo.is_allocated().is_none());
        assert!(!fo.is_unallocated());

        fo.alloc_inode = Some(true);
        fo.alloc_name = Some(true);
        assert_eq!(fo.is_allocated(), Some(true));

        fo.alloc_inode = Some(false);
        assert_eq!(fo.is_allocated(), Some(false));
        assert!(fo.is_unallocated());
    }

    #[test]
    fn test_unalloc_marker() {
        let mut fo = FileObject::with_filename("Docs/Private/ReyHalif.doc");
        fo.unalloc = Some(true);
        assert!(fo.is_unallocated());

        let mut deleted = FileObject::default();
        deleted.alloc = Some(false);
        assert!(deleted.is_unallocated());
    }

    #[test]
    fn test_regular_or_untyped() {
        let mut fo = FileObject::with_filename("ARP.EXE");
        assert!(fo.is_regular_or_untyped());
        fo.name_type = Some(NameType::Regular);
        assert!(fo.is_regular_or_untyped());
        fo.name_type = Some(NameType::Directory);
        assert!(!fo.is_regular_or_untyped());
    }
}
