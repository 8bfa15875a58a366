//! Common types shared across DFXML objects.
//!
//! - [`Hashes`] - Digests recorded for a file
//! - [`Timestamp`] - A forensic timestamp as recorded in the document

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DFXML Namespaces and Constants
// ============================================================================

/// Schema version declared by documents this crate writes
pub const DFXML_VERSION: &str = "1.1.1";

/// Dublin Core namespace
pub const XMLNS_DC: &str = "http://purl.org/dc/elements/1.1/";

/// DFXML namespace
pub const XMLNS_DFXML: &str = "http://www.forensicswiki.org/wiki/Category:Digital_Forensics_XML";

// ============================================================================
// Hash Types
// ============================================================================

/// Hash algorithms recorded by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    /// MD5 (128-bit)
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
    /// SHA-256 (256-bit)
    Sha256,
}

impl HashType {
    /// Returns the `type` attribute value used on `<hashdigest>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashType::Md5 => "md5",
            HashType::Sha1 => "sha1",
            HashType::Sha256 => "sha256",
        }
    }
}

impl FromStr for HashType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(HashType::Md5),
            "sha1" => Ok(HashType::Sha1),
            "sha256" => Ok(HashType::Sha256),
            other => Err(Error::MalformedDocument(format!(
                "unsupported hashdigest type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digests recorded for a file, stored as lowercase hex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hashes {
    /// MD5 digest
    pub md5: Option<String>,
    /// SHA-1 digest
    pub sha1: Option<String>,
    /// SHA-256 digest
    pub sha256: Option<String>,
}

impl Hashes {
    /// Returns true if any digest is set.
    pub fn has_any(&self) -> bool {
        self.md5.is_some() || self.sha1.is_some() || self.sha256.is_some()
    }

    /// Sets a digest by type.
    pub fn set(&mut self, hash_type: HashType, value: impl AsRef<str>) {
        let normalized = Some(value.as_ref().to_lowercase());
        match hash_type {
            HashType::Md5 => self.md5 = normalized,
            HashType::Sha1 => self.sha1 = normalized,
            HashType::Sha256 => self.sha256 = normalized,
        }
    }

    /// Gets a digest by type.
    pub fn get(&self, hash_type: HashType) -> Option<&str> {
        match hash_type {
            HashType::Md5 => self.md5.as_deref(),
            HashType::Sha1 => self.sha1.as_deref(),
            HashType::Sha256 => self.sha256.as_deref(),
        }
    }

    /// Iterates over all set digests.
    pub fn iter(&self) -> impl Iterator<Item = (HashType, &str)> {
        [HashType::Md5, HashType::Sha1, HashType::Sha256]
            .into_iter()
            .filter_map(|t| self.get(t).map(|v| (t, v)))
    }
}

// ============================================================================
// Timestamp Types
// ============================================================================

/// The MAC-style timestamps a file object can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampName {
    /// Modification time
    Mtime,
    /// Access time
    Atime,
    /// Metadata change time
    Ctime,
    /// Creation time
    Crtime,
    /// Deletion time
    Dtime,
    /// Backup time
    BkupTime,
}

impl TimestampName {
    /// All names, in the order the writer emits them.
    pub const ALL: [TimestampName; 6] = [
        TimestampName::Mtime,
        TimestampName::Ctime,
        TimestampName::Atime,
        TimestampName::Crtime,
        TimestampName::Dtime,
        TimestampName::BkupTime,
    ];

    /// Returns the XML element name for this timestamp.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampName::Mtime => "mtime",
            TimestampName::Atime => "atime",
            TimestampName::Ctime => "ctime",
            TimestampName::Crtime => "crtime",
            TimestampName::Dtime => "dtime",
            TimestampName::BkupTime => "bkup_time",
        }
    }
}

impl FromStr for TimestampName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mtime" => Ok(TimestampName::Mtime),
            "atime" => Ok(TimestampName::Atime),
            "ctime" => Ok(TimestampName::Ctime),
            "crtime" => Ok(TimestampName::Crtime),
            "dtime" => Ok(TimestampName::Dtime),
            "bkup_time" => Ok(TimestampName::BkupTime),
            _ => Err(Error::InvalidTimestamp(format!(
                "Unknown timestamp name: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for TimestampName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forensic timestamp, kept as the document text.
///
/// Statistics compare and truncate the zero-padded ISO strings directly, and
/// the restorer reparses a prefix of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    /// Text as it appeared in the document
    pub text: String,
}

impl Timestamp {
    /// Builds a timestamp from document text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Builds a timestamp from a parsed time, rendered in RFC 3339 with `Z`.
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self {
            text: time.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
