//! Restores recorded modification times onto carved files.
//!
//! tsk_recover writes files with the time of extraction. The disk-level
//! DFXML document still holds the original times, so each regular file is
//! retimed from its record: `mtime` first, then `crtime`, then now.

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use filetime::FileTime;
use tracing::warn;

use crate::error::Result;
use crate::objects::{FileObject, Timestamp};
use crate::reader;

const RESTORE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Outcome of a restoration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Files whose times were set
    pub restored: usize,
    /// Regular-file records with no matching file on disk
    pub missing: usize,
    /// Files that were found but could not be retimed
    pub failed: usize,
}

/// Parses the first 19 characters of `text` as a UTC `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_restore_time(text: &str) -> Option<i64> {
    let prefix: String = text.chars().take(19).collect();
    NaiveDateTime::parse_from_str(&prefix, RESTORE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

fn usable(ts: Option<&Timestamp>) -> Option<&str> {
    ts.map(|t| t.text.as_str())
        .filter(|text| !text.is_empty() && *text != "None")
}

/// Unix time to apply to the carved copy of `file`.
fn target_time(file: &FileObject, now: i64) -> i64 {
    let recorded = usable(file.mtime.as_ref()).or_else(|| usable(file.crtime.as_ref()));
    match recorded {
        Some(text) => parse_restore_time(text).unwrap_or_else(|| {
            warn!(
                "Date string {} in unexpected format (expected: YYYY-MM-DDTHH:MM:SS). Using current time.",
                text
            );
            now
        }),
        None => now,
    }
}

/// Finds the carved file for a recorded name, under `dest` or as given.
fn locate(dest: &Path, name: &str) -> Option<PathBuf> {
    let carved = dest.join(name);
    if carved.is_file() {
        return Some(carved);
    }
    let direct = PathBuf::from(name);
    direct.is_file().then_some(direct)
}

/// Sets access and modification times under `dest` from the records in `dfxml_path`.
///
/// A document that can't be read fails the pass with
/// [`Error::MetadataRead`](crate::Error::MetadataRead); files retimed before
/// the failure keep their new times.
pub fn restore_modified_dates(dest: &Path, dfxml_path: &Path) -> Result<RestoreSummary> {
    let now = Utc::now().timestamp();
    let mut summary = RestoreSummary::default();

    reader::for_each_file_object(dfxml_path, |file| {
        if !file.is_regular_or_untyped() {
            return;
        }
        let Some(name) = file.filename.as_deref() else {
            return;
        };
        let Some(path) = locate(dest, name) else {
            summary.missing += 1;
            return;
        };

        let time = FileTime::from_unix_time(target_time(&file, now), 0);
        match filetime::set_file_times(&path, time, time) {
            Ok(()) => summary.restored += 1,
            Err(e) => {
                warn!("Unable to set times on {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    })?;

    Ok(summary)
}
