//! Volume and disk statistics from DFXML documents.
//!
//! Each document yields a [`VolumeStatistics`]: regular-file count, byte
//! total and one representative date range. The range comes from a single
//! timestamp family, chosen by comparing family minimums as strings:
//! modified by default, changed if its earliest value is older, created if
//! older still.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use walkdir::WalkDir;

use crate::error::Result;
use crate::objects::{FileObject, Timestamp};
use crate::reader;

/// Summary of the regular files described by one or more documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeStatistics {
    /// Regular files counted
    pub file_count: u64,
    /// Sum of their sizes
    pub total_bytes: u64,
    /// `YYYY-MM-DD`, or empty when nothing is dated
    pub earliest_date: String,
    /// `YYYY-MM-DD`, or empty when nothing is dated
    pub latest_date: String,
}

/// Timestamp family used for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFamily {
    /// `mtime`
    Modified,
    /// `ctime`
    Changed,
    /// `crtime`
    Created,
}

/// Accumulates statistics over file objects.
#[derive(Debug, Clone, Default)]
pub struct StatisticsBuilder {
    export_all: bool,
    file_count: u64,
    total_bytes: u64,
    modified: Vec<String>,
    changed: Vec<String>,
    created: Vec<String>,
}

fn push_date(dates: &mut Vec<String>, ts: Option<&Timestamp>) {
    if let Some(ts) = ts {
        if !ts.text.is_empty() && ts.text != "None" {
            dates.push(ts.text.clone());
        }
    }
}

fn bounds(dates: &[String]) -> Option<(&str, &str)> {
    let min = dates.iter().min()?;
    let max = dates.iter().max()?;
    Some((min.as_str(), max.as_str()))
}

fn date_prefix(text: &str) -> String {
    text.chars().take(10).collect()
}

impl StatisticsBuilder {
    /// Starts an empty tally. With `export_all`, unallocated files count too.
    pub fn new(export_all: bool) -> Self {
        Self {
            export_all,
            ..Default::default()
        }
    }

    /// Counts `file` if it is a regular file that belongs in the tally.
    pub fn add(&mut self, file: &FileObject) {
        if !file.is_regular_or_untyped() {
            return;
        }
        if !self.export_all && file.is_unallocated() {
            return;
        }

        self.file_count += 1;
        self.total_bytes += file.filesize.unwrap_or(0);
        push_date(&mut self.modified, file.mtime.as_ref());
        push_date(&mut self.changed, file.ctime.as_ref());
        push_date(&mut self.created, file.crtime.as_ref());
    }

    /// The family whose earliest value wins, given the fallback year.
    pub fn select_family(&self, current_year: &str) -> DateFamily {
        let mut family = DateFamily::Modified;
        let mut date_to_use = bounds(&self.modified)
            .map(|(min, _)| min)
            .unwrap_or(current_year);

        if let Some((min, _)) = bounds(&self.changed) {
            if min < date_to_use {
                family = DateFamily::Changed;
                date_to_use = min;
            }
        }
        if let Some((min, _)) = bounds(&self.created) {
            if min < date_to_use {
                family = DateFamily::Created;
            }
        }
        family
    }

    /// Finishes the tally; `None` when no file was counted.
    pub fn finish(&self, current_year: &str) -> Option<VolumeStatistics> {
        if self.file_count == 0 {
            return None;
        }

        let dates = match self.select_family(current_year) {
            DateFamily::Modified => &self.modified,
            DateFamily::Changed => &self.changed,
            DateFamily::Created => &self.created,
        };
        let (earliest_date, latest_date) = match bounds(dates) {
            Some((min, max)) => (date_prefix(min), date_prefix(max)),
            None => (current_year.to_string(), current_year.to_string()),
        };

        Some(VolumeStatistics {
            file_count: self.file_count,
            total_bytes: self.total_bytes,
            earliest_date,
            latest_date,
        })
    }
}

/// The current year as a string, the fallback when no file has an mtime.
pub fn current_year() -> String {
    Utc::now().year().to_string()
}

/// Statistics for one document; `Ok(None)` when it has no countable files.
pub fn summarize_document(dfxml_path: &Path, export_all: bool) -> Result<Option<VolumeStatistics>> {
    let mut builder = StatisticsBuilder::new(export_all);
    reader::for_each_file_object(dfxml_path, |file| builder.add(&file))?;
    Ok(builder.finish(&current_year()))
}

impl VolumeStatistics {
    /// Folds `other` into this record.
    ///
    /// Counts add up; an empty date never replaces a present one.
    pub fn merge(&mut self, other: &VolumeStatistics) {
        self.file_count += other.file_count;
        self.total_bytes += other.total_bytes;
        if !other.earliest_date.is_empty()
            && (self.earliest_date.is_empty() || other.earliest_date < self.earliest_date)
        {
            self.earliest_date = other.earliest_date.clone();
        }
        if !other.latest_date.is_empty()
            && (self.latest_date.is_empty() || other.latest_date > self.latest_date)
        {
            self.latest_date = other.latest_date.clone();
        }
    }

    /// `YYYY` when both ends fall in one year, else `YYYY-YYYY`.
    pub fn date_statement(&self) -> String {
        date_statement(&self.earliest_date, &self.latest_date)
    }
}

/// Combines per-volume records into one disk-level record.
pub fn combine<'a>(records: impl IntoIterator<Item = &'a VolumeStatistics>) -> VolumeStatistics {
    let mut total = VolumeStatistics::default();
    for record in records {
        total.merge(record);
    }
    total
}

/// `YYYY` when both dates share a year, else `YYYY-YYYY`.
pub fn date_statement(earliest: &str, latest: &str) -> String {
    let first: String = earliest.chars().take(4).collect();
    let last: String = latest.chars().take(4).collect();
    if first == last {
        first
    } else {
        format!("{}-{}", first, last)
    }
}

const SIZE_UNITS: [&str; 9] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Renders a byte count with a 1024-based unit and no decimal places.
///
/// ```rust
/// use diskimage_toolkit::stats::convert_size;
///
/// assert_eq!(convert_size(0), "0 bytes");
/// assert_eq!(convert_size(1048576), "1 MB");
/// assert_eq!(convert_size(1457664), "1 MB");
/// ```
pub fn convert_size(size: u64) -> String {
    if size == 0 {
        return "0 bytes".to_string();
    }
    let mut exponent = 0;
    let mut scale = 1u128;
    while exponent < SIZE_UNITS.len() - 1 && scale * 1024 <= u128::from(size) {
        scale *= 1024;
        exponent += 1;
    }
    let value = (size as f64 / scale as f64).round_ties_even();
    format!("{} {}", value as u64, SIZE_UNITS[exponent])
}

/// Filesystem names in first-seen order without repeats.
pub fn distinct_file_systems<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        if !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// DFXML documents for a disk: files named `dfxml*` under `dir`, sorted by path.
pub fn find_dfxml_documents(dir: &Path) -> Vec<PathBuf> {
    let mut documents: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy().starts_with("dfxml"))
        .map(|e| e.into_path())
        .collect();
    documents.sort();
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FAT12_DFXML;
    use std::fs;

    fn file(size: u64, mtime: &str, ctime: &str, crtime: &str) -> FileObject {
        let mut f = FileObject::with_filename("f");
        f.filesize = Some(size);
        for (slot, text) in [(&mut f.mtime, mtime), (&mut f.ctime, ctime), (&mut f.crtime, crtime)] {
            if !text.is_empty() {
                *slot = Some(Timestamp::from_text(text));
            }
        }
        f
    }

    #[test]
    fn test_created_family_wins() {
        let mut builder = StatisticsBuilder::new(false);
        builder.add(&file(10, "2020-01-01T00:00:00", "2019-03-01T00:00:00", "2018-06-15T12:00:00"));
        builder.add(&file(20, "2020-02-01T00:00:00", "2019-04-01T00:00:00", "2018-07-01T00:00:00"));

        assert_eq!(builder.select_family("2026"), DateFamily::Created);
        let stats = builder.finish("2026").unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_bytes, 30);
        assert_eq!(stats.earliest_date, "2018-06-15");
        assert_eq!(stats.latest_date, "2018-07-01");
    }

    #[test]
    fn test_changed_family_beats_modified() {
        let mut builder = StatisticsBuilder::new(false);
        builder.add(&file(1, "2020-01-01T00:00:00", "2019-03-01T00:00:00", "2021-01-01T00:00:00"));
        assert_eq!(builder.select_family("2026"), DateFamily::Changed);
        assert_eq!(builder.finish("2026").unwrap().earliest_date, "2019-03-01");
    }

    #[test]
    fn test_modified_family_is_default() {
        let mut builder = StatisticsBuilder::new(false);
        builder.add(&file(1, "2001-01-01T00:00:00", "2019-03-01T00:00:00", ""));
        builder.add(&file(1, "2003-05-01T00:00:00", "", "None"));
        assert_eq!(builder.select_family("2026"), DateFamily::Modified);
        let stats = builder.finish("2026").unwrap();
        assert_eq!(stats.earliest_date, "2001-01-01");
        assert_eq!(stats.latest_date, "2003-05-01");
        assert_eq!(stats.date_statement(), "2001-2003");
    }

    #[test]
    fn test_undated_files_fall_back_to_year() {
        let mut builder = StatisticsBuilder::new(false);
        builder.add(&file(1, "", "", ""));
        let stats = builder.finish("2026").unwrap();
        assert_eq!(stats.earliest_date, "2026");
        assert_eq!(stats.date_statement(), "2026");
    }

    #[test]
    fn test_empty_tally() {
        assert_eq!(StatisticsBuilder::new(true).finish("2026"), None);
    }

    #[test]
    fn test_fiwalk_document_respects_allocation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dfxml.xml");
        fs::write(&path, FAT12_DFXML).unwrap();

        let allocated = summarize_document(&path, false).unwrap().unwrap();
        assert_eq!(allocated.file_count, 1);
        assert_eq!(allocated.total_bytes, 19536);
        assert_eq!(allocated.earliest_date, "1999-04-23");

        let all = summarize_document(&path, true).unwrap().unwrap();
        assert_eq!(all.file_count, 2);
        assert_eq!(all.total_bytes, 19536 + 19968);
        assert_eq!(all.earliest_date, "1999-04-23");
        assert_eq!(all.latest_date, "2002-05-16");
    }

    #[test]
    fn test_combine_ignores_empty_dates() {
        let a = VolumeStatistics {
            file_count: 2,
            total_bytes: 100,
            earliest_date: "2001-01-01".to_string(),
            latest_date: "2004-01-01".to_string(),
        };
        let b = VolumeStatistics {
            file_count: 1,
            total_bytes: 5,
            earliest_date: String::new(),
            latest_date: String::new(),
        };
        let c = VolumeStatistics {
            file_count: 3,
            total_bytes: 0,
            earliest_date: "1998-02-02".to_string(),
            latest_date: "2000-01-01".to_string(),
        };
        let total = combine([&a, &b, &c]);
        assert_eq!(total.file_count, 6);
        assert_eq!(total.total_bytes, 105);
        assert_eq!(total.earliest_date, "1998-02-02");
        assert_eq!(total.latest_date, "2004-01-01");
    }

    #[test]
    fn test_convert_size() {
        assert_eq!(convert_size(0), "0 bytes");
        assert_eq!(convert_size(1), "1 bytes");
        assert_eq!(convert_size(1023), "1023 bytes");
        assert_eq!(convert_size(1024), "1 KB");
        assert_eq!(convert_size(1536), "2 KB");
        assert_eq!(convert_size(2560), "2 KB");
        assert_eq!(convert_size(1048576), "1 MB");
        assert_eq!(convert_size(19536 + 19968), "39 KB");
        assert_eq!(convert_size(u64::MAX), "16 EB");
    }

    #[test]
    fn test_date_statement() {
        assert_eq!(date_statement("1999-04-23", "1999-12-01"), "1999");
        assert_eq!(date_statement("1999-04-23", "2002-05-16"), "1999-2002");
    }

    #[test]
    fn test_distinct_file_systems() {
        assert_eq!(
            distinct_file_systems(["HFS", "ISO9660", "HFS"]),
            vec!["HFS".to_string(), "ISO9660".to_string()]
        );
    }

    #[test]
    fn test_find_dfxml_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dfxml_volume-2-iso9660.xml"), "").unwrap();
        fs::write(dir.path().join("dfxml.xml"), "").unwrap();
        fs::write(dir.path().join("disktype.txt"), "").unwrap();
        fs::create_dir_all(dir.path().join("brunnhilde")).unwrap();
        fs::write(dir.path().join("brunnhilde").join("dfxml_extra.xml"), "").unwrap();

        let names: Vec<String> = find_dfxml_documents(dir.path())
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["brunnhilde/dfxml_extra.xml", "dfxml.xml", "dfxml_volume-2-iso9660.xml"]
        );
    }
}
