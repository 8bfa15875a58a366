//! Spreadsheet output and Brunnhilde report readers.
//!
//! Rows are written with every non-numeric cell quoted and CRLF line
//! endings, so the files open the same way in spreadsheet tools as the ones
//! archivists already work with.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, Terminator, Writer, WriterBuilder};

use crate::error::Result;

/// Columns of `analysis.csv`.
pub const ANALYSIS_HEADER: [&str; 9] = [
    "Disk image",
    "Volumes",
    "File systems",
    "Date statement",
    "Date begin",
    "Date end",
    "Extent",
    "Virus found",
    "Content description",
];

/// Columns of `description.csv`.
pub const DESCRIPTION_HEADER: [&str; 26] = [
    "Parent ID",
    "Identifier",
    "Title",
    "Archive Creator",
    "Date expression",
    "Date start",
    "Date end",
    "Level of description",
    "Extent and medium",
    "Scope and content",
    "Arrangement (optional)",
    "Accession number",
    "Appraisal, destruction, and scheduling information (optional)",
    "Name access points (optional)",
    "Geographic access points (optional)",
    "Conditions governing access (optional)",
    "Conditions governing reproduction (optional)",
    "Language of material (optional)",
    "Physical characteristics & technical requirements affecting use (optional)",
    "Finding aids (optional)",
    "Related units of description (optional)",
    "Archival history (optional)",
    "Immediate source of acquisition or transfer (optional)",
    "Archivists' note (optional)",
    "General note (optional)",
    "Description status",
];

/// Placeholder when the Brunnhilde formats report is missing.
pub const MISSING_FORMATS: &str = "ERROR! No Brunnhilde formats.csv file to pull formats from.";

fn spreadsheet_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .terminator(Terminator::CRLF)
        .quote_style(QuoteStyle::NonNumeric);
    builder
}

/// Wraps `inner` in a spreadsheet writer: non-numeric cells quoted, CRLF rows.
pub fn spreadsheet_writer<W: Write>(inner: W) -> Writer<W> {
    spreadsheet_builder().from_writer(inner)
}

/// Creates (truncating) the spreadsheet at `path` and writes its header row.
pub fn create_spreadsheet(path: &Path, header: &[&str]) -> Result<Writer<File>> {
    let mut writer = spreadsheet_builder().from_path(path)?;
    writer.write_record(header)?;
    Ok(writer)
}

/// Boolean cell text.
pub fn bool_cell(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Up to five most common formats from Brunnhilde's `formats.csv`.
///
/// Empty names read as `Unidentified`; a missing report yields the
/// [`MISSING_FORMATS`] placeholder.
pub fn read_top_formats(brunnhilde_dir: &Path) -> Vec<String> {
    let path = brunnhilde_dir.join("csv_reports").join("formats.csv");
    let mut reader = match ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(&path)
    {
        Ok(reader) => reader,
        Err(_) => return vec![MISSING_FORMATS.to_string()],
    };

    reader
        .records()
        .filter_map(|record| record.ok())
        .take(5)
        .map(|record| match record.get(0) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "Unidentified".to_string(),
        })
        .collect()
}

/// Whether the first line of Brunnhilde's virus log reports a hit.
pub fn virus_found(brunnhilde_dir: &Path) -> Result<bool> {
    let log = fs::read_to_string(brunnhilde_dir.join("logs").join("viruscheck-log.txt"))?;
    Ok(log.lines().next().is_some_and(|line| line.contains("FOUND")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_quoting() {
        let mut writer = spreadsheet_writer(Vec::new());
        writer
            .write_record(["floppy.dd", "1", "say \"hi\", twice", bool_cell(false), ""])
            .unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "\"floppy.dd\",1,\"say \"\"hi\"\", twice\",\"False\",\"\"\r\n");
    }

    #[test]
    fn test_spreadsheet_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.csv");
        let mut writer = create_spreadsheet(&path, &ANALYSIS_HEADER).unwrap();
        writer.flush().unwrap();
        let out = fs::read_to_string(&path).unwrap();
        assert!(out.starts_with("\"Disk image\",\"Volumes\",\"File systems\""));
        assert!(out.ends_with("\"Content description\"\r\n"));
        assert_eq!(DESCRIPTION_HEADER.len(), 26);
    }

    #[test]
    fn test_multiline_format_name() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("csv_reports");
        fs::create_dir_all(&reports).unwrap();
        fs::write(
            reports.join("formats.csv"),
            "Format,ID,Count\n\"Acme Format\nversion 2\",fmt/1,3\nJPEG,fmt/43,1\n",
        )
        .unwrap();
        assert_eq!(
            read_top_formats(dir.path()),
            vec!["Acme Format\nversion 2", "JPEG"]
        );
    }

    #[test]
    fn test_top_formats() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("csv_reports");
        fs::create_dir_all(&reports).unwrap();
        fs::write(
            reports.join("formats.csv"),
            "Format,ID,Count\n\
             \"Microsoft Word, 97\",fmt/40,3\n\
             ,,2\n\
             Windows Portable Executable,x-fmt/411,1\n\
             Plain Text File,x-fmt/111,1\n\
             JPEG,fmt/43,1\n\
             PNG,fmt/11,1\n",
        )
        .unwrap();

        assert_eq!(
            read_top_formats(dir.path()),
            vec![
                "Microsoft Word, 97",
                "Unidentified",
                "Windows Portable Executable",
                "Plain Text File",
                "JPEG"
            ]
        );
    }

    #[test]
    fn test_missing_formats_report() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_top_formats(dir.path()), vec![MISSING_FORMATS]);
    }

    #[test]
    fn test_virus_log() {
        let dir = tempfile::tempdir().unwrap();
        assert!(virus_found(dir.path()).is_err());

        let logs = dir.path().join("logs");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("viruscheck-log.txt"), "/files/a.exe: Eicar-Signature FOUND\n").unwrap();
        assert!(virus_found(dir.path()).unwrap());

        fs::write(logs.join("viruscheck-log.txt"), "\n/files/a.exe: Eicar FOUND\n").unwrap();
        assert!(!virus_found(dir.path()).unwrap());
    }
}
