//! Error types for the disk image toolkit.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting disk images.
#[derive(Error, Debug)]
pub enum Error {
    /// XML parsing error
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    /// XML attribute parsing error
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// The document ended early or never opened a root element
    #[error("Malformed DFXML document: {0}")]
    MalformedDocument(String),

    /// Invalid timestamp format
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Integer parsing error
    #[error("Integer parsing error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// An external tool could not be started
    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        /// Program that was invoked
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Subprocess {
        /// Program that was invoked
        program: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// A metadata document could not be read
    #[error("Unable to read DFXML document {path}: {source}")]
    MetadataRead {
        /// Path of the document
        path: PathBuf,
        /// What went wrong while reading it
        #[source]
        source: Box<Error>,
    },

    /// disktype produced no output for an image
    #[error("No disktype output for {0}")]
    NoDisktypeOutput(PathBuf),

    /// fiwalk failed earlier for this image and is not rerun
    #[error("No disk-level DFXML for {0}: fiwalk failed earlier")]
    MetadataUnavailable(PathBuf),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Spreadsheet could not be read or written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Wrap an error raised while reading the DFXML document at `path`.
    pub fn metadata_read(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::MetadataRead {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;
