//! DFXMLObject - the root document container for DFXML.
//!
//! Holds the creator block, Dublin Core metadata, source image names and the
//! flat list of file objects the toolkit reads and writes.

use crate::objects::common::DFXML_VERSION;
use crate::objects::fileobject::FileObject;
use std::collections::BTreeMap;

/// A library linked into the program that produced a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryObject {
    /// Library name
    pub name: Option<String>,
    /// Library version
    pub version: Option<String>,
}

impl LibraryObject {
    /// Creates a new LibraryObject with name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            version: Some(version.into()),
        }
    }
}

/// The root DFXML document object.
#[derive(Debug, Clone, Default)]
pub struct DFXMLObject {
    /// DFXML schema version
    pub version: String,
    /// Program that created this DFXML
    pub program: Option<String>,
    /// Version of the creating program
    pub program_version: Option<String>,
    /// Command line used to create this DFXML
    pub command_line: Option<String>,
    /// Source image filenames
    pub sources: Vec<String>,
    /// Dublin Core metadata, keyed by element name without the `dc:` prefix
    pub dc: BTreeMap<String, String>,

    creator_libraries: Vec<LibraryObject>,
    files: Vec<FileObject>,
}

impl DFXMLObject {
    /// Creates a document declaring the current schema version.
    pub fn new() -> Self {
        Self {
            version: DFXML_VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Adds a creator library.
    pub fn add_creator_library(&mut self, library: LibraryObject) {
        self.creator_libraries.push(library);
    }

    /// Returns an iterator over creator libraries.
    pub fn creator_libraries(&self) -> impl Iterator<Item = &LibraryObject> {
        self.creator_libraries.iter()
    }

    /// Appends a file to the document.
    pub fn append_file(&mut self, file: FileObject) {
        self.files.push(file);
    }

    /// Iterates over the document's files in document order.
    pub fn iter_files(&self) -> impl Iterator<Item = &FileObject> {
        self.files.iter()
    }

    /// Number of file objects in the document.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
