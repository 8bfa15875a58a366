//! DFXML streaming reader.
//!
//! Parses documents written by fiwalk or by the directory walk in
//! [`crate::walk`] and yields file objects as their closing tags are seen.
//! Only direct children of `<fileobject>` populate a record, so byte runs,
//! nested volume properties and other extensions are skipped without
//! being modelled.
//!
//! # Example
//!
//! ```rust,no_run
//! use diskimage_toolkit::reader::{DFXMLReader, Event};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = File::open("dfxml.xml").unwrap();
//! for result in DFXMLReader::from_reader(BufReader::new(file)) {
//!     match result {
//!         Ok(Event::FileObject(file)) => println!("File: {:?}", file.filename),
//!         Ok(_) => {}
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```

use crate::error::{Error, Result};
use crate::objects::{DFXMLObject, FileObject, HashType, LibraryObject, Timestamp, TimestampName};
use quick_xml::events::BytesStart;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

/// Events emitted by the DFXML reader.
#[derive(Debug)]
pub enum Event {
    /// The `<dfxml>` root was opened; only the version is known at this point
    DFXMLStart(DFXMLObject),
    /// The root was closed; carries the document-level metadata (no files)
    DFXMLEnd(DFXMLObject),
    /// A complete file object
    FileObject(Box<FileObject>),
}

/// Element path and the text/attributes of the innermost element.
#[derive(Debug, Default)]
struct ElementContext {
    path: Vec<String>,
    text: String,
    attrs: Vec<(String, String)>,
}

impl ElementContext {
    fn push(&mut self, name: String, attrs: Vec<(String, String)>) {
        self.path.push(name);
        self.text.clear();
        self.attrs = attrs;
    }

    fn pop(&mut self) -> Option<String> {
        self.text.clear();
        self.attrs.clear();
        self.path.pop()
    }

    fn depth(&self) -> usize {
        self.path.len()
    }

    fn within(&self, local_name: &str) -> bool {
        self.path.iter().any(|p| local_part(p) == local_name)
    }
}

/// Owned copy of a quick-xml event, so the read buffer can be reused.
enum ParsedEvent {
    Start { name: String, attrs: Vec<(String, String)> },
    End { name: String },
    Empty { name: String, attrs: Vec<(String, String)> },
    Text { text: String },
    Eof,
}

/// A streaming DFXML parser over any `BufRead` source.
pub struct DFXMLReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    context: ElementContext,
    document: Option<DFXMLObject>,
    /// File being built, with the element depth of its `<fileobject>`
    file: Option<(usize, FileObject)>,
    seen_root: bool,
    done: bool,
}

impl<R: BufRead> DFXMLReader<R> {
    /// Creates a new DFXML reader from a buffered reader.
    pub fn from_reader(reader: R) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);

        Self {
            reader: xml_reader,
            buf: Vec::with_capacity(4096),
            context: ElementContext::default(),
            document: None,
            file: None,
            seen_root: false,
            done: false,
        }
    }

    fn parse_next(&mut self) -> Result<Option<Event>> {
        loop {
            self.buf.clear();

            let parsed = match self.reader.read_event_into(&mut self.buf)? {
                XmlEvent::Start(ref e) => Some(ParsedEvent::Start {
                    name: qualified_name(e)?,
                    attrs: extract_attrs(e)?,
                }),
                XmlEvent::End(ref e) => Some(ParsedEvent::End {
                    name: str::from_utf8(e.name().as_ref())?.to_string(),
                }),
                XmlEvent::Empty(ref e) => Some(ParsedEvent::Empty {
                    name: qualified_name(e)?,
                    attrs: extract_attrs(e)?,
                }),
                XmlEvent::Text(ref e) => Some(ParsedEvent::Text {
                    text: e.unescape()?.to_string(),
                }),
                XmlEvent::CData(ref e) => Some(ParsedEvent::Text {
                    text: str::from_utf8(e.as_ref())?.to_string(),
                }),
                XmlEvent::Eof => Some(ParsedEvent::Eof),
                _ => None,
            };

            match parsed {
                Some(ParsedEvent::Start { name, attrs }) => {
                    if let Some(ev) = self.handle_start(name, attrs)? {
                        return Ok(Some(ev));
                    }
                }
                Some(ParsedEvent::End { name }) => {
                    if let Some(ev) = self.handle_end(&name)? {
                        return Ok(Some(ev));
                    }
                }
                Some(ParsedEvent::Empty { name, attrs }) => {
                    self.handle_start(name.clone(), attrs)?;
                    if let Some(ev) = self.handle_end(&name)? {
                        return Ok(Some(ev));
                    }
                }
                Some(ParsedEvent::Text { text }) => {
                    if !self.seen_root {
                        return Err(Error::MalformedDocument(
                            "text before the root element".to_string(),
                        ));
                    }
                    self.context.text.push_str(&text);
                }
                Some(ParsedEvent::Eof) => {
                    self.done = true;
                    if !self.seen_root {
                        return Err(Error::MalformedDocument(
                            "no <dfxml> root element".to_string(),
                        ));
                    }
                    if let Some(open) = self.context.path.last() {
                        return Err(Error::MalformedDocument(format!(
                            "document ends inside <{}>",
                            open
                        )));
                    }
                    return Ok(None);
                }
                None => {}
            }
        }
    }

    fn handle_start(&mut self, name: String, attrs: Vec<(String, String)>) -> Result<Option<Event>> {
        let local = local_part(&name).to_string();
        self.context.push(name, attrs);

        if !self.seen_root {
            if local != "dfxml" {
                return Err(Error::MalformedDocument(format!(
                    "expected <dfxml> root, found <{}>",
                    local
                )));
            }
            self.seen_root = true;
            let mut doc = DFXMLObject::new();
            if let Some(version) = attr(&self.context.attrs, "version") {
                doc.version = version.to_string();
            }
            self.document = Some(doc.clone());
            return Ok(Some(Event::DFXMLStart(doc)));
        }

        match local.as_str() {
            "fileobject" if self.file.is_none() => {
                self.file = Some((self.context.depth(), FileObject::default()));
            }
            "library" if self.context.within("creator") => {
                let library = LibraryObject {
                    name: attr(&self.context.attrs, "name").map(str::to_string),
                    version: attr(&self.context.attrs, "version").map(str::to_string),
                };
                if let Some(doc) = self.document.as_mut() {
                    doc.add_creator_library(library);
                }
            }
            _ => {}
        }

        Ok(None)
    }

    fn handle_end(&mut self, name: &str) -> Result<Option<Event>> {
        let depth = self.context.depth();
        let text = self.context.text.trim().to_string();
        let attrs = std::mem::take(&mut self.context.attrs);
        self.context.pop();
        let local = local_part(name);

        if let Some(file_depth) = self.file.as_ref().map(|(d, _)| *d) {
            if depth == file_depth && local == "fileobject" {
                if let Some((_, file)) = self.file.take() {
                    return Ok(Some(Event::FileObject(Box::new(file))));
                }
            }
            if depth == file_depth + 1 {
                if let Some((_, file)) = self.file.as_mut() {
                    apply_file_field(file, local, text, &attrs)?;
                }
            }
            return Ok(None);
        }

        if depth == 1 && local == "dfxml" {
            self.done = true;
            let completed = self.document.take().unwrap_or_else(DFXMLObject::new);
            return Ok(Some(Event::DFXMLEnd(completed)));
        }

        if let Some(doc) = self.document.as_mut() {
            if let Some(dc_name) = name.strip_prefix("dc:") {
                doc.dc.insert(dc_name.to_string(), text);
            } else if self.context.within("creator") {
                match local {
                    "program" => doc.program = Some(text),
                    "version" => doc.program_version = Some(text),
                    "command_line" => doc.command_line = Some(text),
                    _ => {}
                }
            } else if local == "image_filename" {
                doc.sources.push(text);
            }
        }

        Ok(None)
    }
}

impl<R: BufRead> Iterator for DFXMLReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.parse_next() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Copies one `<fileobject>` child element into the record.
fn apply_file_field(
    file: &mut FileObject,
    name: &str,
    text: String,
    attrs: &[(String, String)],
) -> Result<()> {
    match name {
        "filename" => file.filename = Some(text),
        "id" => file.id = text.parse().ok(),
        "partition" => file.partition = text.parse().ok(),
        "inode" => file.inode = text.parse().ok(),
        "name_type" => file.name_type = Some(text.parse()?),
        "meta_type" => file.meta_type = text.parse().ok(),
        "filesize" => file.filesize = text.parse().ok(),
        "alloc" => file.alloc = parse_bool(&text),
        "alloc_inode" => file.alloc_inode = parse_bool(&text),
        "alloc_name" => file.alloc_name = parse_bool(&text),
        "unalloc" => file.unalloc = parse_bool(&text),
        "used" => file.used = parse_bool(&text),
        "orphan" => file.orphan = parse_bool(&text),
        "compressed" => file.compressed = parse_bool(&text),
        "mode" => file.mode = text.parse().ok(),
        "nlink" => file.nlink = text.parse().ok(),
        "uid" => file.uid = text.parse().ok(),
        "gid" => file.gid = text.parse().ok(),
        "link_target" => file.link_target = Some(text),
        "libmagic" => file.libmagic = Some(text),
        "error" => file.error = Some(text),
        "hashdigest" => {
            if let Some(hash_type) = attr(attrs, "type").and_then(|t| t.parse::<HashType>().ok()) {
                file.hashes.set(hash_type, &text);
            }
        }
        "mtime" | "atime" | "ctime" | "crtime" | "dtime" | "bkup_time" => {
            if !text.is_empty() {
                let ts_name: TimestampName = name.parse()?;
                file.set_timestamp(ts_name, Timestamp::from_text(text));
            }
        }
        _ => {}
    }
    Ok(())
}

fn qualified_name(e: &BytesStart<'_>) -> Result<String> {
    Ok(str::from_utf8(e.name().as_ref())?.to_string())
}

fn extract_attrs(e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.unescape_value()?.to_string();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Parses a boolean value from a string.
///
/// Accepts "1", "0", "true", "false" (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Collects all file objects from a DFXML stream.
pub fn parse_file_objects<R: BufRead>(reader: R) -> Result<Vec<FileObject>> {
    let mut files = Vec::new();
    for event in DFXMLReader::from_reader(reader) {
        if let Event::FileObject(file) = event? {
            files.push(*file);
        }
    }
    Ok(files)
}

/// Parses a complete DFXML document, files included.
pub fn parse<R: BufRead>(reader: R) -> Result<DFXMLObject> {
    let mut files = Vec::new();
    let mut document = None;
    for event in DFXMLReader::from_reader(reader) {
        match event? {
            Event::FileObject(file) => files.push(*file),
            Event::DFXMLEnd(doc) => document = Some(doc),
            Event::DFXMLStart(_) => {}
        }
    }
    let mut document = document.ok_or_else(|| {
        Error::MalformedDocument("missing closing </dfxml>".to_string())
    })?;
    for file in files {
        document.append_file(file);
    }
    Ok(document)
}

/// Opens the DFXML document at `path` for streaming.
///
/// Open and parse failures are reported as [`Error::MetadataRead`] by the
/// callers that consume the stream; this only opens the file.
pub fn open(path: &Path) -> Result<DFXMLReader<BufReader<File>>> {
    let file = File::open(path).map_err(|e| Error::metadata_read(path, e.into()))?;
    Ok(DFXMLReader::from_reader(BufReader::new(file)))
}

/// Visits every file object of the document at `path`.
///
/// Any I/O or XML failure is wrapped in [`Error::MetadataRead`].
pub fn for_each_file_object<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(FileObject),
{
    for event in open(path)? {
        match event {
            Ok(Event::FileObject(file)) => visit(*file),
            Ok(_) => {}
            Err(e) => return Err(Error::metadata_read(path, e)),
        }
    }
    Ok(())
}
