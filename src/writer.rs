//! DFXML writer for serializing objects to XML.
//!
//! # Example
//!
//! ```rust
//! use diskimage_toolkit::objects::{DFXMLObject, FileObject, HashType};
//! use diskimage_toolkit::writer::DFXMLWriter;
//!
//! let mut doc = DFXMLObject::new();
//! doc.program = Some("Disk Image Toolkit".to_string());
//! doc.program_version = Some("0.1.0".to_string());
//!
//! let mut file = FileObject::with_filename("test.txt");
//! file.filesize = Some(1024);
//! file.hashes.set(HashType::Md5, "d41d8cd98f00b204e9800998ecf8427e");
//! doc.append_file(file);
//!
//! let xml = DFXMLWriter::new().write_to_string(&doc).unwrap();
//! assert!(xml.contains("<filename>test.txt</filename>"));
//! ```

use crate::error::{Error, Result};
use crate::objects::{
    DFXMLObject, FileObject, Hashes, LibraryObject, Timestamp, TimestampName, XMLNS_DC,
    XMLNS_DFXML,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Indentation width of written documents
const INDENT_WIDTH: usize = 2;

/// DFXML XML writer. Output is indented and carries an XML declaration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DFXMLWriter;

impl DFXMLWriter {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self
    }

    /// Writes a DFXMLObject to a string.
    pub fn write_to_string(&self, doc: &DFXMLObject) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(doc, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Utf8(e.utf8_error()))
    }

    /// Writes a DFXMLObject to any Write implementation.
    pub fn write<W: Write>(&self, doc: &DFXMLObject, writer: W) -> Result<()> {
        let mut xml_writer = Writer::new_with_indent(writer, b' ', INDENT_WIDTH);

        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        xml_writer.get_mut().write_all(b"\n")?;

        let mut root = BytesStart::new("dfxml");
        root.push_attribute(("version", doc.version.as_str()));
        root.push_attribute(("xmlns", XMLNS_DFXML));
        root.push_attribute(("xmlns:dc", XMLNS_DC));
        xml_writer.write_event(Event::Start(root))?;

        if !doc.dc.is_empty() {
            xml_writer.write_event(Event::Start(BytesStart::new("metadata")))?;
            for (name, value) in &doc.dc {
                self.write_simple_element(&mut xml_writer, &format!("dc:{}", name), value)?;
            }
            xml_writer.write_event(Event::End(BytesEnd::new("metadata")))?;
        }

        self.write_creator(&mut xml_writer, doc)?;

        if !doc.sources.is_empty() {
            xml_writer.write_event(Event::Start(BytesStart::new("source")))?;
            for source in &doc.sources {
                self.write_simple_element(&mut xml_writer, "image_filename", source)?;
            }
            xml_writer.write_event(Event::End(BytesEnd::new("source")))?;
        }

        for file in doc.iter_files() {
            self.write_file(&mut xml_writer, file)?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new("dfxml")))?;
        xml_writer.get_mut().flush()?;

        Ok(())
    }

    fn write_creator<W: Write>(&self, writer: &mut Writer<W>, doc: &DFXMLObject) -> Result<()> {
        if doc.program.is_none()
            && doc.program_version.is_none()
            && doc.command_line.is_none()
            && doc.creator_libraries().next().is_none()
        {
            return Ok(());
        }

        writer.write_event(Event::Start(BytesStart::new("creator")))?;

        if let Some(ref program) = doc.program {
            self.write_simple_element(writer, "program", program)?;
        }
        if let Some(ref version) = doc.program_version {
            self.write_simple_element(writer, "version", version)?;
        }
        for lib in doc.creator_libraries() {
            self.write_library(writer, lib)?;
        }
        if let Some(ref cmd) = doc.command_line {
            writer.write_event(Event::Start(BytesStart::new("execution_environment")))?;
            self.write_simple_element(writer, "command_line", cmd)?;
            writer.write_event(Event::End(BytesEnd::new("execution_environment")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("creator")))?;
        Ok(())
    }

    fn write_library<W: Write>(&self, writer: &mut Writer<W>, lib: &LibraryObject) -> Result<()> {
        let mut elem = BytesStart::new("library");
        if let Some(ref name) = lib.name {
            elem.push_attribute(("name", name.as_str()));
        }
        if let Some(ref version) = lib.version {
            elem.push_attribute(("version", version.as_str()));
        }
        writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn write_file<W: Write>(&self, writer: &mut Writer<W>, file: &FileObject) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("fileobject")))?;

        if let Some(ref filename) = file.filename {
            self.write_simple_element(writer, "filename", filename)?;
        }
        if let Some(ref error) = file.error {
            self.write_simple_element(writer, "error", error)?;
        }
        self.write_number(writer, "partition", file.partition)?;
        self.write_number(writer, "id", file.id)?;
        if let Some(name_type) = file.name_type {
            self.write_simple_element(writer, "name_type", name_type.as_str())?;
        }
        self.write_number(writer, "filesize", file.filesize)?;

        if file.alloc_inode.is_none() && file.alloc_name.is_none() {
            self.write_flag(writer, "alloc", file.alloc)?;
        } else {
            self.write_flag(writer, "alloc_inode", file.alloc_inode)?;
            self.write_flag(writer, "alloc_name", file.alloc_name)?;
        }
        self.write_flag(writer, "unalloc", file.unalloc)?;
        self.write_flag(writer, "used", file.used)?;
        self.write_flag(writer, "orphan", file.orphan)?;
        self.write_flag(writer, "compressed", file.compressed)?;

        self.write_number(writer, "inode", file.inode)?;
        self.write_number(writer, "meta_type", file.meta_type)?;
        self.write_number(writer, "mode", file.mode)?;
        self.write_number(writer, "nlink", file.nlink)?;
        self.write_number(writer, "uid", file.uid)?;
        self.write_number(writer, "gid", file.gid)?;

        for name in TimestampName::ALL {
            if let Some(ts) = file.get_timestamp(name) {
                self.write_timestamp(writer, name, ts)?;
            }
        }

        if let Some(ref link_target) = file.link_target {
            self.write_simple_element(writer, "link_target", link_target)?;
        }
        if let Some(ref libmagic) = file.libmagic {
            self.write_simple_element(writer, "libmagic", libmagic)?;
        }

        self.write_hashes(writer, &file.hashes)?;

        writer.write_event(Event::End(BytesEnd::new("fileobject")))?;
        Ok(())
    }

    fn write_timestamp<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: TimestampName,
        ts: &Timestamp,
    ) -> Result<()> {
        if ts.text.is_empty() {
            return Ok(());
        }
        self.write_simple_element(writer, name.as_str(), &ts.text)
    }

    fn write_hashes<W: Write>(&self, writer: &mut Writer<W>, hashes: &Hashes) -> Result<()> {
        for (hash_type, value) in hashes.iter() {
            let mut elem = BytesStart::new("hashdigest");
            elem.push_attribute(("type", hash_type.as_str()));
            writer.write_event(Event::Start(elem))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("hashdigest")))?;
        }
        Ok(())
    }

    fn write_flag<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: Option<bool>,
    ) -> Result<()> {
        match value {
            Some(flag) => self.write_simple_element(writer, name, if flag { "1" } else { "0" }),
            None => Ok(()),
        }
    }

    fn write_number<W: Write, N: ToString>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: Option<N>,
    ) -> Result<()> {
        match value {
            Some(n) => self.write_simple_element(writer, name, &n.to_string()),
            None => Ok(()),
        }
    }

    fn write_simple_element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        text: &str,
    ) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

/// Serializes a document to an indented string.
pub fn to_string(doc: &DFXMLObject) -> Result<String> {
    DFXMLWriter::new().write_to_string(doc)
}

/// Writes a document to `path`, replacing any existing file.
pub fn write_to_path(doc: &DFXMLObject, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    DFXMLWriter::new().write(doc, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{HashType, NameType};
    use crate::reader::parse;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    #[test]
    fn test_write_header() {
        let mut doc = DFXMLObject::new();
        doc.program = Some("Disk Image Toolkit".to_string());
        doc.program_version = Some("0.1.0".to_string());
        doc.dc.insert("type".to_string(), "File system walk".to_string());
        doc.add_creator_library(LibraryObject::new("walkdir", "2"));

        let xml = to_string(&doc).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<dfxml version=\"1.1.1\""));
        assert!(xml.contains("<dc:type>File system walk</dc:type>"));
        assert!(xml.contains("<program>Disk Image Toolkit</program>"));
        assert!(xml.contains("<library name=\"walkdir\" version=\"2\"/>"));
    }

    #[test]
    fn test_write_escapes_text() {
        let mut doc = DFXMLObject::new();
        doc.append_file(FileObject::with_filename("a & b <c>.txt"));
        let xml = DFXMLWriter::new().write_to_string(&doc).unwrap();
        assert!(xml.contains("<filename>a &amp; b &lt;c&gt;.txt</filename>"));
        assert!(xml.contains("\n  <fileobject>"));
    }

    #[test]
    fn test_file_fields_survive_reparse() {
        let mut file = FileObject::with_filename("Docs/readme.txt");
        file.name_type = Some(NameType::Regular);
        file.filesize = Some(42);
        file.alloc = Some(true);
        file.mode = Some(0o100644);
        file.mtime = Some(Timestamp::from_datetime(
            Utc.with_ymd_and_hms(2011, 3, 4, 5, 6, 7).unwrap(),
        ));
        file.hashes.set(HashType::Sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");

        let mut doc = DFXMLObject::new();
        doc.append_file(file.clone());
        let xml = to_string(&doc).unwrap();

        let parsed = parse(Cursor::new(xml)).unwrap();
        let back = parsed.iter_files().next().unwrap();
        assert_eq!(back, &file);
    }
}
