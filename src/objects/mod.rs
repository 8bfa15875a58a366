//! DFXML object types.
//!
//! - [`DFXMLObject`] - The root document container
//! - [`FileObject`] - A file with metadata and hashes
//!
//! Also provides common types:
//! - [`Timestamp`] - Forensic timestamps
//! - [`Hashes`] - Cryptographic hash values

mod common;
mod dfxml;
mod fileobject;

pub use common::{HashType, Hashes, Timestamp, TimestampName, DFXML_VERSION, XMLNS_DC, XMLNS_DFXML};
pub use dfxml::{DFXMLObject, LibraryObject};
pub use fileobject::{FileObject, NameType};
