#![forbid(unsafe_code)]

//! XML document abstraction for Pieczec.
//!
//! Provides a thin layer over `roxmltree` for reading, `NodeSet` operations
//! for canonicalization, source-level qualified name recovery, and a
//! `quick-xml` backed writer for building the signature markup.

pub mod document;
pub mod nodeset;
pub mod qname;
pub mod writer;

pub use document::{Envelope, XmlDocument};
pub use nodeset::NodeSet;
pub use writer::XmlWriter;

use pieczec_core::Error;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree only expands internal entities and never fetches external
/// ones, so an internal subset is safe to accept.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse XML text into a `roxmltree::Document`.
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| Error::MalformedInputXml(e.to_string()))
}
