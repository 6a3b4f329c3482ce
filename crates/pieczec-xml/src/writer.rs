#![forbid(unsafe_code)]

//! XML writing utilities using quick-xml's `Writer` for markup building.

use pieczec_core::Error;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// A simple XML writer wrapping `quick_xml::Writer`.
///
/// Output is compact: no indentation and no whitespace text nodes.
pub struct XmlWriter {
    writer: quick_xml::Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Create a new XML writer.
    pub fn new() -> Self {
        Self {
            writer: quick_xml::Writer::new(Vec::new()),
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), Error> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlStructure(format!("failed to write XML: {e}")))
    }

    fn start(name: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
        let mut start = BytesStart::new(name.to_owned());
        for (key, value) in attrs {
            start.push_attribute((*key, *value));
        }
        start
    }

    /// Write `<?xml version="1.0" encoding="UTF-8"?>` followed by a newline.
    pub fn declaration(&mut self) -> Result<(), Error> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write(Event::Text(BytesText::new("\n")))
    }

    /// Start an element with the given name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        self.write(Event::Start(Self::start(name, attrs)))
    }

    /// Write an empty element (self-closing).
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), Error> {
        self.write(Event::Empty(Self::start(name, attrs)))
    }

    /// End the current element.
    pub fn end_element(&mut self, name: &str) -> Result<(), Error> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Write escaped text content.
    pub fn write_text(&mut self, text: &str) -> Result<(), Error> {
        self.write(Event::Text(BytesText::new(text)))
    }

    /// Write `<name attrs>text</name>`; an empty `text` still yields a start/end pair.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), Error> {
        self.start_element(name, attrs)?;
        if !text.is_empty() {
            self.write_text(text)?;
        }
        self.end_element(name)
    }

    /// Finish writing and return the XML as a string.
    pub fn into_string(self) -> Result<String, Error> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| Error::XmlStructure(format!("writer produced invalid UTF-8: {e}")))
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}
