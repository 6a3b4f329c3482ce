#![forbid(unsafe_code)]

//! XML document wrapper over roxmltree with ID lookup and the insertion
//! point used for enveloped signatures.

use crate::qname;
use pieczec_core::{ns, Error};
use std::collections::HashSet;

/// An owned XML document. Stores the text; the tree is re-parsed on demand.
///
/// To work with the parsed tree, call [`XmlDocument::parse_doc`] which
/// returns a temporary `roxmltree::Document` borrowing from the text.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    text: String,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self, Error> {
        crate::parse(&text)?;
        Ok(Self { text })
    }

    /// Parse the document and return a temporary `roxmltree::Document`.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        crate::parse(&self.text)
    }

    /// Collect every `Id`, `ID` and `id` attribute value in the document.
    pub fn id_values(doc: &roxmltree::Document<'_>) -> HashSet<String> {
        let mut ids = HashSet::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            for attr in node.attributes() {
                if attr.namespace().is_none() && matches!(attr.name(), "Id" | "ID" | "id") {
                    ids.insert(attr.value().to_owned());
                }
            }
        }
        ids
    }

    /// Find the element carrying `Id="<id>"`.
    pub fn find_by_id<'a, 'input>(
        doc: &'a roxmltree::Document<'input>,
        id: &str,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        doc.descendants()
            .find(|n| n.is_element() && n.attribute(ns::attr::ID) == Some(id))
    }

    /// Compute where a new last child of the document element goes.
    pub fn envelope(&self) -> Result<Envelope, Error> {
        let doc = self.parse_doc()?;
        let root = doc.root_element();
        let range = root.range();
        let tag = qname::start_tag(root).ok_or_else(|| {
            Error::XmlStructure("document element start tag is not in the source text".into())
        })?;

        if tag.self_closing {
            // `<root a="1"/>` becomes `<root a="1">` + child + `</root>`.
            let tag_end = range.start + tag.len;
            let head = &self.text[..tag_end - 2];
            let head = head.trim_end_matches([' ', '\t', '\r', '\n']);
            return Ok(Envelope {
                head: format!("{head}>"),
                tail: format!("</{}>{}", tag.name, &self.text[tag_end..]),
            });
        }

        let end_tag_start = self.text[..range.end]
            .rfind("</")
            .filter(|&pos| pos >= range.start + tag.len)
            .ok_or_else(|| Error::XmlStructure("document element end tag not found".into()))?;
        Ok(Envelope {
            head: self.text[..end_tag_start].to_owned(),
            tail: self.text[end_tag_start..].to_owned(),
        })
    }
}

/// The input document split at the position of a new last child of the
/// document element. Everything outside the inserted fragment is kept
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    head: String,
    tail: String,
}

impl Envelope {
    /// Build the full document text with `fragment` inserted.
    pub fn wrap(&self, fragment: &str) -> String {
        let mut out = String::with_capacity(self.head.len() + fragment.len() + self.tail.len());
        out.push_str(&self.head);
        out.push_str(fragment);
        out.push_str(&self.tail);
        out
    }
}
