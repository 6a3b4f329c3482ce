#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for Pieczec.
//!
//! Implements the two W3C variants an XAdES-BES signature needs, both
//! without comments:
//! - Canonical XML 1.0 (inclusive), used for `SignedInfo`
//! - Exclusive Canonical XML 1.0, used for the signed document and for
//!   `SignedProperties`

pub mod escape;
pub mod exclusive;
pub mod inclusive;
pub mod render;

use pieczec_core::{algorithm, Error};
use pieczec_xml::NodeSet;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Exclusive Canonical XML 1.0
    Exclusive,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::Exclusive => algorithm::EXC_C14N,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            _ => None,
        }
    }
}

/// Canonicalize a whole XML document given as text.
///
/// Malformed input fails with [`Error::MalformedInputXml`] before any output
/// is produced.
pub fn canonicalize(xml: &str, mode: C14nMode) -> Result<Vec<u8>, Error> {
    let doc = pieczec_xml::parse(xml)?;
    canonicalize_doc(&doc, mode, None)
}

/// Canonicalize a pre-parsed document, optionally restricted to a node set.
///
/// `None` renders every node except comments.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let out = match mode {
        C14nMode::Inclusive => inclusive::canonicalize(doc, node_set)?,
        C14nMode::Exclusive => exclusive::canonicalize(doc, node_set)?,
    };
    tracing::trace!(mode = ?mode, bytes = out.len(), "canonicalized");
    Ok(out)
}

/// Canonicalize the subtree rooted at `apex` in the context of its document.
pub fn canonicalize_subtree(
    apex: roxmltree::Node<'_, '_>,
    mode: C14nMode,
) -> Result<Vec<u8>, Error> {
    if !apex.is_element() {
        return Err(Error::CanonicalizationFailure(
            "subtree apex must be an element".into(),
        ));
    }
    let set = NodeSet::tree_without_comments(apex);
    canonicalize_doc(apex.document(), mode, Some(&set))
}
