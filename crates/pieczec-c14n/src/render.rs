#![forbid(unsafe_code)]

//! Shared rendering utilities for C14N output.

use crate::escape;
use pieczec_xml::qname;
use std::cmp::Ordering;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI ("" undeclares the default namespace).
    pub uri: String,
}

impl NsDecl {
    pub fn new(prefix: &str, uri: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
    }

    /// Append ` xmlns[:prefix]="uri"` to `out`.
    pub fn render(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b" xmlns");
        if !self.prefix.is_empty() {
            out.push(b':');
            out.extend_from_slice(self.prefix.as_bytes());
        }
        out.extend_from_slice(b"=\"");
        escape::attr(out, &self.uri);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        // Default namespace first, then by prefix.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    /// The local name.
    pub local_name: String,
    /// The qualified name (prefix:local or just local).
    pub qualified_name: String,
    /// The attribute value, already normalized by the parser.
    pub value: String,
}

impl Attr {
    /// Append ` name="value"` to `out`.
    pub fn render(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        escape::attr(out, &self.value);
        out.push(b'"');
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        // Unqualified attributes first, ordered by local name; qualified
        // ones after, ordered by (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The element's own attributes with the prefixes written in the source.
pub fn element_attrs(node: roxmltree::Node<'_, '_>) -> Vec<Attr> {
    node.attributes()
        .map(|attr| {
            let qualified_name = match qname::attribute_prefix(node, &attr) {
                Some(prefix) => format!("{}:{}", prefix, attr.name()),
                None => attr.name().to_owned(),
            };
            Attr {
                ns_uri: attr.namespace().unwrap_or("").to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name,
                value: attr.value().to_owned(),
            }
        })
        .collect()
}

/// Write `<name ns-decls attrs>`; both slices must already be sorted.
pub fn start_tag(out: &mut Vec<u8>, name: &str, ns_decls: &[NsDecl], attrs: &[Attr]) {
    out.push(b'<');
    out.extend_from_slice(name.as_bytes());
    for decl in ns_decls {
        decl.render(out);
    }
    for attr in attrs {
        attr.render(out);
    }
    out.push(b'>');
}

pub fn end_tag(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.push(b'>');
}

pub fn text(out: &mut Vec<u8>, node: roxmltree::Node<'_, '_>) {
    escape::text(out, node.text().unwrap_or(""));
}

/// Write a processing instruction. Outside the document element a PI is
/// separated from the element by a line feed on the element's side.
pub fn processing_instruction(out: &mut Vec<u8>, node: roxmltree::Node<'_, '_>) {
    let Some(pi) = node.pi() else {
        return;
    };
    let at_document_level = node.parent().is_some_and(|p| p.is_root());

    if at_document_level && node.prev_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }
    out.extend_from_slice(b"<?");
    out.extend_from_slice(pi.target.as_bytes());
    if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
        out.push(b' ');
        escape::pi(out, value);
    }
    out.extend_from_slice(b"?>");
    if at_document_level && node.next_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ns_decl_order() {
        let mut decls = vec![
            NsDecl::new("xades", "urn:x"),
            NsDecl::new("ds", "urn:d"),
            NsDecl::new("", "urn:default"),
        ];
        decls.sort();
        let prefixes: Vec<_> = decls.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["", "ds", "xades"]);
    }

    #[test]
    fn test_attr_order() {
        let attr = |ns: &str, local: &str| Attr {
            ns_uri: ns.to_owned(),
            local_name: local.to_owned(),
            qualified_name: local.to_owned(),
            value: String::new(),
        };
        let mut attrs = vec![
            attr("urn:b", "a"),
            attr("", "z"),
            attr("urn:a", "z"),
            attr("", "Id"),
        ];
        attrs.sort();
        let order: Vec<_> = attrs
            .iter()
            .map(|a| (a.ns_uri.as_str(), a.local_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("", "Id"), ("", "z"), ("urn:a", "z"), ("urn:b", "a")]
        );
    }

    #[test]
    fn test_render_empty_default() {
        let mut out = Vec::new();
        NsDecl::new("", "").render(&mut out);
        assert_eq!(out, b" xmlns=\"\"");
    }
}
