#![forbid(unsafe_code)]

//! Recovery of prefixes from source markup.
//!
//! `roxmltree` resolves every name to its namespace URI and drops the
//! prefix the author wrote. Canonical XML must reproduce those prefixes, so
//! this module re-reads an element's start tag from the input text with
//! `quick_xml` and matches the lexical names back to the parsed tree.

use pieczec_core::ns;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

/// An attribute as written in a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    /// Qualified name, e.g. `xml:lang` or `xmlns:ds`.
    pub name: String,
    /// Value between the quotes, not unescaped.
    pub value: String,
}

/// An element start tag as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Qualified element name.
    pub name: String,
    /// Attributes in document order, namespace declarations included.
    pub attributes: Vec<RawAttribute>,
    /// `true` for `<name/>`.
    pub self_closing: bool,
    /// Byte length of the whole tag including `<` and `>`.
    pub len: usize,
}

impl StartTag {
    /// The prefix of the element name, if any.
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// Ordinary attributes (namespace declarations excluded).
    pub fn plain_attributes(&self) -> impl Iterator<Item = &RawAttribute> + '_ {
        self.attributes
            .iter()
            .filter(|a| a.name != "xmlns" && !a.name.starts_with("xmlns:"))
    }
}

/// Split `prefix:local` into its parts.
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_owned)
}

fn to_start_tag(start: &BytesStart<'_>, self_closing: bool, len: usize) -> Option<StartTag> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.ok()?;
        attributes.push(RawAttribute {
            name: utf8(attr.key.as_ref())?,
            value: utf8(&attr.value)?,
        });
    }
    Some(StartTag {
        name: utf8(start.name().as_ref())?,
        attributes,
        self_closing,
        len,
    })
}

/// Read the start tag at the beginning of `input`.
///
/// Returns `None` when `input` does not begin with a well-formed start tag.
pub fn read_start_tag(input: &str) -> Option<StartTag> {
    let mut reader = Reader::from_str(input);
    let event = reader.read_event().ok()?;
    let len = usize::try_from(reader.buffer_position()).ok()?;
    match event {
        Event::Start(start) => to_start_tag(&start, false, len),
        Event::Empty(start) => to_start_tag(&start, true, len),
        _ => None,
    }
}

/// Read the start tag of an element node from its document's input text.
///
/// Returns `None` for non-elements and for elements whose source range does
/// not hold their own start tag (content produced by entity expansion).
pub fn start_tag(node: roxmltree::Node<'_, '_>) -> Option<StartTag> {
    if !node.is_element() {
        return None;
    }
    let text = node.document().input_text();
    let tag = read_start_tag(text.get(node.range().start..)?)?;
    if split_qname(&tag.name).1 != node.tag_name().name() {
        return None;
    }
    Some(tag)
}

/// The prefix the element was written with.
pub fn element_prefix(node: roxmltree::Node<'_, '_>) -> Option<String> {
    if let Some(tag) = start_tag(node) {
        return tag.prefix().map(str::to_owned);
    }
    // Entity-expanded content: choose any prefix bound to the namespace,
    // preferring the default namespace when it matches.
    let uri = node.tag_name().namespace()?;
    if node.lookup_namespace_uri(None) == Some(uri) {
        return None;
    }
    node.lookup_prefix(uri).map(str::to_owned)
}

/// The prefix an attribute was written with, or `None` when unprefixed.
pub fn attribute_prefix(
    node: roxmltree::Node<'_, '_>,
    attr: &roxmltree::Attribute<'_, '_>,
) -> Option<String> {
    let uri = attr.namespace()?;
    if uri == ns::XML {
        return Some("xml".to_owned());
    }
    if let Some(tag) = start_tag(node) {
        for raw in tag.plain_attributes() {
            if let (Some(prefix), local) = split_qname(&raw.name) {
                if local == attr.name() && node.lookup_namespace_uri(Some(prefix)) == Some(uri) {
                    return Some(prefix.to_owned());
                }
            }
        }
    }
    node.lookup_prefix(uri).map(str::to_owned)
}

/// Qualified name of an element as written in the source.
pub fn qualified_element_name(node: roxmltree::Node<'_, '_>) -> String {
    match element_prefix(node) {
        Some(prefix) => format!("{}:{}", prefix, node.tag_name().name()),
        None => node.tag_name().name().to_owned(),
    }
}

/// All namespaces in scope at `node`, as `prefix -> URI`.
///
/// The default namespace uses the empty prefix and is absent when no
/// default applies, including after `xmlns=""`. The `xml` prefix is never
/// included.
pub fn in_scope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|namespace| !namespace.uri().is_empty() && namespace.name() != Some("xml"))
        .map(|namespace| {
            let prefix = namespace.name().unwrap_or("");
            (prefix.to_owned(), namespace.uri().to_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_start_tag() {
        let input = r#"<ds:Ref URI="" a = 'x>y' xmlns:ds="urn:ds">rest"#;
        let tag = read_start_tag(input).unwrap();
        assert_eq!(tag.name, "ds:Ref");
        assert_eq!(tag.prefix(), Some("ds"));
        assert_eq!(tag.attributes.len(), 3);
        assert_eq!(tag.attributes[1].name, "a");
        assert_eq!(tag.attributes[1].value, "x>y");
        assert!(!tag.self_closing);
        assert_eq!(&input[tag.len..], "rest");
        let plain: Vec<_> = tag.plain_attributes().map(|a| a.name.as_str()).collect();
        assert_eq!(plain, vec!["URI", "a"]);
    }

    #[test]
    fn test_read_self_closing() {
        let input = "<root\n  a=\"1\"\t/>tail";
        let tag = read_start_tag(input).unwrap();
        assert!(tag.self_closing);
        assert_eq!(tag.name, "root");
        assert_eq!(&input[tag.len..], "tail");
    }

    #[test]
    fn test_read_rejects_non_tags() {
        assert!(read_start_tag("<!-- c -->").is_none());
        assert!(read_start_tag("</end>").is_none());
        assert!(read_start_tag("text").is_none());
    }

    #[test]
    fn test_prefixes_from_source() {
        let xml = r#"<a:root xmlns:a="urn:x" xmlns:b="urn:x"><b:child b:attr="1" plain="2"/></a:root>"#;
        let doc = crate::parse(xml).unwrap();
        let root = doc.root_element();
        assert_eq!(qualified_element_name(root), "a:root");
        let child = root.first_element_child().unwrap();
        assert_eq!(qualified_element_name(child), "b:child");
        let prefixes: Vec<_> = child
            .attributes()
            .map(|attr| attribute_prefix(child, &attr))
            .collect();
        assert!(prefixes.contains(&Some("b".to_owned())));
        assert!(prefixes.contains(&None));
    }

    #[test]
    fn test_prefixes_for_entity_content() {
        let xml = "<!DOCTYPE r [<!ENTITY e '<p:x p:a=\"1\"/>'>]>\
                   <r xmlns:p=\"urn:p\">&e;</r>";
        let doc = crate::parse(xml).unwrap();
        let x = doc.descendants().find(|n| n.has_tag_name(("urn:p", "x"))).unwrap();
        assert_eq!(qualified_element_name(x), "p:x");
        let attr = x.attributes().next().unwrap();
        assert_eq!(attribute_prefix(x, &attr).as_deref(), Some("p"));
    }

    #[test]
    fn test_in_scope_namespaces_with_undeclared_default() {
        let xml = r#"<root xmlns="urn:d" xmlns:p="urn:p"><inner xmlns=""><leaf/></inner></root>"#;
        let doc = crate::parse(xml).unwrap();
        let root = doc.root_element();
        let at_root = in_scope_namespaces(root);
        assert_eq!(at_root.get(""), Some(&"urn:d".to_owned()));
        assert_eq!(at_root.get("p"), Some(&"urn:p".to_owned()));
        assert!(!at_root.contains_key("xml"));

        let leaf = root.descendants().find(|n| n.has_tag_name("leaf")).unwrap();
        let at_leaf = in_scope_namespaces(leaf);
        assert!(!at_leaf.contains_key(""));
        assert_eq!(at_leaf.get("p"), Some(&"urn:p".to_owned()));
    }

    #[test]
    fn test_in_scope_namespaces_override() {
        let xml = r#"<a xmlns:p="urn:1"><b xmlns:p="urn:2" xmlns:q="urn:q"/><c/></a>"#;
        let doc = crate::parse(xml).unwrap();
        let root = doc.root_element();
        let b = root.first_element_child().unwrap();
        let c = b.next_sibling_element().unwrap();
        assert_eq!(in_scope_namespaces(b).get("p").map(String::as_str), Some("urn:2"));
        assert_eq!(in_scope_namespaces(b).len(), 2);
        assert_eq!(in_scope_namespaces(c).get("p").map(String::as_str), Some("urn:1"));
        assert_eq!(in_scope_namespaces(c).len(), 1);
    }
}
