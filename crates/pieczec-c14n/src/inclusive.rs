#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0), comments omitted.
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//!
//! Every element in the node set renders the namespace declarations that
//! are in scope and differ from those of its nearest output ancestor. For a
//! document subset this puts all inherited declarations on the apex, which
//! is how `SignedInfo` is canonicalized in place.

use crate::render::{self, Attr, NsDecl};
use pieczec_core::{ns, Error};
use pieczec_xml::{qname, NodeSet};
use std::collections::BTreeMap;

/// Canonicalize a document (or the subset selected by `node_set`).
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext { node_set };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct C14nContext<'a> {
    node_set: Option<&'a NodeSet>,
}

impl C14nContext<'_> {
    fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, inherited_ns);
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, inherited_ns),
            roxmltree::NodeType::Text => {
                if self.is_visible(&node) {
                    render::text(output, node);
                }
            }
            roxmltree::NodeType::PI => {
                if self.is_visible(&node) {
                    render::processing_instruction(output, node);
                }
            }
            roxmltree::NodeType::Comment => {}
        }
    }

    fn process_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            // Descendants compare against the nearest *output* ancestor.
            for child in node.children() {
                self.process_node(child, output, inherited_ns);
            }
            return;
        }

        let in_scope = qname::in_scope_namespaces(node);

        let mut ns_decls: Vec<NsDecl> = in_scope
            .iter()
            .filter(|(prefix, uri)| inherited_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl::new(prefix, uri))
            .collect();
        if !in_scope.contains_key("")
            && inherited_ns.get("").is_some_and(|uri| !uri.is_empty())
        {
            ns_decls.push(NsDecl::new("", ""));
        }
        ns_decls.sort();

        let mut attrs = render::element_attrs(node);
        // The apex of a document subset carries the xml:* attributes it
        // would otherwise inherit from omitted ancestors.
        if self.node_set.is_some() {
            let parent_hidden = node
                .parent()
                .map_or(true, |p| !p.is_element() || !self.is_visible(&p));
            if parent_hidden {
                let inherited = inherited_xml_attrs(node, &attrs);
                attrs.extend(inherited);
            }
        }
        attrs.sort();

        let name = qname::qualified_element_name(node);
        render::start_tag(output, &name, &ns_decls, &attrs);

        for child in node.children() {
            self.process_node(child, output, &in_scope);
        }

        render::end_tag(output, &name);
    }
}

/// `xml:*` attributes of the ancestors, nearest first, minus those the
/// element declares itself.
fn inherited_xml_attrs(node: roxmltree::Node<'_, '_>, existing: &[Attr]) -> Vec<Attr> {
    let mut inherited: BTreeMap<String, String> = BTreeMap::new();
    for ancestor in node.ancestors().skip(1).filter(|n| n.is_element()) {
        for attr in ancestor.attributes() {
            if attr.namespace() == Some(ns::XML) {
                inherited
                    .entry(attr.name().to_owned())
                    .or_insert_with(|| attr.value().to_owned());
            }
        }
    }

    inherited
        .into_iter()
        .filter(|(name, _)| {
            !existing
                .iter()
                .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
        })
        .map(|(name, value)| Attr {
            ns_uri: ns::XML.to_owned(),
            qualified_name: format!("xml:{name}"),
            local_name: name,
            value,
        })
        .collect()
}
