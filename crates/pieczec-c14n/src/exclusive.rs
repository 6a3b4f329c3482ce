#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N), comments omitted.
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//!
//! Only "visibly utilized" namespace declarations are output. A namespace
//! is visibly utilized by an element if its prefix is used by the element's
//! tag name or by one of its attributes. A declaration is skipped when the
//! nearest output ancestor already rendered the same binding.

use crate::render::{self, NsDecl};
use pieczec_core::Error;
use pieczec_xml::{qname, NodeSet};
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize a document (or the subset selected by `node_set`).
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = ExcC14nContext { node_set };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct ExcC14nContext<'a> {
    node_set: Option<&'a NodeSet>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns);
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, rendered_ns),
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
        rendered_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            // Namespace declarations are only rendered on output elements.
            for child in node.children() {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }

        let mut attrs = render::element_attrs(node);
        attrs.sort();

        // Prefix of the tag name ("" when unprefixed) plus attribute prefixes.
        let mut utilized: BTreeSet<String> = BTreeSet::new();
        utilized.insert(qname::element_prefix(node).unwrap_or_default());
        for attr in &attrs {
            if let Some((prefix, _)) = attr.qualified_name.split_once(':') {
                utilized.insert(prefix.to_owned());
            }
        }
        utilized.remove("xml");

        let in_scope = qname::in_scope_namespaces(node);
        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            match in_scope.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl::new(prefix, uri));
                    }
                }
                None if prefix.is_empty() => {
                    // An output ancestor rendered a default namespace that
                    // no longer applies.
                    if rendered_ns.get("").is_some_and(|uri| !uri.is_empty()) {
                        ns_decls.push(NsDecl::new("", ""));
                    }
                }
                None => {
                    tracing::warn!(prefix = %prefix, "prefix used without an in-scope declaration");
                }
            }
        }
        ns_decls.sort();

        let name = qname::qualified_element_name(node);
        render::start_tag(output, &name, &ns_decls, &attrs);

        let mut child_rendered_ns = rendered_ns.clone();
        for decl in &ns_decls {
            child_rendered_ns.insert(decl.prefix.clone(), decl.uri.clone());
        }
        for child in node.children() {
            self.process_node(child, output, &child_rendered_ns);
        }

        render::end_tag(output, &name);
    }
}
