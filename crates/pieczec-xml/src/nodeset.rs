#![forbid(unsafe_code)]

//! NodeSet type for XML canonicalization.
//!
//! A `NodeSet` is the set of document nodes a canonicalization pass should
//! render, identified by their `roxmltree::NodeId`. Nodes outside the set
//! are skipped while their children are still visited.

use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<roxmltree::NodeId>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node of the document except comments.
    /// A same-document `URI=""` reference selects exactly this set.
    pub fn all_without_comments(doc: &roxmltree::Document<'_>) -> Self {
        Self::tree_without_comments(doc.root())
    }

    /// The subtree rooted at `root`, comments excluded.
    pub fn tree_without_comments(root: roxmltree::Node<'_, '_>) -> Self {
        let nodes = root
            .descendants()
            .filter(|n| !n.is_comment())
            .map(|n| n.id())
            .collect();
        Self { nodes }
    }

    /// Remove `root` and all of its descendants.
    pub fn remove_subtree(&mut self, root: roxmltree::Node<'_, '_>) {
        for node in root.descendants() {
            self.nodes.remove(&node.id());
        }
    }

    /// Check if a node is in this set.
    pub fn contains(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_without_comments() {
        let doc = crate::parse("<r><!--c--><a>t</a></r>").unwrap();
        let set = NodeSet::all_without_comments(&doc);
        // document root, r, a, text
        assert_eq!(set.len(), 4);
        assert!(doc.descendants().filter(|n| n.is_comment()).all(|n| !set.contains(&n)));
    }

    #[test]
    fn test_remove_subtree() {
        let doc = crate::parse("<r><a><b/>x</a><c/></r>").unwrap();
        let mut set = NodeSet::all_without_comments(&doc);
        let a = doc.descendants().find(|n| n.has_tag_name("a")).unwrap();
        set.remove_subtree(a);
        assert!(!set.contains(&a));
        assert!(a.descendants().all(|n| !set.contains(&n)));
        let c = doc.descendants().find(|n| n.has_tag_name("c")).unwrap();
        assert!(set.contains(&c));
        assert!(set.contains(&doc.root_element()));
    }
}
