// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::node::Node;
use crate::priority;

/// A node paired with the object name of the holder it was sourced from.
///
/// The origin is the *immediate* ancestor, not the transitive root: a node inherited through a
/// chain of groups is tagged with the group it was read from last. Callers use this for "where
/// did this come from?" breadcrumbs; it carries no semantic weight, so equality and hashing
/// delegate to the contained node.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct LocalizedNode {
    node: Node,
    origin: String,
}

impl LocalizedNode {
    pub fn new(node: Node, origin: impl Into<String>) -> Self {
        Self {
            node,
            origin: origin.into(),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// Object name of the holder this node was sourced from.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl PartialEq for LocalizedNode {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for LocalizedNode {}

impl Hash for LocalizedNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

impl PartialOrd for LocalizedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocalizedNode {
    /// Descending specificity, so that an ordered set of localized nodes iterates most-specific
    /// first.
    fn cmp(&self, other: &Self) -> Ordering {
        priority::compare(other.node(), self.node())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn ordered_set_iterates_most_specific_first() {
        let mut set = BTreeSet::new();
        set.insert(LocalizedNode::new(Node::builder("fly").build(), "u"));
        set.insert(LocalizedNode::new(
            Node::builder("fly").server("hub").build(),
            "u",
        ));
        set.insert(LocalizedNode::new(
            Node::builder("fly").expiry(50).build(),
            "u",
        ));

        let permissions: Vec<String> = set.iter().map(|e| e.node().to_serialized()).collect();
        assert_eq!(permissions, ["fly$50", "hub/fly", "fly"]);
    }

    #[test]
    fn origin_is_informational() {
        let a = LocalizedNode::new(Node::builder("fly").build(), "admins");
        let b = LocalizedNode::new(Node::builder("fly").build(), "mods");

        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }
}
