// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shorthand and wildcard expansion.
//!
//! Both expansions are pure functions on [`Node`] returning finite sets; the export pipeline in
//! `holder::resolve` decides how their results merge into the flat permission map.

use std::collections::HashMap;

use crate::localized::LocalizedNode;
use crate::node::Node;

impl Node {
    /// Expand the parenthesized-alternation shorthand of this node's permission.
    ///
    /// Each dot-separated segment may hold a `(a|b|c)` alternation group; the expansion is the
    /// cartesian product over all segments. Returns an empty set when the permission carries no
    /// alternation group.
    ///
    /// ```
    /// use pangolin::Node;
    ///
    /// let node = Node::builder("cmd.(kick|ban).use").build();
    /// assert_eq!(node.resolve_shorthand(), ["cmd.kick.use", "cmd.ban.use"]);
    /// ```
    pub fn resolve_shorthand(&self) -> Vec<String> {
        if self.is_wildcard() || !self.permission().contains('(') {
            return Vec::new();
        }

        let mut found_group = false;
        let segments: Vec<Vec<&str>> = self
            .permission()
            .split('.')
            .map(|segment| match alternation_options(segment) {
                Some(options) => {
                    found_group = true;
                    options
                }
                None => vec![segment],
            })
            .collect();

        if !found_group {
            return Vec::new();
        }

        let mut expanded = vec![String::new()];
        for (i, options) in segments.iter().enumerate() {
            let mut next = Vec::with_capacity(expanded.len() * options.len());
            for prefix in &expanded {
                for option in options {
                    let mut permission = prefix.clone();
                    if i > 0 {
                        permission.push('.');
                    }
                    permission.push_str(option);
                    next.push(permission);
                }
            }
            expanded = next;
        }

        expanded
    }

    /// Match this node's trailing-wildcard permission against a universe of known permissions.
    ///
    /// A permission of the form `a.b.*` expands to every entry of `possible` under the `a.b.`
    /// prefix, compared case-insensitively. Bare wildcard nodes (`*`) are not expanded here;
    /// the export pipeline fans them out over the whole universe directly.
    pub fn resolve_wildcard(&self, possible: &[String]) -> Vec<String> {
        if self.is_wildcard() || !self.permission().ends_with(".*") {
            return Vec::new();
        }

        // Keep the trailing dot so "a.b.*" does not match "a.bc.x".
        let prefix = self.permission()[..self.permission().len() - 1].to_lowercase();

        possible
            .iter()
            .filter(|candidate| {
                let candidate = candidate.to_lowercase();
                candidate.len() > prefix.len() && candidate.starts_with(&prefix)
            })
            .cloned()
            .collect()
    }
}

/// Serialize resolved nodes into the legacy flat map: canonical string form paired with the
/// node's value.
pub fn export_to_legacy<'a>(
    nodes: impl IntoIterator<Item = &'a LocalizedNode>,
) -> HashMap<String, bool> {
    nodes
        .into_iter()
        .map(|entry| (entry.node().to_serialized(), entry.node().value()))
        .collect()
}

fn alternation_options(segment: &str) -> Option<Vec<&str>> {
    let inner = segment.strip_prefix('(')?.strip_suffix(')')?;
    let options: Vec<&str> = inner.split('|').filter(|option| !option.is_empty()).collect();
    if options.is_empty() { None } else { Some(options) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_single_group() {
        let node = Node::builder("cmd.(kick|ban).use").build();
        assert_eq!(node.resolve_shorthand(), ["cmd.kick.use", "cmd.ban.use"]);
    }

    #[test]
    fn shorthand_cartesian_product() {
        let node = Node::builder("(a|b).(x|y)").build();
        assert_eq!(node.resolve_shorthand(), ["a.x", "a.y", "b.x", "b.y"]);
    }

    #[test]
    fn shorthand_without_groups_is_empty() {
        assert!(Node::builder("cmd.kick.use").build().resolve_shorthand().is_empty());
        assert!(Node::builder("*").build().resolve_shorthand().is_empty());
        // A parenthesis without a closing partner is not a group.
        assert!(Node::builder("cmd.(kick.use").build().resolve_shorthand().is_empty());
    }

    #[test]
    fn wildcard_prefix_match() {
        let node = Node::builder("fly.worlds.*").build();
        let possible = vec![
            "fly.worlds.nether".to_string(),
            "fly.worlds.end".to_string(),
            "fly.worldsedge".to_string(),
            "fly.worlds".to_string(),
            "walk.worlds.nether".to_string(),
        ];

        assert_eq!(
            node.resolve_wildcard(&possible),
            ["fly.worlds.nether", "fly.worlds.end"]
        );
    }

    #[test]
    fn wildcard_match_is_case_insensitive() {
        let node = Node::builder("Fly.Worlds.*").build();
        let possible = vec!["fly.worlds.NETHER".to_string()];
        assert_eq!(node.resolve_wildcard(&possible), ["fly.worlds.NETHER"]);
    }

    #[test]
    fn bare_wildcard_is_not_prefix_expanded() {
        let node = Node::builder("*").build();
        assert!(node.resolve_wildcard(&["anything".to_string()]).is_empty());
    }

    #[test]
    fn legacy_export_uses_canonical_form() {
        let entries = [
            LocalizedNode::new(Node::builder("fly").server("hub").build(), "u1"),
            LocalizedNode::new(Node::builder("walk").value(false).expiry(50).build(), "u1"),
        ];

        let legacy = export_to_legacy(&entries);
        assert_eq!(legacy.get("hub/fly"), Some(&true));
        assert_eq!(legacy.get("walk$50"), Some(&false));
        assert_eq!(legacy.len(), 2);
    }
}
