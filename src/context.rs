// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query-time evaluation environment and node applicability.
//!
//! A [`Contexts`] describes the circumstances of a permission query: the server and world being
//! queried, any further key/value tags, and a set of flags steering how unscoped nodes and group
//! inheritance edges are treated. The applicability predicates on [`Node`] decide whether a node
//! participates in a query under a given context.

use std::collections::BTreeMap;

use regex::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::node::Node;

/// Distinguished tag key naming the server a query runs against.
pub const SERVER_KEY: &str = "server";

/// Distinguished tag key naming the world a query runs against.
pub const WORLD_KEY: &str = "world";

/// Prefix marking a server or world binding as a regular expression.
const REGEX_MARKER: &str = "R=";

/// The evaluation context of a permission query.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Contexts {
    tags: BTreeMap<String, String>,
    apply_groups: bool,
    include_global: bool,
    include_global_world: bool,
    apply_global_groups: bool,
    apply_global_world_groups: bool,
}

impl Contexts {
    pub fn new(
        tags: BTreeMap<String, String>,
        apply_groups: bool,
        include_global: bool,
        include_global_world: bool,
        apply_global_groups: bool,
        apply_global_world_groups: bool,
    ) -> Self {
        Self {
            tags,
            apply_groups,
            include_global,
            include_global_world,
            apply_global_groups,
            apply_global_world_groups,
        }
    }

    /// A context that matches everything: no tags, every flag enabled.
    pub fn allow_all() -> Self {
        Self::new(BTreeMap::new(), true, true, true, true, true)
    }

    /// Build a query context from the resolver configuration.
    ///
    /// The global-inclusion flags are seeded from `including_global_perms`; group edges are
    /// always followed.
    pub fn from_config(config: &Config, tags: BTreeMap<String, String>) -> Self {
        Self::new(
            tags,
            true,
            config.including_global_perms,
            config.including_global_perms,
            true,
            true,
        )
    }

    /// Attach a tag. The `server` and `world` keys are distinguished and read by
    /// [`Contexts::server`] and [`Contexts::world`] rather than matched as plain tags.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_apply_groups(mut self, apply_groups: bool) -> Self {
        self.apply_groups = apply_groups;
        self
    }

    pub fn with_include_global(mut self, include_global: bool) -> Self {
        self.include_global = include_global;
        self
    }

    pub fn with_include_global_world(mut self, include_global_world: bool) -> Self {
        self.include_global_world = include_global_world;
        self
    }

    pub fn with_apply_global_groups(mut self, apply_global_groups: bool) -> Self {
        self.apply_global_groups = apply_global_groups;
        self
    }

    pub fn with_apply_global_world_groups(mut self, apply_global_world_groups: bool) -> Self {
        self.apply_global_world_groups = apply_global_world_groups;
        self
    }

    /// The requested server. The empty string and the literal `global` mean "unspecified".
    pub fn server(&self) -> Option<&str> {
        normalize_scope(self.tags.get(SERVER_KEY))
    }

    /// The requested world. The empty string and the literal `global` mean "unspecified".
    pub fn world(&self) -> Option<&str> {
        normalize_scope(self.tags.get(WORLD_KEY))
    }

    /// All tags, including the distinguished server and world keys.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// The tag map with the server and world keys stripped, as matched against node context
    /// tags.
    pub fn stripped_tags(&self) -> BTreeMap<String, String> {
        self.tags
            .iter()
            .filter(|(key, _)| key.as_str() != SERVER_KEY && key.as_str() != WORLD_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Whether group inheritance is followed.
    pub fn apply_groups(&self) -> bool {
        self.apply_groups
    }

    /// Whether a node without a server binding applies.
    pub fn include_global(&self) -> bool {
        self.include_global
    }

    /// Whether a node without a world binding applies.
    pub fn include_global_world(&self) -> bool {
        self.include_global_world
    }

    /// Whether a group node without a server binding is followed during inheritance.
    pub fn apply_global_groups(&self) -> bool {
        self.apply_global_groups
    }

    /// Whether a group node without a world binding is followed during inheritance.
    pub fn apply_global_world_groups(&self) -> bool {
        self.apply_global_world_groups
    }
}

impl Default for Contexts {
    fn default() -> Self {
        Self::allow_all()
    }
}

fn normalize_scope(value: Option<&String>) -> Option<&str> {
    value
        .map(String::as_str)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("global"))
}

/// Match a node's server or world binding against a requested scope name.
///
/// When regex matching is enabled and the binding starts with `R=`, the remainder is compiled
/// and matched as a pattern; a pattern that fails to compile never matches. Otherwise the
/// comparison is a case-insensitive string equality.
fn scope_matches(binding: &str, requested: &str, regex: bool) -> bool {
    if regex {
        if let Some(pattern) = binding.strip_prefix(REGEX_MARKER) {
            return match Regex::new(pattern) {
                Ok(re) => re.is_match(requested),
                Err(err) => {
                    warn!(%pattern, "invalid regex in scope binding: {err}");
                    false
                }
            };
        }
    }

    binding.eq_ignore_ascii_case(requested)
}

impl Node {
    /// Whether this node applies on the requested server.
    ///
    /// A node without a server binding applies iff `include_global` is set. A node with a
    /// binding applies iff a server was requested and the binding matches it.
    pub fn should_apply_on_server(
        &self,
        requested: Option<&str>,
        include_global: bool,
        regex: bool,
    ) -> bool {
        match self.server() {
            None => include_global,
            Some(binding) => match requested {
                Some(requested) => scope_matches(binding, requested, regex),
                None => false,
            },
        }
    }

    /// Whether this node applies on the requested world. Analogous to
    /// [`Node::should_apply_on_server`].
    pub fn should_apply_on_world(
        &self,
        requested: Option<&str>,
        include_global: bool,
        regex: bool,
    ) -> bool {
        match self.world() {
            None => include_global,
            Some(binding) => match requested {
                Some(requested) => scope_matches(binding, requested, regex),
                None => false,
            },
        }
    }

    /// Whether this node applies under the given tag map.
    ///
    /// Every tag on the node must be present in `tags` with an equal value; additional tags on
    /// the context are ignored.
    pub fn should_apply_with_context(&self, tags: &BTreeMap<String, String>) -> bool {
        self.context()
            .iter()
            .all(|(key, value)| tags.get(key) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_and_world_accessors_normalize_global() {
        let context = Contexts::allow_all()
            .with_tag(SERVER_KEY, "hub")
            .with_tag(WORLD_KEY, "global");

        assert_eq!(context.server(), Some("hub"));
        assert_eq!(context.world(), None);

        let context = Contexts::allow_all().with_tag(SERVER_KEY, "");
        assert_eq!(context.server(), None);
    }

    #[test]
    fn stripped_tags_remove_distinguished_keys() {
        let context = Contexts::allow_all()
            .with_tag(SERVER_KEY, "hub")
            .with_tag(WORLD_KEY, "nether")
            .with_tag("gamemode", "creative");

        let stripped = context.stripped_tags();
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped.get("gamemode").map(String::as_str), Some("creative"));
    }

    #[test]
    fn unscoped_node_follows_include_global() {
        let node = Node::builder("fly").build();

        assert!(node.should_apply_on_server(Some("hub"), true, false));
        assert!(!node.should_apply_on_server(Some("hub"), false, false));
        assert!(node.should_apply_on_server(None, true, false));
        assert!(!node.should_apply_on_server(None, false, false));
    }

    #[test]
    fn scoped_node_requires_matching_server() {
        let node = Node::builder("fly").server("hub").build();

        assert!(node.should_apply_on_server(Some("hub"), false, false));
        assert!(node.should_apply_on_server(Some("HUB"), false, false));
        // A server mismatch is strict; include_global only concerns unscoped nodes.
        assert!(!node.should_apply_on_server(Some("survival"), true, false));
        assert!(!node.should_apply_on_server(None, true, false));
    }

    #[test]
    fn regex_binding_honours_flag() {
        let node = Node::builder("fly").server("R=hub-[0-9]+").build();

        assert!(node.should_apply_on_server(Some("hub-7"), false, true));
        assert!(!node.should_apply_on_server(Some("hub-x"), false, true));

        // With regex disabled the binding is compared literally.
        assert!(!node.should_apply_on_server(Some("hub-7"), false, false));
        assert!(node.should_apply_on_server(Some("r=hub-[0-9]+"), false, false));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let node = Node::builder("fly").server("R=hub-[").build();
        assert!(!node.should_apply_on_server(Some("hub-7"), false, true));
    }

    #[test]
    fn context_tags_must_be_subset() {
        let node = Node::builder("fly")
            .with_context("gamemode", "creative")
            .build();

        let mut tags = BTreeMap::new();
        assert!(!node.should_apply_with_context(&tags));

        tags.insert("gamemode".to_string(), "creative".to_string());
        tags.insert("dimension".to_string(), "end".to_string());
        assert!(node.should_apply_with_context(&tags));

        tags.insert("gamemode".to_string(), "survival".to_string());
        assert!(!node.should_apply_with_context(&tags));

        // A node without tags applies everywhere.
        let plain = Node::builder("fly").build();
        assert!(plain.should_apply_with_context(&BTreeMap::new()));
    }
}
