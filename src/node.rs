// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission nodes.
//!
//! A `Node` is a single immutable permission entry: a permission string paired with a boolean
//! value (grant or deny) and a set of context predicates restricting where it applies. Nodes are
//! constructed through [`NodeBuilder`] and never mutated afterwards; every mutation on a holder
//! replaces whole nodes.
//!
//! Three different equivalence relations exist over nodes and they must not be conflated:
//!
//! - Structural equality (`==`): all fields equal.
//! - [`Node::almost_equals`]: ignores the value, compares expiry *presence* only. This is the
//!   "does the holder have this node?" relation.
//! - [`Node::equals_ignoring_value_or_temp`]: ignores value and expiry entirely. Used while
//!   merging, where a permanent node subsumes a temporary duplicate.

use std::collections::BTreeMap;
use std::fmt;
use std::num::ParseIntError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix marking a node as a group membership entry.
const GROUP_NODE_PREFIX: &str = "group.";

/// Placeholder server name representing "no server" in the serialized form.
const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Error)]
pub enum NodeParseError {
    #[error("serialized node has an unterminated context block: {0}")]
    UnterminatedContext(String),

    #[error("serialized node has a malformed context entry: {0}")]
    MalformedContext(String),

    #[error("serialized node has a malformed expiry: {0}")]
    MalformedExpiry(#[from] ParseIntError),

    #[error("serialized node has an empty permission")]
    EmptyPermission,
}

/// An immutable permission entry with context predicates.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Node {
    permission: String,
    value: bool,
    server: Option<String>,
    world: Option<String>,
    expiry: Option<u64>,
    context: BTreeMap<String, String>,
}

impl Node {
    /// Start building a node for the given permission.
    ///
    /// Panics if the permission is empty; an empty permission is a programmer error, not a
    /// recoverable condition.
    pub fn builder(permission: impl Into<String>) -> NodeBuilder {
        let permission = permission.into();
        assert!(!permission.is_empty(), "node permission must not be empty");

        NodeBuilder {
            node: Node {
                permission,
                value: true,
                server: None,
                world: None,
                expiry: None,
                context: BTreeMap::new(),
            },
        }
    }

    /// The logical permission key.
    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// True grants the permission, false denies it.
    pub fn value(&self) -> bool {
        self.value
    }

    /// The server this node is bound to, if any.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// The world this node is bound to, if any.
    pub fn world(&self) -> Option<&str> {
        self.world.as_deref()
    }

    /// Absolute expiry in unix-epoch seconds; `None` means permanent.
    pub fn expiry(&self) -> Option<u64> {
        self.expiry
    }

    /// Additional matching dimensions beyond server and world.
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Return `true` if this node carries an expiry.
    pub fn is_temporary(&self) -> bool {
        self.expiry.is_some()
    }

    /// Return `true` if this node's expiry has passed at the given instant.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    /// Return `true` if this node expresses membership of a group.
    pub fn is_group_node(&self) -> bool {
        // Compare raw bytes; slicing the string could split a multi-byte character.
        self.permission.len() > GROUP_NODE_PREFIX.len()
            && self.permission.as_bytes()[..GROUP_NODE_PREFIX.len()]
                .eq_ignore_ascii_case(GROUP_NODE_PREFIX.as_bytes())
    }

    /// The name of the group this node points at, lowercased.
    pub fn group_name(&self) -> Option<String> {
        if self.is_group_node() {
            // A matching prefix is pure ASCII, so the byte offset is a character boundary.
            Some(self.permission[GROUP_NODE_PREFIX.len()..].to_lowercase())
        } else {
            None
        }
    }

    /// Return `true` if this node grants every permission in a caller-supplied universe.
    pub fn is_wildcard(&self) -> bool {
        self.permission == "*" || self.permission == "'*'"
    }

    /// Number of `*` path segments in the permission. Fewer segments mean a more specific node.
    pub fn wildcard_segments(&self) -> usize {
        self.permission
            .split('.')
            .filter(|segment| *segment == "*")
            .count()
    }

    /// Equivalence ignoring the value; expiry is compared by presence only.
    pub fn almost_equals(&self, other: &Node) -> bool {
        self.permission == other.permission
            && self.server == other.server
            && self.world == other.world
            && self.context == other.context
            && self.expiry.is_some() == other.expiry.is_some()
    }

    /// Equivalence ignoring both the value and the expiry.
    pub fn equals_ignoring_value_or_temp(&self, other: &Node) -> bool {
        self.permission == other.permission
            && self.server == other.server
            && self.world == other.world
            && self.context == other.context
    }

    /// Canonical string form of this node: the full contextual key including server, world, tags
    /// and expiry markers.
    ///
    /// The format is `(k=v,k2=v2)server-world/permission$expiry` with every section other than
    /// the permission optional. A world without a server is written under the `global` server
    /// placeholder; the builder never produces a server or world literally named `global`, so
    /// the placeholder is unambiguous. Round-trips through [`Node::from_serialized`].
    pub fn to_serialized(&self) -> String {
        let mut out = String::new();

        if !self.context.is_empty() {
            out.push('(');
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(key);
                out.push('=');
                out.push_str(value);
            }
            out.push(')');
        }

        match (&self.server, &self.world) {
            (Some(server), Some(world)) => {
                out.push_str(server);
                out.push('-');
                out.push_str(world);
                out.push('/');
            }
            (Some(server), None) => {
                out.push_str(server);
                out.push('/');
            }
            (None, Some(world)) => {
                out.push_str(GLOBAL_SCOPE);
                out.push('-');
                out.push_str(world);
                out.push('/');
            }
            (None, None) => {}
        }

        out.push_str(&self.permission);

        if let Some(expiry) = self.expiry {
            out.push('$');
            out.push_str(&expiry.to_string());
        }

        out
    }

    /// Rebuild a node from its canonical string form and a value.
    pub fn from_serialized(serialized: &str, value: bool) -> Result<Node, NodeParseError> {
        let mut rest = serialized;

        let mut context = BTreeMap::new();
        if let Some(stripped) = rest.strip_prefix('(') {
            let end = stripped
                .find(')')
                .ok_or_else(|| NodeParseError::UnterminatedContext(serialized.to_string()))?;
            for entry in stripped[..end].split(',') {
                let (key, value) = entry
                    .split_once('=')
                    .ok_or_else(|| NodeParseError::MalformedContext(entry.to_string()))?;
                context.insert(key.to_string(), value.to_string());
            }
            rest = &stripped[end + 1..];
        }

        let mut server = None;
        let mut world = None;
        if let Some((scope, permission)) = rest.split_once('/') {
            let (server_part, world_part) = match scope.split_once('-') {
                Some((server_part, world_part)) => (server_part, Some(world_part)),
                None => (scope, None),
            };
            server = scope_binding(server_part.to_string());
            world = world_part.and_then(|part| scope_binding(part.to_string()));
            rest = permission;
        }

        let mut expiry = None;
        if let Some((permission, expiry_part)) = rest.rsplit_once('$') {
            expiry = Some(expiry_part.parse()?);
            rest = permission;
        }

        if rest.is_empty() {
            return Err(NodeParseError::EmptyPermission);
        }

        Ok(Node {
            permission: rest.to_string(),
            value,
            server,
            world,
            expiry,
            context,
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_serialized())
    }
}

/// Builder for [`Node`].
#[derive(Clone, Debug)]
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    /// Set the node's value. Defaults to `true`.
    pub fn value(mut self, value: bool) -> Self {
        self.node.value = value;
        self
    }

    /// Bind the node to a server.
    ///
    /// The empty string and the literal `global` (any case) mean "no binding", mirroring how
    /// query contexts read the requested server.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.node.server = scope_binding(server.into());
        self
    }

    /// Bind the node to a world. Normalized like [`NodeBuilder::server`].
    pub fn world(mut self, world: impl Into<String>) -> Self {
        self.node.world = scope_binding(world.into());
        self
    }

    /// Give the node an absolute expiry in unix-epoch seconds.
    pub fn expiry(mut self, expiry: u64) -> Self {
        self.node.expiry = Some(expiry);
        self
    }

    /// Attach an additional context tag.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.node.context.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}

/// Normalize a server or world binding. The empty string and the literal `global` mean "no
/// binding"; keeping them out of built nodes leaves the `global` placeholder in the serialized
/// form unambiguous.
fn scope_binding(value: String) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case(GLOBAL_SCOPE) {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let node = Node::builder("fly").build();

        assert_eq!(node.permission(), "fly");
        assert!(node.value());
        assert!(node.server().is_none());
        assert!(node.world().is_none());
        assert!(node.expiry().is_none());
        assert!(node.context().is_empty());
        assert!(!node.is_temporary());
    }

    #[test]
    #[should_panic(expected = "permission must not be empty")]
    fn empty_permission_panics() {
        let _ = Node::builder("");
    }

    #[test]
    fn group_node_detection() {
        let node = Node::builder("group.Admin").build();
        assert!(node.is_group_node());
        assert_eq!(node.group_name().as_deref(), Some("admin"));

        // The prefix match is case-insensitive.
        let node = Node::builder("GROUP.mods").build();
        assert!(node.is_group_node());
        assert_eq!(node.group_name().as_deref(), Some("mods"));

        // A bare "group." carries no name and is not a group node.
        let node = Node::builder("group.").build();
        assert!(!node.is_group_node());

        let node = Node::builder("groups.admin").build();
        assert!(!node.is_group_node());
    }

    #[test]
    fn group_detection_handles_multibyte_permissions() {
        // The prefix-length byte offset of "groupé.admin" falls inside the two-byte "é"; the
        // check must not slice there.
        let node = Node::builder("groupé.admin").build();
        assert!(!node.is_group_node());
        assert!(node.group_name().is_none());
    }

    #[test]
    fn builder_normalizes_global_scopes() {
        let node = Node::builder("fly").server("global").world("GLOBAL").build();
        assert!(node.server().is_none());
        assert!(node.world().is_none());
        assert_eq!(node.to_serialized(), "fly");

        let node = Node::builder("fly").server("").world("nether").build();
        assert!(node.server().is_none());
        assert_eq!(node.to_serialized(), "global-nether/fly");

        // The normalized node round-trips; a distinct node serializing to the same string can
        // not be built.
        let parsed = Node::from_serialized("global-nether/fly", true).unwrap();
        assert_eq!(node, parsed);
    }

    #[test]
    fn wildcard_detection() {
        assert!(Node::builder("*").build().is_wildcard());
        assert!(Node::builder("'*'").build().is_wildcard());
        assert!(!Node::builder("a.*").build().is_wildcard());

        assert_eq!(Node::builder("a.*").build().wildcard_segments(), 1);
        assert_eq!(Node::builder("a.*.b.*").build().wildcard_segments(), 2);
        assert_eq!(Node::builder("a.b").build().wildcard_segments(), 0);
    }

    #[test]
    fn expiry_predicates() {
        let node = Node::builder("fly").expiry(100).build();

        assert!(node.is_temporary());
        assert!(!node.is_expired(99));
        assert!(node.is_expired(100));
        assert!(node.is_expired(101));
    }

    #[test]
    fn almost_equals_ignores_value() {
        let grant = Node::builder("fly").value(true).server("s1").build();
        let deny = Node::builder("fly").value(false).server("s1").build();

        assert_ne!(grant, deny);
        assert!(grant.almost_equals(&deny));
    }

    #[test]
    fn almost_equals_compares_expiry_presence() {
        let soon = Node::builder("fly").expiry(100).build();
        let later = Node::builder("fly").expiry(200).build();
        let permanent = Node::builder("fly").build();

        // Two temporary nodes with different expiries are the "same" node.
        assert!(soon.almost_equals(&later));

        // A temporary and a permanent node are not.
        assert!(!soon.almost_equals(&permanent));

        // ...but are once expiry is ignored entirely.
        assert!(soon.equals_ignoring_value_or_temp(&permanent));
    }

    #[test]
    fn serialized_round_trip() {
        let nodes = [
            Node::builder("fly").build(),
            Node::builder("fly").value(false).build(),
            Node::builder("fly").server("hub").build(),
            Node::builder("fly").server("hub").world("nether").build(),
            Node::builder("fly").world("nether").build(),
            Node::builder("fly").expiry(123_456).build(),
            Node::builder("fly")
                .server("hub")
                .world("nether")
                .expiry(123_456)
                .with_context("gamemode", "creative")
                .with_context("dimension", "end")
                .build(),
            Node::builder("group.admin").server("hub").build(),
        ];

        for node in nodes {
            let serialized = node.to_serialized();
            let parsed = Node::from_serialized(&serialized, node.value()).unwrap();
            assert_eq!(node, parsed, "{serialized}");
        }
    }

    #[test]
    fn serialized_forms() {
        assert_eq!(Node::builder("fly").build().to_serialized(), "fly");
        assert_eq!(
            Node::builder("fly").server("hub").build().to_serialized(),
            "hub/fly"
        );
        assert_eq!(
            Node::builder("fly").world("nether").build().to_serialized(),
            "global-nether/fly"
        );
        assert_eq!(
            Node::builder("fly").expiry(99).build().to_serialized(),
            "fly$99"
        );
        assert_eq!(
            Node::builder("fly")
                .with_context("gamemode", "creative")
                .build()
                .to_serialized(),
            "(gamemode=creative)fly"
        );
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Node::from_serialized("(gamemode=creative", true),
            Err(NodeParseError::UnterminatedContext(_))
        ));
        assert!(matches!(
            Node::from_serialized("(gamemode)fly", true),
            Err(NodeParseError::MalformedContext(_))
        ));
        assert!(matches!(
            Node::from_serialized("fly$soon", true),
            Err(NodeParseError::MalformedExpiry(_))
        ));
        assert!(matches!(
            Node::from_serialized("hub/", true),
            Err(NodeParseError::EmptyPermission)
        ));
    }
}
