// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pangolin` provides context-aware permission resolution for principals (users) and roles
//! (groups) arranged in a directed inheritance graph.
//!
//! Each holder carries a set of typed permission entries ("nodes"); queries answer whether a
//! permission is granted, denied or unspecified under an evaluation context (server, world and
//! free-form key/value tags), with optional wildcard, shorthand and regex expansion.
//!
//! ## Features
//!
//! ### Ordered precedence
//!
//! Nodes are resolved in descending specificity: temporary entries outrank permanent ones,
//! world- and server-bound entries outrank global ones, tagged entries outrank untagged ones.
//! The order is total and deterministic, so for a fixed context and group snapshot every query
//! resolves the same way.
//!
//! ### Group inheritance
//!
//! Holders inherit nodes from the groups they are members of, transitively. Groups are
//! referenced by name and resolved through an injected [`GroupLookup`]; cycles in the
//! inheritance graph are broken by an excluded-name set during traversal, so resolution always
//! terminates and visits each holder at most once.
//!
//! ### Temporary permissions
//!
//! Nodes may carry an absolute expiry. Expired nodes are invisible to every query, and the
//! on-demand expiry auditor removes them and reports each removal as an event.
//!
//! ### Lifecycle events
//!
//! Mutations emit [`Event`]s into an injected [`EventSink`]. Emission is fire-and-forget and
//! never blocks the mutating thread.
//!
//! ## Example
//!
//! ```
//! use pangolin::{Config, Contexts, HolderKind, Node, NoGroups, PermissionHolder};
//!
//! let user = PermissionHolder::new("9f6ec479", HolderKind::User);
//! user.set_permission(Node::builder("worlds.fly").build()).unwrap();
//!
//! let exported = user.export_nodes(&Contexts::allow_all(), &[], false, &NoGroups, &Config::default());
//! assert_eq!(exported.get("worlds.fly"), Some(&true));
//! ```

mod config;
mod context;
mod event;
mod expand;
mod holder;
mod localized;
mod node;
mod priority;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
mod traits;

pub use config::Config;
pub use context::{Contexts, SERVER_KEY, WORLD_KEY};
pub use event::{ChannelSink, Event, NullSink};
pub use expand::export_to_legacy;
pub use holder::{HolderError, HolderKind, PermissionHolder, Tristate};
pub use localized::LocalizedNode;
pub use node::{Node, NodeBuilder, NodeParseError};
pub use traits::{EventSink, GroupLookup, NoGroups};
