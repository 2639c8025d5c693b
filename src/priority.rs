// SPDX-License-Identifier: MIT OR Apache-2.0

//! Total order on nodes by specificity.
//!
//! The resolver iterates nodes in descending specificity so that more specific nodes mask less
//! specific ones. Keys, from most to least significant: expiry presence, world binding, server
//! binding, context tags, wildcard depth, the permission string itself. Ties on all keys are
//! broken by the canonical serialized form so the order is total and stable across runs and
//! threads.

use std::cmp::Ordering;

use crate::node::Node;

/// Compare two nodes by specificity, ascending: `Greater` means `a` is more specific than `b`.
///
/// Pure; must agree with itself across threads. Returns `Equal` only for structurally equal
/// nodes.
pub fn compare(a: &Node, b: &Node) -> Ordering {
    a.is_temporary()
        .cmp(&b.is_temporary())
        .then_with(|| a.world().is_some().cmp(&b.world().is_some()))
        .then_with(|| a.server().is_some().cmp(&b.server().is_some()))
        .then_with(|| (!a.context().is_empty()).cmp(&(!b.context().is_empty())))
        // A permission with fewer wildcard segments is the more specific one.
        .then_with(|| b.wildcard_segments().cmp(&a.wildcard_segments()))
        .then_with(|| a.permission().cmp(b.permission()))
        .then_with(|| a.to_serialized().cmp(&b.to_serialized()))
        .then_with(|| a.value().cmp(&b.value()))
}
