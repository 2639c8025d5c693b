// SPDX-License-Identifier: MIT OR Apache-2.0

//! The resolver pipeline.
//!
//! Resolution runs in four stages: merge the holder's own sets ([`PermissionHolder::get_permissions`]),
//! join inherited nodes from transitively referenced groups ([`PermissionHolder::get_all_nodes`]),
//! filter by evaluation context ([`PermissionHolder::get_all_nodes_filtered`]) and expand into
//! the flat effective permission map ([`PermissionHolder::export_nodes`]).
//!
//! Inheritance acquires snapshots of each visited group independently; the composition is not
//! globally atomic. A group edited mid-traversal may contribute a mix of old and new state,
//! which callers requiring a transactional view must prevent with an external lock.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::config::Config;
use crate::context::Contexts;
use crate::holder::{PermissionHolder, Tristate, unix_now};
use crate::localized::LocalizedNode;
use crate::node::Node;
use crate::traits::GroupLookup;

impl PermissionHolder {
    /// Merge and deduplicate the holder's own node sets into a priority-ordered sequence.
    ///
    /// The union of the persistent and transient sets is walked in descending specificity;
    /// the first node seen wins against later equivalent ones. With `merge_temp`, a temporary
    /// and a permanent node that are otherwise equal collapse into one logical entry — the
    /// temporary one, since it sorts first. Without it, only value-divergent duplicates
    /// collapse.
    ///
    /// Expired nodes are skipped even when no audit has removed them yet.
    pub fn get_permissions(&self, merge_temp: bool) -> BTreeSet<LocalizedNode> {
        let now = unix_now();

        let mut candidates = BTreeSet::new();
        for node in self
            .get_nodes()
            .into_iter()
            .chain(self.get_transient_nodes())
        {
            if node.is_expired(now) {
                continue;
            }
            candidates.insert(LocalizedNode::new(node, self.object_name()));
        }

        let mut accepted: BTreeSet<LocalizedNode> = BTreeSet::new();
        for candidate in candidates {
            let duplicate = accepted.iter().any(|held| {
                if merge_temp {
                    held.node().equals_ignoring_value_or_temp(candidate.node())
                } else {
                    held.node().almost_equals(candidate.node())
                }
            });
            if !duplicate {
                accepted.insert(candidate);
            }
        }

        accepted
    }

    /// Resolve the holder's nodes together with those inherited from its groups.
    ///
    /// Parents are followed depth-first through the given lookup; each holder is visited at
    /// most once per resolution, so cyclic group graphs terminate. Unknown groups are skipped
    /// silently. An inherited node only joins the result when no equivalent entry is already
    /// present, which makes nodes closer to this holder mask inherited ones of equal
    /// specificity.
    pub fn get_all_nodes(
        &self,
        excluded: Option<Vec<String>>,
        context: &Contexts,
        groups: &dyn GroupLookup,
        config: &Config,
    ) -> BTreeSet<LocalizedNode> {
        let mut excluded = excluded.unwrap_or_default();
        self.collect_inherited(&mut excluded, context, groups, config)
    }

    fn collect_inherited(
        &self,
        excluded: &mut Vec<String>,
        context: &Contexts,
        groups: &dyn GroupLookup,
        config: &Config,
    ) -> BTreeSet<LocalizedNode> {
        let mut all = self.get_permissions(true);
        excluded.push(self.object_name().to_lowercase());

        let stripped = context.stripped_tags();
        let parents: Vec<LocalizedNode> = all
            .iter()
            .filter(|entry| entry.node().is_group_node())
            .filter(|entry| {
                entry.node().should_apply_on_server(
                    context.server(),
                    context.apply_global_groups(),
                    config.applying_regex,
                )
            })
            .filter(|entry| {
                entry.node().should_apply_on_world(
                    context.world(),
                    context.apply_global_world_groups(),
                    config.applying_regex,
                )
            })
            .filter(|entry| entry.node().should_apply_with_context(&stripped))
            .cloned()
            .collect();

        for parent in parents {
            let Some(name) = parent.node().group_name() else {
                continue;
            };
            let Some(group) = groups.group(&name) else {
                debug!(holder = %self.object_name(), group = %name, "skipping unknown parent group");
                continue;
            };
            if excluded
                .iter()
                .any(|visited| *visited == group.object_name().to_lowercase())
            {
                continue;
            }

            for entry in group.collect_inherited(excluded, context, groups, config) {
                let duplicate = all
                    .iter()
                    .any(|held| held.node().almost_equals(entry.node()));
                if !duplicate {
                    all.insert(entry);
                }
            }
        }

        all
    }

    /// Resolve and filter by the evaluation context.
    ///
    /// Keeps a node iff its server, world and tag predicates pass, deduplicated per permission
    /// string with the highest-priority value winning. The result is an unordered set; the
    /// priority ordering has been consumed by the dedup.
    pub fn get_all_nodes_filtered(
        &self,
        context: &Contexts,
        groups: &dyn GroupLookup,
        config: &Config,
    ) -> HashSet<LocalizedNode> {
        let all = if context.apply_groups() {
            self.get_all_nodes(None, context, groups, config)
        } else {
            self.get_permissions(true)
        };

        let stripped = context.stripped_tags();
        let mut kept: Vec<LocalizedNode> = Vec::new();
        for entry in all {
            if !entry.node().should_apply_on_server(
                context.server(),
                context.include_global(),
                config.applying_regex,
            ) {
                continue;
            }
            if !entry.node().should_apply_on_world(
                context.world(),
                context.include_global_world(),
                config.applying_regex,
            ) {
                continue;
            }
            if !entry.node().should_apply_with_context(&stripped) {
                continue;
            }
            if kept
                .iter()
                .any(|held| held.node().permission() == entry.node().permission())
            {
                continue;
            }
            kept.push(entry);
        }

        kept.into_iter().collect()
    }

    /// Produce the flat effective permission map for the given context.
    ///
    /// `possible` is the caller's universe of known permissions, used for wildcard fan-out;
    /// pass an empty slice to disable it. With `lower`, keys are lowercased on insertion.
    ///
    /// Per resolved node: a bare wildcard assigns every known permission to true, the node's
    /// own permission is assigned authoritatively, and shorthand and trailing-wildcard
    /// expansions fill remaining gaps first-writer-wins.
    pub fn export_nodes(
        &self,
        context: &Contexts,
        possible: &[String],
        lower: bool,
        groups: &dyn GroupLookup,
        config: &Config,
    ) -> HashMap<String, bool> {
        let key = |permission: &str| {
            if lower {
                permission.to_lowercase()
            } else {
                permission.to_string()
            }
        };

        let mut exported = HashMap::new();
        for entry in self.get_all_nodes_filtered(context, groups, config) {
            let node = entry.node();

            if !possible.is_empty() && config.apply_wildcards && node.is_wildcard() {
                for permission in possible {
                    exported.insert(key(permission), true);
                }
            }

            exported.insert(key(node.permission()), node.value());

            if config.apply_shorthand {
                for permission in node.resolve_shorthand() {
                    exported.entry(key(&permission)).or_insert(node.value());
                }
            }

            if !possible.is_empty() && config.apply_wildcards {
                for permission in node.resolve_wildcard(possible) {
                    exported.entry(key(&permission)).or_insert(node.value());
                }
            }
        }

        exported
    }

    /// Look up the given node across the holder's own and inherited sets, returning the
    /// matching entry together with the holder it was sourced from.
    pub fn inherits_permission_info(
        &self,
        node: &Node,
        groups: &dyn GroupLookup,
        config: &Config,
    ) -> Option<LocalizedNode> {
        self.get_all_nodes(None, &Contexts::allow_all(), groups, config)
            .into_iter()
            .find(|entry| entry.node().almost_equals(node))
    }

    /// As [`PermissionHolder::inherits_permission_info`], reduced to the matching node's value.
    pub fn inherits_permission(
        &self,
        node: &Node,
        groups: &dyn GroupLookup,
        config: &Config,
    ) -> Tristate {
        self.inherits_permission_info(node, groups, config)
            .map(|entry| Tristate::from(entry.node().value()))
            .unwrap_or(Tristate::Undefined)
    }

    /// Build-and-delegate convenience for [`PermissionHolder::inherits_permission`].
    pub fn inherits_permission_named(
        &self,
        permission: &str,
        groups: &dyn GroupLookup,
        config: &Config,
    ) -> Tristate {
        self.inherits_permission(&Node::builder(permission).build(), groups, config)
    }
}
