// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission holders.
//!
//! A [`PermissionHolder`] is a long-lived shared entity — a user or a group — owning two sets of
//! permission nodes: the persistent `nodes` and the in-memory `transient_nodes`. Many readers
//! may resolve concurrently while occasional writers mutate the sets; every read takes a
//! consistent snapshot of both sets before iterating.

mod resolve;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::debug;

use crate::event::{Event, NullSink};
use crate::node::Node;
use crate::traits::EventSink;

const LOCK_POISONED: &str = "holder node set lock poisoned";

/// All possible errors that can occur when mutating a holder's node sets.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum HolderError {
    /// The target set already holds an equivalent node.
    #[error("holder already has a node matching {0}")]
    AlreadyHas(String),

    /// The target set holds no equivalent node.
    #[error("holder lacks a node matching {0}")]
    Lacks(String),
}

/// One of {true, false, undefined}: the answer to a permission query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tristate {
    True,
    False,
    Undefined,
}

impl Tristate {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Tristate::True => Some(true),
            Tristate::False => Some(false),
            Tristate::Undefined => None,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value { Tristate::True } else { Tristate::False }
    }
}

/// Whether a holder is a principal or a role.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HolderKind {
    User,
    Group,
}

impl fmt::Display for HolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HolderKind::User => "user",
            HolderKind::Group => "group",
        };

        write!(f, "{}", s)
    }
}

/// An entity carrying permissions: a user or a group.
pub struct PermissionHolder {
    object_name: String,
    kind: HolderKind,
    nodes: RwLock<HashSet<Node>>,
    transient_nodes: RwLock<HashSet<Node>>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for PermissionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionHolder")
            .field("object_name", &self.object_name)
            .field("kind", &self.kind)
            .field("nodes", &self.nodes)
            .field("transient_nodes", &self.transient_nodes)
            .finish_non_exhaustive()
    }
}

impl PermissionHolder {
    /// Create a holder which discards its lifecycle events.
    pub fn new(object_name: impl Into<String>, kind: HolderKind) -> Self {
        Self::with_events(object_name, kind, Arc::new(NullSink))
    }

    /// Create a holder emitting lifecycle events into the given sink.
    pub fn with_events(
        object_name: impl Into<String>,
        kind: HolderKind,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            object_name: object_name.into(),
            kind,
            nodes: RwLock::new(HashSet::new()),
            transient_nodes: RwLock::new(HashSet::new()),
            events,
        }
    }

    /// Stable identity of this holder: a user UUID string or a group name. Used for cycle
    /// detection and for stamping resolved nodes with their origin.
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn kind(&self) -> HolderKind {
        self.kind
    }

    /// Snapshot of the persistent node set.
    pub fn get_nodes(&self) -> HashSet<Node> {
        self.nodes.read().expect(LOCK_POISONED).clone()
    }

    /// Snapshot of the transient node set.
    pub fn get_transient_nodes(&self) -> HashSet<Node> {
        self.transient_nodes.read().expect(LOCK_POISONED).clone()
    }

    /// Replace the persistent node set atomically, then audit expired entries.
    ///
    /// This is a migration primitive: no events are emitted for the individual nodes, only
    /// expiry events from the audit that follows.
    pub fn set_nodes(&self, nodes: HashSet<Node>) {
        *self.nodes.write().expect(LOCK_POISONED) = nodes;
        self.audit_temporary_permissions();
    }

    /// Replace the transient node set atomically, then audit expired entries.
    pub fn set_transient_nodes(&self, nodes: HashSet<Node>) {
        *self.transient_nodes.write().expect(LOCK_POISONED) = nodes;
        self.audit_temporary_permissions();
    }

    /// Add a node to the persistent set.
    ///
    /// Fails with [`HolderError::AlreadyHas`] when an equivalent node is already present.
    pub fn set_permission(&self, node: Node) -> Result<(), HolderError> {
        if self.has_permission(&node, false) != Tristate::Undefined {
            return Err(HolderError::AlreadyHas(node.to_serialized()));
        }

        self.nodes.write().expect(LOCK_POISONED).insert(node.clone());

        debug!(holder = %self.object_name, node = %node, "set permission node");
        self.events.emit(Event::PermissionNodeSet {
            holder: self.object_name.clone(),
            node,
        });

        Ok(())
    }

    /// Add a node to the transient set.
    pub fn set_transient_permission(&self, node: Node) -> Result<(), HolderError> {
        if self.has_permission(&node, true) != Tristate::Undefined {
            return Err(HolderError::AlreadyHas(node.to_serialized()));
        }

        self.transient_nodes
            .write()
            .expect(LOCK_POISONED)
            .insert(node.clone());

        debug!(holder = %self.object_name, node = %node, "set transient permission node");
        self.events.emit(Event::PermissionNodeSet {
            holder: self.object_name.clone(),
            node,
        });

        Ok(())
    }

    /// Remove a node from the persistent set.
    ///
    /// Fails with [`HolderError::Lacks`] when no equivalent node is present. Removes every
    /// entry equivalent to the given node; there should be at most one, the removal sweeps all
    /// the same.
    pub fn unset_permission(&self, node: &Node) -> Result<(), HolderError> {
        let removed = Self::remove_matching(&self.nodes, node)?;
        self.emit_unset(removed);
        Ok(())
    }

    /// Remove a node from the transient set.
    pub fn unset_transient_permission(&self, node: &Node) -> Result<(), HolderError> {
        let removed = Self::remove_matching(&self.transient_nodes, node)?;
        self.emit_unset(removed);
        Ok(())
    }

    /// Remove every expired temporary node from both sets, emitting one
    /// [`Event::PermissionNodeExpire`] per removal. Returns whether anything was removed.
    ///
    /// Idempotent and monotone; resolution additionally treats expired nodes as absent even
    /// before an audit has run.
    pub fn audit_temporary_permissions(&self) -> bool {
        let now = unix_now();
        let mut any_removed = false;

        for lock in [&self.nodes, &self.transient_nodes] {
            let expired: Vec<Node> = {
                let mut set = lock.write().expect(LOCK_POISONED);
                let expired: Vec<Node> = set
                    .iter()
                    .filter(|node| node.is_expired(now))
                    .cloned()
                    .collect();
                for node in &expired {
                    set.remove(node);
                }
                expired
            };

            for node in expired {
                any_removed = true;
                debug!(holder = %self.object_name, node = %node, "expired temporary permission node");
                self.events.emit(Event::PermissionNodeExpire {
                    holder: self.object_name.clone(),
                    node,
                });
            }
        }

        any_removed
    }

    /// Scan the chosen set for a node equivalent to the given one, without following
    /// inheritance. Expired entries are invisible.
    pub fn has_permission(&self, node: &Node, transient: bool) -> Tristate {
        let now = unix_now();
        let lock = if transient {
            &self.transient_nodes
        } else {
            &self.nodes
        };

        lock.read()
            .expect(LOCK_POISONED)
            .iter()
            .filter(|held| !held.is_expired(now))
            .find(|held| held.almost_equals(node))
            .map(|held| Tristate::from(held.value()))
            .unwrap_or(Tristate::Undefined)
    }

    /// Build-and-delegate convenience for [`PermissionHolder::has_permission`].
    pub fn has_permission_named(&self, permission: &str, transient: bool) -> Tristate {
        self.has_permission(&Node::builder(permission).build(), transient)
    }

    fn remove_matching(lock: &RwLock<HashSet<Node>>, node: &Node) -> Result<Node, HolderError> {
        let mut set = lock.write().expect(LOCK_POISONED);
        let matching: Vec<Node> = set
            .iter()
            .filter(|held| held.almost_equals(node))
            .cloned()
            .collect();

        let Some(first) = matching.first().cloned() else {
            return Err(HolderError::Lacks(node.to_serialized()));
        };

        for held in &matching {
            set.remove(held);
        }

        Ok(first)
    }

    fn emit_unset(&self, node: Node) {
        debug!(holder = %self.object_name, node = %node, "unset permission node");

        if let Some(group) = node.group_name() {
            self.events.emit(Event::GroupRemove {
                holder: self.object_name.clone(),
                group,
                server: node.server().map(str::to_string),
                world: node.world().map(str::to_string),
                temporary: node.is_temporary(),
            });
        } else {
            self.events.emit(Event::PermissionNodeUnset {
                holder: self.object_name.clone(),
                node,
            });
        }
    }
}

/// Current unix time in seconds. A clock before the epoch reads as zero.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
