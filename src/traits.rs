// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams for injected collaborators.

use std::sync::Arc;

use crate::event::Event;
use crate::holder::PermissionHolder;

/// Resolves group names to holders during inheritance traversal.
///
/// Groups are referenced by name, not by pointer; this lookup is the indirection that makes
/// cyclic inheritance graphs representable. An unknown name yields `None` and is skipped
/// silently by the resolver — groups may be removed concurrently with holders still referencing
/// them, so a miss is not an error.
pub trait GroupLookup {
    fn group(&self, name: &str) -> Option<Arc<PermissionHolder>>;
}

/// A lookup that knows no groups. Resolution over it never follows inheritance edges.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGroups;

impl GroupLookup for NoGroups {
    fn group(&self, _name: &str) -> Option<Arc<PermissionHolder>> {
        None
    }
}

/// Receives holder lifecycle events.
///
/// Implementations must not block: `emit` is called from inside mutation paths and the caller
/// does not await delivery. Failures must be swallowed, not propagated.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}
