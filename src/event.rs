// SPDX-License-Identifier: MIT OR Apache-2.0

//! Holder lifecycle events.
//!
//! Mutations on a holder emit events describing what changed. Emission is fire-and-forget: the
//! sink must never block the mutating thread and delivery failures never propagate. Ordering is
//! only guaranteed relative to the mutation on the same thread; no cross-holder ordering exists.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::node::Node;
use crate::traits::EventSink;

/// An event describing a mutation of a holder's node sets.
///
/// `holder` is the object name of the holder the mutation happened on.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Event {
    /// A node was added to a holder.
    PermissionNodeSet { holder: String, node: Node },

    /// A node was removed from a holder.
    PermissionNodeUnset { holder: String, node: Node },

    /// A temporary node was removed by the expiry auditor.
    PermissionNodeExpire { holder: String, node: Node },

    /// A group membership node was removed from a holder.
    GroupRemove {
        holder: String,
        group: String,
        server: Option<String>,
        world: Option<String>,
        temporary: bool,
    },
}

/// An [`EventSink`] which forwards events into an unbounded tokio channel.
///
/// The send never blocks; once the receiving half is dropped, further events are discarded.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    /// Create a sink and the receiver draining it.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

/// An [`EventSink`] which discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}
