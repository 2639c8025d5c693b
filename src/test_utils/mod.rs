// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for testing permission resolution.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::event::Event;
use crate::holder::PermissionHolder;
use crate::node::Node;
use crate::traits::{EventSink, GroupLookup};

const LOCK_POISONED: &str = "test lock poisoned";

/// In-memory group lookup over a name-keyed holder map.
#[derive(Debug, Default)]
pub struct TestGroupLookup {
    groups: Mutex<HashMap<String, Arc<PermissionHolder>>>,
}

impl TestGroupLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a holder under its (lowercased) object name.
    pub fn insert(&self, holder: Arc<PermissionHolder>) {
        self.groups
            .lock()
            .expect(LOCK_POISONED)
            .insert(holder.object_name().to_lowercase(), holder);
    }

    pub fn remove(&self, name: &str) {
        self.groups
            .lock()
            .expect(LOCK_POISONED)
            .remove(&name.to_lowercase());
    }
}

impl GroupLookup for TestGroupLookup {
    fn group(&self, name: &str) -> Option<Arc<PermissionHolder>> {
        self.groups
            .lock()
            .expect(LOCK_POISONED)
            .get(&name.to_lowercase())
            .cloned()
    }
}

/// An [`EventSink`] which records every event for later assertions.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All events emitted so far, in emission order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect(LOCK_POISONED).clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut self.events.lock().expect(LOCK_POISONED))
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: Event) {
        self.events.lock().expect(LOCK_POISONED).push(event);
    }
}

/// A grant node for membership of the given group.
pub fn group_node(group: &str) -> Node {
    Node::builder(format!("group.{group}")).build()
}

/// Install a tracing subscriber honouring `RUST_LOG` for the duration of the test run.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
