//! Membership set of compiled pattern ids.
//!
//! Pattern compilation registers an id; clearing unregisters it. The
//! registry is an explicit service so that each engine (and each test) can
//! own an isolated instance or share one through an `Arc`.

use std::collections::BTreeSet;

use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct PatternRegistry {
    ids: RwLock<BTreeSet<String>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id. Returns `false` if it was already registered.
    pub fn register(&self, id: &str) -> bool {
        self.ids.write().insert(id.to_string())
    }

    /// Remove an id. Returns `false` if it was not registered.
    pub fn unregister(&self, id: &str) -> bool {
        self.ids.write().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.read().contains(id)
    }

    /// Registered ids in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.ids.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }
}
