//! Concurrent keyed store of temporal state.
//!
//! The map of pattern id → entry sits behind a `RwLock`; each entry guards
//! its own state with a `Mutex`. Deliveries take the map lock shared and the
//! entry lock exclusively, so read-modify-write cycles on one pattern are
//! serialized while different patterns proceed in parallel. Creating and
//! removing entries takes the map lock exclusively.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::{Mutex, RwLock};
use rtempo_spec::PatternKind;

use crate::compiler::CompiledPattern;
use crate::error::{EvalError, Result};
use crate::state::TemporalState;

/// One pattern's immutable compiled form plus its mutable state.
#[derive(Debug)]
struct StoreEntry {
    pattern: CompiledPattern,
    state: Mutex<TemporalState>,
}

/// Keyed store mapping pattern id to temporal state.
#[derive(Debug, Default)]
pub struct TemporalStateStore {
    entries: RwLock<HashMap<String, StoreEntry>>,
}

impl TemporalStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a default-initialized state for a compiled pattern.
    ///
    /// Fails with [`EvalError::AlreadyExists`] if the id is taken; the
    /// existing entry is left untouched.
    pub fn create(&self, id: &str, pattern: CompiledPattern) -> Result<()> {
        self.create_with(id, pattern, || {})
    }

    /// Like [`create`](Self::create), running `on_created` after the insert
    /// and before the map lock is released.
    ///
    /// Nothing else can observe the store between the insert and the hook.
    /// The hook must not call back into this store.
    pub fn create_with(
        &self,
        id: &str,
        pattern: CompiledPattern,
        on_created: impl FnOnce(),
    ) -> Result<()> {
        let mut entries = self.entries.write();
        match entries.entry(id.to_string()) {
            Entry::Occupied(_) => Err(EvalError::AlreadyExists(id.to_string())),
            Entry::Vacant(slot) => {
                let state = TemporalState::new_for(&pattern);
                slot.insert(StoreEntry {
                    pattern,
                    state: Mutex::new(state),
                });
                on_created();
                Ok(())
            }
        }
    }

    /// Snapshot of a pattern's current state.
    pub fn get(&self, id: &str) -> Option<TemporalState> {
        let entries = self.entries.read();
        entries.get(id).map(|e| e.state.lock().clone())
    }

    /// Replace a pattern's state.
    ///
    /// The id must exist and the state must be of the pattern's kind.
    pub fn put(&self, id: &str, state: TemporalState) -> Result<()> {
        let entries = self.entries.read();
        let entry = entries
            .get(id)
            .ok_or_else(|| EvalError::PatternNotFound(id.to_string()))?;
        if entry.pattern.kind() != state.kind() {
            return Err(EvalError::StateMismatch(id.to_string()));
        }
        *entry.state.lock() = state;
        Ok(())
    }

    /// Remove a pattern's entry. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.remove_with(id, |_| {})
    }

    /// Like [`remove`](Self::remove), running `on_removed` with the result
    /// before the map lock is released. The hook must not call back into
    /// this store.
    pub fn remove_with(&self, id: &str, on_removed: impl FnOnce(bool)) -> bool {
        let mut entries = self.entries.write();
        let removed = entries.remove(id).is_some();
        on_removed(removed);
        removed
    }

    /// Run a read-modify-write cycle on one pattern's state.
    ///
    /// The closure runs while holding that pattern's lock, so concurrent
    /// updates to the same id are applied one after another. Returns `None`
    /// if the id has no entry.
    pub fn update<R>(
        &self,
        id: &str,
        f: impl FnOnce(&CompiledPattern, &mut TemporalState) -> R,
    ) -> Option<R> {
        let entries = self.entries.read();
        let entry = entries.get(id)?;
        let mut state = entry.state.lock();
        Some(f(&entry.pattern, &mut state))
    }

    /// Read a pattern's state without modifying it.
    pub fn inspect<R>(
        &self,
        id: &str,
        f: impl FnOnce(&CompiledPattern, &TemporalState) -> R,
    ) -> Option<R> {
        let entries = self.entries.read();
        let entry = entries.get(id)?;
        let state = entry.state.lock();
        Some(f(&entry.pattern, &state))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn kind(&self, id: &str) -> Option<PatternKind> {
        self.entries.read().get(id).map(|e| e.pattern.kind())
    }

    /// All pattern ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
