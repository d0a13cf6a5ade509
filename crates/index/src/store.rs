//! Authoritative key → vector store.
//!
//! Vectors live in a slot arena addressed by [`EntryId`] handles. Hash tables
//! only hold handles, so the store is the single owner of every vector.

use quiver_core::{Vector, VectorKey};
use std::collections::HashMap;
use std::sync::Arc;

/// Handle of a stored vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub u32);

impl EntryId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slot arena of vectors plus the key directory.
#[derive(Debug, Default, Clone)]
pub struct VectorStore {
    slots: Vec<Option<Arc<Vector>>>,
    free: Vec<EntryId>,
    keys: HashMap<VectorKey, EntryId>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the next insert will receive.
    pub fn next_id(&self) -> EntryId {
        self.free
            .last()
            .copied()
            .unwrap_or(EntryId(self.slots.len() as u32))
    }

    /// Store a vector whose key is not present yet.
    pub fn insert(&mut self, vector: Arc<Vector>) -> EntryId {
        debug_assert!(!self.keys.contains_key(vector.key()), "key already stored");
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots.push(None);
                EntryId((self.slots.len() - 1) as u32)
            }
        };
        self.keys.insert(vector.key().clone(), id);
        self.slots[id.index()] = Some(vector);
        id
    }

    /// Remove a vector by key, releasing its slot.
    pub fn remove(&mut self, key: &str) -> Option<(EntryId, Arc<Vector>)> {
        let id = self.keys.remove(key)?;
        let vector = self.slots[id.index()].take()?;
        self.free.push(id);
        Some((id, vector))
    }

    pub fn get(&self, id: EntryId) -> Option<&Arc<Vector>> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn lookup(&self, key: &str) -> Option<(EntryId, &Arc<Vector>)> {
        let id = *self.keys.get(key)?;
        self.get(id).map(|v| (id, v))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Stored vectors in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Arc<Vector>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (EntryId(i as u32), v)))
    }
}
