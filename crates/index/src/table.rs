//! One LSH hash table: a signature function plus its buckets.
//!
//! Buckets live in an arena addressed by integer ids and hold [`EntryId`]
//! handles into the vector store. A per-entry position map makes removal a
//! constant-time swap-remove.

use crate::hash::{Signature, TableHasher};
use crate::store::EntryId;
use quiver_core::Vector;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BucketId(u32);

#[derive(Debug, Clone, Default)]
struct Bucket {
    members: Vec<EntryId>,
}

/// Occupancy statistics of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    pub buckets: usize,
    pub entries: usize,
    pub largest_bucket: usize,
}

/// A hash table owning one `k`-function signature generator.
#[derive(Debug, Clone)]
pub struct HashTable {
    hasher: TableHasher,
    directory: HashMap<Signature, BucketId>,
    buckets: Vec<Bucket>,
    free_buckets: Vec<BucketId>,
    /// entry -> (bucket, position inside the bucket)
    positions: HashMap<EntryId, (BucketId, usize)>,
}

impl HashTable {
    pub fn new(hasher: TableHasher) -> Self {
        Self {
            hasher,
            directory: HashMap::new(),
            buckets: Vec::new(),
            free_buckets: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Signature of `vector` in this table.
    pub fn signature(&self, vector: &Vector) -> Signature {
        self.hasher.signature(vector)
    }

    /// Add `entry` to the bucket for `signature`.
    ///
    /// Returns `false` if the entry is already present in this table.
    pub fn insert(&mut self, entry: EntryId, signature: &Signature) -> bool {
        if self.positions.contains_key(&entry) {
            return false;
        }
        let bucket_id = match self.directory.get(signature) {
            Some(&id) => id,
            None => {
                let id = self.allocate_bucket();
                self.directory.insert(signature.clone(), id);
                id
            }
        };
        let members = &mut self.buckets[bucket_id.0 as usize].members;
        members.push(entry);
        self.positions.insert(entry, (bucket_id, members.len() - 1));
        true
    }

    /// Remove `entry` from the bucket for `signature`, dropping the bucket
    /// once it is empty.
    ///
    /// Returns `false` if the entry is not stored under that signature.
    pub fn remove(&mut self, entry: EntryId, signature: &Signature) -> bool {
        let Some(&bucket_id) = self.directory.get(signature) else {
            return false;
        };
        match self.positions.get(&entry) {
            Some(&(id, _)) if id == bucket_id => {}
            _ => return false,
        }
        let Some((_, position)) = self.positions.remove(&entry) else {
            return false;
        };

        let members = &mut self.buckets[bucket_id.0 as usize].members;
        members.swap_remove(position);
        if let Some(&moved) = members.get(position) {
            self.positions.insert(moved, (bucket_id, position));
        }

        if members.is_empty() {
            self.directory.remove(signature);
            self.free_buckets.push(bucket_id);
        }
        true
    }

    /// Entries sharing exactly `signature`.
    pub fn candidates(&self, signature: &Signature) -> &[EntryId] {
        self.directory
            .get(signature)
            .map(|id| self.buckets[id.0 as usize].members.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, entry: EntryId) -> bool {
        self.positions.contains_key(&entry)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.directory.len()
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            buckets: self.directory.len(),
            entries: self.positions.len(),
            largest_bucket: self
                .directory
                .values()
                .map(|id| self.buckets[id.0 as usize].members.len())
                .max()
                .unwrap_or(0),
        }
    }

    fn allocate_bucket(&mut self) -> BucketId {
        if let Some(id) = self.free_buckets.pop() {
            return id;
        }
        self.buckets.push(Bucket::default());
        BucketId((self.buckets.len() - 1) as u32)
    }
}
