//! In-memory backend.

use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};

use parking_lot::RwLock;

use crate::{Batch, DatabaseError, KvRead, KvStore, Transaction};

/// Entries copied out per lock acquisition while iterating.
const PAGE_SIZE: usize = 256;

/// A [`KvStore`] over a `BTreeMap`, for tests and ephemeral nodes.
///
/// Transactions hold the write lock from the first read until commit.
/// Iteration copies entries out a page at a time and calls back without
/// holding the lock, so callbacks may read and write the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all tables.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn apply(entries: &mut BTreeMap<Vec<u8>, Vec<u8>>, batch: Batch) {
    for (key, value) in batch.iter() {
        match value {
            Some(value) => {
                entries.insert(key.to_vec(), value.to_vec());
            }
            None => {
                entries.remove(key);
            }
        }
    }
}

impl KvRead for MemoryStore {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        Ok(self.entries.read().get(key).cloned())
    }
}

impl KvStore for MemoryStore {
    fn iterate_from(
        &self,
        start: &[u8],
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>, DatabaseError>,
    ) -> Result<(), DatabaseError> {
        let mut from = Bound::Included(start.to_vec());
        loop {
            let page: Vec<(Vec<u8>, Vec<u8>)> = self
                .entries
                .read()
                .range::<Vec<u8>, _>((from, Bound::Unbounded))
                .take(PAGE_SIZE)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let exhausted = page.len() < PAGE_SIZE;

            for (key, value) in &page {
                if f(key, value)?.is_break() {
                    return Ok(());
                }
            }

            match page.into_iter().next_back() {
                Some((last, _)) if !exhausted => from = Bound::Excluded(last),
                _ => return Ok(()),
            }
        }
    }

    fn write(&self, batch: Batch) -> Result<(), DatabaseError> {
        apply(&mut self.entries.write(), batch);
        Ok(())
    }

    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let mut entries = self.entries.write();
        let (out, batch) = {
            let mut tx = Transaction::new(&*entries);
            let out = f(&mut tx)?;
            (out, tx.into_batch())
        };
        apply(&mut entries, batch);
        Ok(out)
    }
}
