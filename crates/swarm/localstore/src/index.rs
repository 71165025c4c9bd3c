//! Typed handles over the index tables.

use std::fmt;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::sync::Arc;

use vertex_storage::{KvRead, KvReadExt, KvStore, Transaction};
use vertex_swarm_primitives::ChunkAddress;

use crate::tables::{Gc, ItemTable, Pull, Push, Retrieval, RetrievalAccess, RetrievalData};
use crate::{IndexItem, LocalStoreError, LocalStoreResult};

/// One index of the store: table `T` seen through [`IndexItem`]s.
///
/// Reads through the handle see committed state. Reads and writes that must
/// be atomic with other index updates go through a [`Transaction`] instead.
pub struct Index<S, T> {
    store: Arc<S>,
    base: ChunkAddress,
    _table: PhantomData<T>,
}

impl<S, T> Index<S, T>
where
    S: KvStore,
    T: ItemTable,
{
    pub(crate) fn new(store: Arc<S>, base: ChunkAddress) -> Self {
        Self {
            store,
            base,
            _table: PhantomData,
        }
    }

    /// Name of the underlying table.
    pub const fn name(&self) -> &'static str {
        T::NAME
    }

    /// The entry keyed by `item`, failing with
    /// [`NotFound`](LocalStoreError::NotFound) if there is none.
    pub fn get(&self, item: &IndexItem) -> LocalStoreResult<IndexItem> {
        self.get_in(&*self.store, item)?
            .ok_or_else(|| LocalStoreError::not_found(T::NAME, item.address))
    }

    /// Whether an entry keyed by `item` exists.
    pub fn has(&self, item: &IndexItem) -> LocalStoreResult<bool> {
        self.has_in(&*self.store, item)
    }

    /// The entry keyed by `item` as seen by `reader`.
    pub fn get_in(
        &self,
        reader: &dyn KvRead,
        item: &IndexItem,
    ) -> LocalStoreResult<Option<IndexItem>> {
        let key = T::key(&self.base, item);
        let value = reader.get_value::<T>(key.clone())?;
        Ok(value.map(|value| T::item(key, value)))
    }

    /// Whether `reader` sees an entry keyed by `item`.
    pub fn has_in(&self, reader: &dyn KvRead, item: &IndexItem) -> LocalStoreResult<bool> {
        let key = T::key(&self.base, item);
        Ok(reader.get_value::<T>(key)?.is_some())
    }

    /// Stage an upsert of `item`.
    pub fn put(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        tx.put::<T>(T::key(&self.base, item), &T::value(item));
    }

    /// Stage removal of the entry keyed by `item`. Absent entries are fine.
    pub fn delete(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        tx.delete::<T>(T::key(&self.base, item));
    }

    /// Visit every entry in key order until `f` breaks.
    pub fn iterate_all<F>(&self, f: F) -> LocalStoreResult<()>
    where
        F: FnMut(IndexItem) -> LocalStoreResult<ControlFlow<()>>,
    {
        self.iterate(None, f)
    }

    /// Visit entries in key order, starting at the key of `start`.
    pub fn iterate_from<F>(&self, start: &IndexItem, f: F) -> LocalStoreResult<()>
    where
        F: FnMut(IndexItem) -> LocalStoreResult<ControlFlow<()>>,
    {
        self.iterate(Some(T::key(&self.base, start)), f)
    }

    fn iterate<F>(&self, start: Option<T::Key>, mut f: F) -> LocalStoreResult<()>
    where
        F: FnMut(IndexItem) -> LocalStoreResult<ControlFlow<()>>,
    {
        self.store
            .iterate_table::<T, LocalStoreError, _>(start, |key, value| f(T::item(key, value)))
    }

    /// Up to `limit` entries from the start of the index.
    pub fn first(&self, limit: usize) -> LocalStoreResult<Vec<IndexItem>> {
        let mut items = Vec::new();
        if limit == 0 {
            return Ok(items);
        }
        self.iterate_all(|item| {
            items.push(item);
            Ok(if items.len() < limit {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            })
        })?;
        Ok(items)
    }

    /// Number of entries. Walks the whole index.
    pub fn count(&self) -> LocalStoreResult<u64> {
        let mut count = 0u64;
        self.iterate_all(|_| {
            count += 1;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(count)
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> LocalStoreResult<bool> {
        Ok(self.first(1)?.is_empty())
    }
}

impl<S, T> Clone for Index<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            base: self.base,
            _table: PhantomData,
        }
    }
}

impl<S, T: ItemTable> fmt::Debug for Index<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index").field("table", &T::NAME).finish_non_exhaustive()
    }
}

/// Every index of a store.
///
/// Only the retrieval tables of the store's layout are populated; the
/// handles of the other layout stay empty.
#[derive(Debug)]
pub struct Indexes<S> {
    /// Composite retrieval layout.
    pub retrieval_composite: Index<S, Retrieval>,
    /// Split retrieval layout, payload and store time.
    pub retrieval_data: Index<S, RetrievalData>,
    /// Split retrieval layout, access time.
    pub retrieval_access: Index<S, RetrievalAccess>,
    /// Pull sync order.
    pub pull: Index<S, Pull>,
    /// Chunks awaiting push confirmation.
    pub push: Index<S, Push>,
    /// Eviction order.
    pub gc: Index<S, Gc>,
}

impl<S: KvStore> Indexes<S> {
    pub(crate) fn new(store: &Arc<S>, base: ChunkAddress) -> Self {
        Self {
            retrieval_composite: Index::new(Arc::clone(store), base),
            retrieval_data: Index::new(Arc::clone(store), base),
            retrieval_access: Index::new(Arc::clone(store), base),
            pull: Index::new(Arc::clone(store), base),
            push: Index::new(Arc::clone(store), base),
            gc: Index::new(Arc::clone(store), base),
        }
    }
}

impl<S> Clone for Indexes<S> {
    fn clone(&self) -> Self {
        Self {
            retrieval_composite: self.retrieval_composite.clone(),
            retrieval_data: self.retrieval_data.clone(),
            retrieval_access: self.retrieval_access.clone(),
            pull: self.pull.clone(),
            push: self.push.clone(),
            gc: self.gc.clone(),
        }
    }
}
