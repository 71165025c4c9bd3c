use std::marker::PhantomData;

use tracing::debug;
use vertex_storage::{KvStore, Transaction};
use vertex_swarm_primitives::{Chunk, ChunkAddress};

use crate::mode::{self, GetMode, ModeKind, PutMode, Removal};
use crate::{IndexItem, LocalStore, LocalStoreResult, Mode};

/// Performs store calls in mode `M`.
///
/// Every call runs in a single write transaction and reads the clock once
/// inside it. The reads that decide which keys change commit together with
/// the changes, or nothing is written.
#[derive(Debug)]
pub struct Accessor<'a, S, M> {
    db: &'a LocalStore<S>,
    _mode: PhantomData<M>,
}

impl<'a, S, M> Accessor<'a, S, M>
where
    S: KvStore + 'static,
    M: ModeKind,
{
    pub(crate) const fn new(db: &'a LocalStore<S>) -> Self {
        Self {
            db,
            _mode: PhantomData,
        }
    }

    /// The mode calls are made in.
    pub const fn mode(&self) -> Mode {
        M::MODE
    }

    fn run<T, F>(&self, address: &ChunkAddress, f: F) -> LocalStoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>, i64) -> LocalStoreResult<T>,
    {
        let mut now = 0;
        // taken under the writer: commit order follows timestamp order
        let result = self.db.store.update(|tx| {
            now = self.db.clock.now();
            f(tx, now)
        });

        self.db.metrics.mode(M::MODE).record(&result);
        match &result {
            Ok(_) => debug!(%address, mode = %M::MODE, now, "Committed"),
            Err(err) => debug!(%address, mode = %M::MODE, %err, "Rolled back"),
        }
        result
    }
}

impl<S, M> Accessor<'_, S, M>
where
    S: KvStore + 'static,
    M: PutMode,
{
    /// Apply the index updates of the mode for `chunk`.
    pub fn put(&self, chunk: &Chunk) -> LocalStoreResult<()> {
        self.run(chunk.address(), |tx, now| M::apply(self.db, tx, chunk, now))
    }
}

impl<S, M> Accessor<'_, S, M>
where
    S: KvStore + 'static,
    M: GetMode,
{
    /// Read the chunk at `address`, applying the index updates of the mode.
    pub fn get(&self, address: &ChunkAddress) -> LocalStoreResult<Chunk> {
        self.run(address, |tx, now| M::apply(self.db, tx, address, now))
    }
}

impl<S: KvStore + 'static> Accessor<'_, S, Removal> {
    /// Removes the chunk at `address`; the same as [`Accessor::put`] without
    /// needing the payload.
    pub fn remove(&self, address: &ChunkAddress) -> LocalStoreResult<()> {
        self.run(address, |tx, _| mode::remove(self.db, tx, address))
            .map(drop)
    }

    /// Evicts the chunk behind the gc entry `entry` and drops the entry,
    /// returning whether a chunk was removed.
    pub(crate) fn evict(&self, entry: &IndexItem) -> LocalStoreResult<bool> {
        self.run(&entry.address, |tx, _| mode::evict(self.db, tx, entry))
    }
}
