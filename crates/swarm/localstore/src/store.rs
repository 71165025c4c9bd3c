use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::debug;
use vertex_storage::{KvReadExt, KvStore};
use vertex_swarm_primitives::ChunkAddress;

use crate::clock::{SystemClock, TimeSource};
use crate::counter::SizeCounter;
use crate::index::Indexes;
use crate::metrics::LocalStoreMetrics;
use crate::mode::ModeKind;
use crate::retrieval::{self, LayoutKind, RetrievalLayout};
use crate::tables::{AddressValue, Base, Meta, MetaKey};
use crate::{
    Accessor, DEFAULT_CAPACITY, DEFAULT_GC_BATCH_SIZE, IndexItem, LocalStoreConfig,
    LocalStoreError, LocalStoreResult,
};

/// Settings fixed when a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Keep payload and timestamps in one retrieval record instead of two.
    /// Must match the layout the store was created with.
    pub use_retrieval_composite_index: bool,
    /// Number of counted chunks garbage collection shrinks the store to.
    pub capacity: u64,
    /// Gc entries read per collection pass.
    pub gc_batch_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            use_retrieval_composite_index: false,
            capacity: DEFAULT_CAPACITY,
            gc_batch_size: DEFAULT_GC_BATCH_SIZE,
        }
    }
}

impl Options {
    /// Options from any local store configuration source.
    pub fn from_config(config: &impl LocalStoreConfig) -> Self {
        Self {
            use_retrieval_composite_index: config.use_retrieval_composite_index(),
            capacity: config.capacity(),
            gc_batch_size: config.gc_batch_size(),
        }
    }
}

/// Entry counts of every index of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCounts {
    /// Chunks in the retrieval layout.
    pub retrieval: u64,
    /// Entries in the pull index.
    pub pull: u64,
    /// Entries in the push index.
    pub push: u64,
    /// Entries in the gc index.
    pub gc: u64,
}

/// The local chunk store.
///
/// Owns the indexes over a [`KvStore`] and hands out [`Accessor`]s, which
/// perform every change to them. Safe to share between threads.
pub struct LocalStore<S> {
    pub(crate) store: Arc<S>,
    base: ChunkAddress,
    pub(crate) indexes: Indexes<S>,
    pub(crate) layout: Arc<dyn RetrievalLayout>,
    pub(crate) counter: SizeCounter<S>,
    pub(crate) clock: Arc<dyn TimeSource>,
    pub(crate) options: Options,
    pub(crate) metrics: LocalStoreMetrics,
}

impl<S: KvStore + 'static> LocalStore<S> {
    /// Open a store on the wall clock.
    pub fn open(store: S, base: ChunkAddress, options: Options) -> LocalStoreResult<Self> {
        Self::open_with_clock(store, base, options, Arc::new(SystemClock::new()))
    }

    /// Open a store reading time from `clock`.
    ///
    /// The first open records the base address and the retrieval layout.
    /// Later opens must agree with both.
    pub fn open_with_clock(
        store: S,
        base: ChunkAddress,
        options: Options,
        clock: Arc<dyn TimeSource>,
    ) -> LocalStoreResult<Self> {
        let store = Arc::new(store);
        let kind = LayoutKind::from_flag(options.use_retrieval_composite_index);
        let indexes = Indexes::new(&store, base);

        let stored_layout = Self::stored_layout(&store)?;
        match stored_layout {
            Some(stored) if stored != kind => {
                return Err(LocalStoreError::InvalidState(format!(
                    "store uses the {stored} retrieval layout, {kind} requested"
                )));
            }
            Some(_) => {}
            None => {
                let other_populated = match kind {
                    LayoutKind::Composite => {
                        !indexes.retrieval_data.is_empty()? || !indexes.retrieval_access.is_empty()?
                    }
                    LayoutKind::Split => !indexes.retrieval_composite.is_empty()?,
                };
                if other_populated {
                    return Err(LocalStoreError::InvalidState(format!(
                        "store holds chunks outside the {kind} retrieval layout"
                    )));
                }
            }
        }

        let stored_base = Self::stored_base(&store)?;
        if let Some(stored) = stored_base.filter(|stored| *stored != base) {
            return Err(LocalStoreError::InvalidState(format!(
                "store was created with base {stored}, opened with {base}"
            )));
        }

        if stored_layout.is_none() || stored_base.is_none() {
            store.update(|tx| {
                tx.put::<Meta>(MetaKey::Layout, &kind.marker());
                tx.put::<Base>((), &AddressValue(base));
                LocalStoreResult::Ok(())
            })?;
            debug!(%base, layout = %kind, "Initialized local store");
        }

        let db = Self {
            layout: retrieval::layout(kind, &indexes),
            counter: SizeCounter::new(Arc::clone(&store)),
            store,
            base,
            indexes,
            clock,
            options,
            metrics: LocalStoreMetrics::default(),
        };
        let size = db.size()?;
        debug!(%base, layout = %kind, size, "Opened local store");
        Ok(db)
    }

    /// Base address recorded by the first open of `store`, if any.
    pub fn stored_base(store: &S) -> LocalStoreResult<Option<ChunkAddress>> {
        Ok(store.get_value::<Base>(())?.map(|AddressValue(base)| base))
    }

    /// Retrieval layout recorded by the first open of `store`, if any.
    pub fn stored_layout(store: &S) -> LocalStoreResult<Option<LayoutKind>> {
        store
            .get_value::<Meta>(MetaKey::Layout)?
            .map(LayoutKind::from_marker)
            .transpose()
    }

    /// An accessor performing calls in mode `M`.
    pub const fn accessor<M: ModeKind>(&self) -> Accessor<'_, S, M> {
        Accessor::new(self)
    }

    /// The address proximity orders are computed against.
    pub const fn base(&self) -> &ChunkAddress {
        &self.base
    }

    /// The retrieval layout in use.
    pub fn layout(&self) -> LayoutKind {
        self.layout.kind()
    }

    /// Options the store was opened with.
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Number of counted chunks.
    pub fn size(&self) -> LocalStoreResult<u64> {
        let size = self.counter.get()?;
        self.metrics.set_size(size);
        Ok(size)
    }

    /// The persisted size counter.
    pub const fn size_counter(&self) -> &SizeCounter<S> {
        &self.counter
    }

    /// Raw index handles, for inspection.
    pub const fn indexes(&self) -> &Indexes<S> {
        &self.indexes
    }

    /// The underlying key-value store.
    pub fn kv(&self) -> &S {
        &self.store
    }

    /// Whether a chunk is stored at `address`. Does not count as an access.
    pub fn has(&self, address: &ChunkAddress) -> LocalStoreResult<bool> {
        Ok(self.layout.get(&*self.store, address)?.is_some())
    }

    /// Visit pull entries nearest bin first, then by store time, until `f`
    /// breaks. Each call starts over from the beginning.
    pub fn iterate_pull<F>(&self, f: F) -> LocalStoreResult<()>
    where
        F: FnMut(IndexItem) -> LocalStoreResult<ControlFlow<()>>,
    {
        self.indexes.pull.iterate_all(f)
    }

    /// Addresses of all pull entries, in pull order.
    pub fn pull_addresses(&self) -> LocalStoreResult<Vec<ChunkAddress>> {
        let mut addresses = Vec::new();
        self.iterate_pull(|item| {
            addresses.push(item.address);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(addresses)
    }

    /// Entry counts of every index. Walks all of them.
    pub fn index_counts(&self) -> LocalStoreResult<IndexCounts> {
        Ok(IndexCounts {
            retrieval: self.layout.count()?,
            pull: self.indexes.pull.count()?,
            push: self.indexes.push.count()?,
            gc: self.indexes.gc.count()?,
        })
    }
}

impl<S> std::fmt::Debug for LocalStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("base", &self.base)
            .field("layout", &self.layout)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
