//! Retrieval layouts.
//!
//! A store keeps chunk payloads and timestamps either in one composite record
//! per chunk or split over a payload record and an access record. The layout
//! is chosen when the store is created and never changes afterwards.

use std::fmt;
use std::sync::Arc;

use vertex_storage::{KvRead, KvStore, Transaction};
use vertex_swarm_primitives::ChunkAddress;

use crate::index::{Index, Indexes};
use crate::tables::{Retrieval, RetrievalAccess, RetrievalData};
use crate::{IndexItem, LocalStoreError, LocalStoreResult};

/// Which retrieval layout a store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum LayoutKind {
    /// Payload and store time in one record, access time in another.
    Split,
    /// Payload and both timestamps in one record.
    Composite,
}

impl LayoutKind {
    /// Layout selected by the composite-index flag.
    pub const fn from_flag(use_composite: bool) -> Self {
        if use_composite { Self::Composite } else { Self::Split }
    }

    /// Value persisted in the layout marker.
    pub const fn marker(self) -> u64 {
        match self {
            Self::Split => 0,
            Self::Composite => 1,
        }
    }

    /// Layout of a persisted marker value.
    pub fn from_marker(marker: u64) -> LocalStoreResult<Self> {
        match marker {
            0 => Ok(Self::Split),
            1 => Ok(Self::Composite),
            other => Err(LocalStoreError::InvalidState(format!(
                "unknown retrieval layout marker {other}"
            ))),
        }
    }
}

/// Access to the retrieval record of a chunk, whichever layout holds it.
pub trait RetrievalLayout: Send + Sync + fmt::Debug {
    /// The layout implemented.
    fn kind(&self) -> LayoutKind;

    /// Payload and timestamps of `address` as seen by `reader`.
    fn get(
        &self,
        reader: &dyn KvRead,
        address: &ChunkAddress,
    ) -> LocalStoreResult<Option<IndexItem>>;

    /// Stage the payload and store time of `item`. The composite record
    /// takes the access time along; the split layout leaves it to
    /// [`RetrievalLayout::set_access`].
    fn put(&self, tx: &mut Transaction<'_>, item: &IndexItem);

    /// Stage the access time of `item`, a record previously returned by
    /// [`RetrievalLayout::get`].
    fn set_access(&self, tx: &mut Transaction<'_>, item: &IndexItem);

    /// Stage removal of every record of `item`.
    fn delete(&self, tx: &mut Transaction<'_>, item: &IndexItem);

    /// Number of chunks held.
    fn count(&self) -> LocalStoreResult<u64>;
}

/// Builds the layout `kind` over `indexes`.
pub(crate) fn layout<S: KvStore + 'static>(
    kind: LayoutKind,
    indexes: &Indexes<S>,
) -> Arc<dyn RetrievalLayout> {
    match kind {
        LayoutKind::Composite => Arc::new(Composite {
            index: indexes.retrieval_composite.clone(),
        }),
        LayoutKind::Split => Arc::new(Split {
            data: indexes.retrieval_data.clone(),
            access: indexes.retrieval_access.clone(),
        }),
    }
}

/// One record per chunk.
pub struct Composite<S> {
    index: Index<S, Retrieval>,
}

impl<S: KvStore> RetrievalLayout for Composite<S> {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Composite
    }

    fn get(
        &self,
        reader: &dyn KvRead,
        address: &ChunkAddress,
    ) -> LocalStoreResult<Option<IndexItem>> {
        self.index.get_in(reader, &IndexItem::from_address(*address))
    }

    fn put(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        self.index.put(tx, item);
    }

    fn set_access(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        // the record carries the payload, so it is rewritten whole
        self.index.put(tx, item);
    }

    fn delete(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        self.index.delete(tx, item);
    }

    fn count(&self) -> LocalStoreResult<u64> {
        self.index.count()
    }
}

impl<S> fmt::Debug for Composite<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite").finish_non_exhaustive()
    }
}

/// Payload record plus access record.
///
/// A chunk that was never accessed has no access record and reads back with
/// an access time of zero.
pub struct Split<S> {
    data: Index<S, RetrievalData>,
    access: Index<S, RetrievalAccess>,
}

impl<S: KvStore> RetrievalLayout for Split<S> {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Split
    }

    fn get(
        &self,
        reader: &dyn KvRead,
        address: &ChunkAddress,
    ) -> LocalStoreResult<Option<IndexItem>> {
        let key = IndexItem::from_address(*address);
        let Some(item) = self.data.get_in(reader, &key)? else {
            return Ok(None);
        };
        let access_timestamp = self
            .access
            .get_in(reader, &key)?
            .map_or(0, |access| access.access_timestamp);
        Ok(Some(item.with_access_timestamp(access_timestamp)))
    }

    fn put(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        self.data.put(tx, item);
    }

    fn set_access(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        self.access.put(tx, item);
    }

    fn delete(&self, tx: &mut Transaction<'_>, item: &IndexItem) {
        self.data.delete(tx, item);
        self.access.delete(tx, item);
    }

    fn count(&self) -> LocalStoreResult<u64> {
        self.data.count()
    }
}

impl<S> fmt::Debug for Split<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Split").finish_non_exhaustive()
    }
}
