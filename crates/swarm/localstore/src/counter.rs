use std::sync::Arc;

use tracing::trace;
use vertex_storage::{KvRead, KvReadExt, KvStore, Transaction};

use crate::tables::{Meta, MetaKey};
use crate::{LocalStoreError, LocalStoreResult};

/// Persisted number of counted chunks.
///
/// The counter only changes inside the transaction of the mode call it
/// accompanies; it is never written on its own.
pub struct SizeCounter<S> {
    store: Arc<S>,
}

impl<S: KvStore> SizeCounter<S> {
    pub(crate) fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Committed value.
    pub fn get(&self) -> LocalStoreResult<u64> {
        Self::get_in(&*self.store)
    }

    /// Value as seen by `reader`; a store that never counted anything is at zero.
    pub fn get_in(reader: &dyn KvRead) -> LocalStoreResult<u64> {
        Ok(reader.get_value::<Meta>(MetaKey::Size)?.unwrap_or_default())
    }

    /// Stage `value + delta`, failing if the result leaves the `u64` range.
    pub fn add(&self, tx: &mut Transaction<'_>, delta: i64) -> LocalStoreResult<u64> {
        let current = Self::get_in(&*tx)?;
        let next = current.checked_add_signed(delta).ok_or_else(|| {
            LocalStoreError::InvalidState(format!("size counter {current} cannot change by {delta}"))
        })?;
        tx.put::<Meta>(MetaKey::Size, &next);
        trace!(current, next, "Staged size counter");
        Ok(next)
    }
}

impl<S> Clone for SizeCounter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> std::fmt::Debug for SizeCounter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeCounter").finish_non_exhaustive()
    }
}
