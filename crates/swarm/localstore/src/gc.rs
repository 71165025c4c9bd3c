//! Garbage collection.
//!
//! Eviction walks the gc index from its start, which holds the least
//! recently accessed chunks, and removes them one transaction at a time until
//! the size counter is at the target. Chunks that were never accessed, synced
//! or requested have no gc entry and are never evicted. Every pass drops the
//! gc entries it reads, including entries whose chunk is gone.

use tracing::{debug, trace};
use vertex_storage::KvStore;

use crate::mode::Removal;
use crate::{LocalStore, LocalStoreResult};

/// Outcome of a garbage collection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Chunks removed.
    pub evicted: u64,
    /// Size counter after the run.
    pub size: u64,
}

impl<S: KvStore + 'static> LocalStore<S> {
    /// Evict least recently accessed chunks while the size counter is above
    /// `target`.
    ///
    /// Stops early once the gc index is exhausted, so the reported size may
    /// stay above the target.
    pub fn collect_garbage(&self, target: u64) -> LocalStoreResult<GcReport> {
        let removal = self.accessor::<Removal>();
        let batch_size = self.options.gc_batch_size.max(1);
        let mut report = GcReport {
            evicted: 0,
            size: self.counter.get()?,
        };

        'passes: while report.size > target {
            let batch = self.indexes.gc.first(batch_size)?;
            if batch.is_empty() {
                break;
            }
            trace!(candidates = batch.len(), size = report.size, target, "Garbage collection pass");

            for item in batch {
                if report.size <= target {
                    break 'passes;
                }
                if removal.evict(&item)? {
                    report.evicted += 1;
                }
                report.size = self.counter.get()?;
            }
        }

        self.metrics.record_gc(report.evicted);
        self.metrics.set_size(report.size);
        debug!(evicted = report.evicted, size = report.size, target, "Garbage collection finished");
        Ok(report)
    }

    /// [`collect_garbage`](Self::collect_garbage) down to the configured
    /// capacity.
    pub fn collect_garbage_to_capacity(&self) -> LocalStoreResult<GcReport> {
        self.collect_garbage(self.options.capacity)
    }
}
