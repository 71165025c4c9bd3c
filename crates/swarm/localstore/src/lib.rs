//! Swarm local chunk store.
//!
//! Every chunk a node holds is recorded across a set of ordered indexes, each
//! answering one query without scanning the others:
//!
//! - retrieval: payload and timestamps by address, in one of two
//!   [layouts](LayoutKind)
//! - pull: chunks nearest the base address first, then by store time, for
//!   pull sync
//! - push: locally uploaded chunks awaiting push confirmation
//! - gc: chunks by last access, for eviction
//!
//! Together with a persisted size counter these indexes change only through
//! [`Accessor`]s, one per [`Mode`]. Each accessor call commits one atomic
//! transaction.
//!
//! ```ignore
//! let db = LocalStore::open(RedbStore::open(path)?, base, Options::default())?;
//! db.accessor::<Upload>().put(&chunk)?;
//! db.accessor::<Synced>().put(&chunk)?;
//! let chunk = db.accessor::<Access>().get(chunk.address())?;
//! ```

mod accessor;
mod args;
mod clock;
mod counter;
mod error;
mod gc;
mod index;
mod item;
mod metrics;
mod mode;
mod retrieval;
mod store;
pub mod tables;

pub use accessor::Accessor;
pub use args::{LocalStoreArgs, LocalStoreConfig};
pub use clock::{FixedClock, SystemClock, TimeSource};
pub use counter::SizeCounter;
pub use error::{LocalStoreError, LocalStoreResult};
pub use gc::GcReport;
pub use index::{Index, Indexes};
pub use item::IndexItem;
pub use mode::{Access, GetMode, Mode, ModeKind, PutMode, Removal, Request, Synced, Syncing, Upload};
pub use retrieval::{Composite, LayoutKind, RetrievalLayout, Split};
pub use store::{IndexCounts, LocalStore, Options};

/// Default capacity in chunks.
pub const DEFAULT_CAPACITY: u64 = 5_000_000;

/// Default number of gc entries read per collection pass.
pub const DEFAULT_GC_BATCH_SIZE: usize = 1_000;
