//! Modes and their index updates.
//!
//! | mode    | retrieval          | pull   | push   | gc      | size |
//! |---------|--------------------|--------|--------|---------|------|
//! | syncing | put if new         | put    |        |         | +1   |
//! | upload  | put if new         | put    | put    |         | +1   |
//! | request | put, access = now  |        |        | put     |      |
//! | synced  | access = now       |        | delete | replace |      |
//! | access  | access = now       |        |        | replace |      |
//! | removal | delete             | delete | delete | delete  | -1   |
//!
//! Size only counts chunks with a pull entry, so re-storing a chunk and
//! removing a chunk that was only requested leave it unchanged.

use tracing::{trace, warn};
use vertex_storage::{KvStore, Transaction};
use vertex_swarm_primitives::{Chunk, ChunkAddress};

use crate::{IndexItem, LocalStore, LocalStoreError, LocalStoreResult};

/// The operational context of a store call.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Chunk arrived through pull sync.
    Syncing,
    /// Chunk was created locally and still has to be pushed.
    Upload,
    /// Chunk was fetched to serve a retrieval request.
    Request,
    /// Push of an uploaded chunk was confirmed.
    Synced,
    /// Chunk is read by a local consumer.
    Access,
    /// Chunk is dropped from the store.
    Removal,
}

impl Mode {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

mod sealed {
    #[allow(unreachable_pub)]
    pub trait Sealed {}
}

/// A mode marker type.
pub trait ModeKind: sealed::Sealed + Send + Sync + 'static {
    /// The mode this marker stands for.
    const MODE: Mode;
}

/// Modes that take a chunk.
pub trait PutMode: ModeKind {
    #[doc(hidden)]
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        chunk: &Chunk,
        now: i64,
    ) -> LocalStoreResult<()>;
}

/// Modes that return a chunk.
pub trait GetMode: ModeKind {
    #[doc(hidden)]
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        address: &ChunkAddress,
        now: i64,
    ) -> LocalStoreResult<Chunk>;
}

macro_rules! mode {
    ($(#[$docs:meta])* $name:ident) => {
        $(#[$docs])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl ModeKind for $name {
            const MODE: Mode = Mode::$name;
        }
    };
}

mode!(
    /// See [`Mode::Syncing`].
    Syncing
);
mode!(
    /// See [`Mode::Upload`].
    Upload
);
mode!(
    /// See [`Mode::Request`].
    Request
);
mode!(
    /// See [`Mode::Synced`].
    Synced
);
mode!(
    /// See [`Mode::Access`].
    Access
);
mode!(
    /// See [`Mode::Removal`].
    Removal
);

impl PutMode for Syncing {
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        chunk: &Chunk,
        now: i64,
    ) -> LocalStoreResult<()> {
        store(db, tx, chunk, now).map(drop)
    }
}

impl PutMode for Upload {
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        chunk: &Chunk,
        now: i64,
    ) -> LocalStoreResult<()> {
        let item = store(db, tx, chunk, now)?;
        db.indexes.push.put(tx, &item);
        trace!(address = %item.address, store_timestamp = item.store_timestamp, "Staged push entry");
        Ok(())
    }
}

impl PutMode for Request {
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        chunk: &Chunk,
        now: i64,
    ) -> LocalStoreResult<()> {
        match db.layout.get(&*tx, chunk.address())? {
            Some(existing) => {
                touch(db, tx, existing, now);
            }
            None => {
                let item = IndexItem::from_chunk(chunk)
                    .with_store_timestamp(now)
                    .with_access_timestamp(now);
                db.layout.put(tx, &item);
                db.layout.set_access(tx, &item);
                db.indexes.gc.put(tx, &item);
            }
        }
        Ok(())
    }
}

impl PutMode for Synced {
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        chunk: &Chunk,
        now: i64,
    ) -> LocalStoreResult<()> {
        let item = retrieve(db, tx, chunk.address())?;
        let push = &db.indexes.push;
        if !push.has_in(&*tx, &item)? {
            return Err(LocalStoreError::not_found(push.name(), item.address));
        }
        push.delete(tx, &item);
        touch(db, tx, item, now);
        Ok(())
    }
}

impl PutMode for Removal {
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        chunk: &Chunk,
        _now: i64,
    ) -> LocalStoreResult<()> {
        remove(db, tx, chunk.address()).map(drop)
    }
}

impl GetMode for Access {
    fn apply<S: KvStore + 'static>(
        db: &LocalStore<S>,
        tx: &mut Transaction<'_>,
        address: &ChunkAddress,
        now: i64,
    ) -> LocalStoreResult<Chunk> {
        let item = retrieve(db, tx, address)?;
        Ok(touch(db, tx, item, now).into_chunk())
    }
}

/// The retrieval record of `address`, or [`LocalStoreError::NotFound`].
fn retrieve<S: KvStore + 'static>(
    db: &LocalStore<S>,
    tx: &Transaction<'_>,
    address: &ChunkAddress,
) -> LocalStoreResult<IndexItem> {
    db.layout
        .get(tx, address)?
        .ok_or_else(|| LocalStoreError::not_found("retrieval", *address))
}

/// Retrieval and pull entries shared by syncing and upload.
///
/// An already stored chunk keeps its store time, so its pull and push keys
/// stay stable.
fn store<S: KvStore + 'static>(
    db: &LocalStore<S>,
    tx: &mut Transaction<'_>,
    chunk: &Chunk,
    now: i64,
) -> LocalStoreResult<IndexItem> {
    let item = match db.layout.get(&*tx, chunk.address())? {
        Some(existing) => existing,
        None => {
            let item = IndexItem::from_chunk(chunk)
                .with_store_timestamp(now)
                .with_access_timestamp(now);
            db.layout.put(tx, &item);
            item
        }
    };

    let pull = &db.indexes.pull;
    if !pull.has_in(&*tx, &item)? {
        pull.put(tx, &item);
        db.counter.add(tx, 1)?;
    }
    Ok(item)
}

/// Moves the access time of `item` to `now` and re-keys its gc entry.
///
/// The old gc key is rebuilt from the recorded access time; deleting it is a
/// no-op for chunks that never had a gc entry.
fn touch<S: KvStore + 'static>(
    db: &LocalStore<S>,
    tx: &mut Transaction<'_>,
    item: IndexItem,
    now: i64,
) -> IndexItem {
    let gc = &db.indexes.gc;
    gc.delete(tx, &item);

    let item = item.with_access_timestamp(now);
    db.layout.set_access(tx, &item);
    gc.put(tx, &item);
    trace!(address = %item.address, access_timestamp = now, "Staged access");
    item
}

/// Drops every entry of `address`, returning whether the chunk was stored.
/// Unknown chunks are tolerated.
pub(crate) fn remove<S: KvStore + 'static>(
    db: &LocalStore<S>,
    tx: &mut Transaction<'_>,
    address: &ChunkAddress,
) -> LocalStoreResult<bool> {
    let Some(item) = db.layout.get(&*tx, address)? else {
        warn!(%address, "Removal of a chunk that is not stored");
        return Ok(false);
    };

    db.layout.delete(tx, &item);
    db.indexes.push.delete(tx, &item);
    db.indexes.gc.delete(tx, &item);

    let pull = &db.indexes.pull;
    if pull.has_in(&*tx, &item)? {
        pull.delete(tx, &item);
        db.counter.add(tx, -1)?;
    }
    Ok(true)
}

/// Removes the chunk behind the gc entry `entry` together with the entry
/// itself, even when the entry is stale or its chunk is gone.
pub(crate) fn evict<S: KvStore + 'static>(
    db: &LocalStore<S>,
    tx: &mut Transaction<'_>,
    entry: &IndexItem,
) -> LocalStoreResult<bool> {
    db.indexes.gc.delete(tx, entry);
    remove(db, tx, &entry.address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_mode_labels() {
        let labels: Vec<_> = Mode::iter().map(Mode::as_str).collect();
        assert_eq!(
            labels,
            ["syncing", "upload", "request", "synced", "access", "removal"]
        );
        assert_eq!("synced".parse::<Mode>().unwrap(), Mode::Synced);
        assert_eq!(Removal::MODE.to_string(), "removal");
    }
}
