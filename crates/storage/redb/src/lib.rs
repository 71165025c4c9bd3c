//! redb backend for [`vertex_storage`].
//!
//! All tables share one redb table of raw byte keys and values; the table
//! prefix of [`vertex_storage::Table`] keeps them apart. redb admits a single
//! writer at a time, so every [`KvStore::update`] runs its reads and its
//! commit inside one exclusive write transaction.

use std::ops::ControlFlow;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, backends::InMemoryBackend};
use tracing::{debug, trace};
use vertex_storage::{Batch, DatabaseError, KvRead, KvStore, Transaction};

/// Key: table prefix followed by the encoded key.
/// Value: compressed table value.
const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");

/// redb-based key-value store.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let db = Database::create(path.as_ref()).map_err(DatabaseError::backend)?;
        let store = Self::init(db)?;
        debug!(path = %path.as_ref().display(), "Opened redb store");
        Ok(store)
    }

    /// Create a store that lives in memory only.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .map_err(DatabaseError::backend)?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self, DatabaseError> {
        // Ensure the entries table exists so read transactions can open it.
        let txn = db.begin_write().map_err(DatabaseError::backend)?;
        {
            let _ = txn.open_table(ENTRIES).map_err(DatabaseError::backend)?;
        }
        txn.commit().map_err(DatabaseError::backend)?;
        Ok(Self { db })
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

/// Reads through a table that belongs to an open transaction.
struct TableView<'a, T>(&'a T);

impl<T> KvRead for TableView<'_, T>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        let value = self.0.get(key).map_err(DatabaseError::backend)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }
}

fn apply(
    table: &mut redb::Table<'_, &'static [u8], &'static [u8]>,
    batch: &Batch,
) -> Result<(), DatabaseError> {
    for (key, value) in batch.iter() {
        match value {
            Some(value) => {
                table.insert(key, value).map_err(DatabaseError::backend)?;
            }
            None => {
                table.remove(key).map_err(DatabaseError::backend)?;
            }
        }
    }
    Ok(())
}

impl KvRead for RedbStore {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        let txn = self.db.begin_read().map_err(DatabaseError::backend)?;
        let table = txn.open_table(ENTRIES).map_err(DatabaseError::backend)?;
        TableView(&table).get_raw(key)
    }
}

impl KvStore for RedbStore {
    fn iterate_from(
        &self,
        start: &[u8],
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>, DatabaseError>,
    ) -> Result<(), DatabaseError> {
        let txn = self.db.begin_read().map_err(DatabaseError::backend)?;
        let table = txn.open_table(ENTRIES).map_err(DatabaseError::backend)?;

        for entry in table.range::<&[u8]>(start..).map_err(DatabaseError::backend)? {
            let (key, value) = entry.map_err(DatabaseError::backend)?;
            if f(key.value(), value.value())?.is_break() {
                break;
            }
        }
        Ok(())
    }

    fn write(&self, batch: Batch) -> Result<(), DatabaseError> {
        let txn = self.db.begin_write().map_err(DatabaseError::backend)?;
        {
            let mut table = txn.open_table(ENTRIES).map_err(DatabaseError::backend)?;
            apply(&mut table, &batch)?;
        }
        txn.commit().map_err(DatabaseError::backend)?;
        metrics::counter!("storage_redb_commits_total").increment(1);
        trace!(ops = batch.len(), "Committed batch");
        Ok(())
    }

    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<DatabaseError>,
    {
        let txn = self.db.begin_write().map_err(DatabaseError::backend)?;
        let staged = {
            let mut table = txn.open_table(ENTRIES).map_err(DatabaseError::backend)?;
            let view = TableView(&table);
            let mut tx = Transaction::new(&view);
            match f(&mut tx) {
                Ok(out) => {
                    let batch = tx.into_batch();
                    apply(&mut table, &batch)
                        .map(|()| (out, batch.len()))
                        .map_err(E::from)
                }
                Err(err) => Err(err),
            }
        };

        match staged {
            Ok((out, ops)) => {
                txn.commit().map_err(DatabaseError::backend)?;
                metrics::counter!("storage_redb_commits_total").increment(1);
                trace!(ops, "Committed transaction");
                Ok(out)
            }
            Err(err) => {
                txn.abort().map_err(DatabaseError::backend)?;
                metrics::counter!("storage_redb_aborts_total").increment(1);
                Err(err)
            }
        }
    }
}
