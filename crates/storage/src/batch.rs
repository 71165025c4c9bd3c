//! Staged writes.

use std::collections::BTreeMap;

use crate::{Compress, DatabaseError, Decompress, KvRead, Table, table_key};

/// A set of puts and deletes applied atomically by [`KvStore::write`].
///
/// Later operations on the same key replace earlier ones, so a batch holds at
/// most one pending operation per key.
///
/// [`KvStore::write`]: crate::KvStore::write
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Batch {
    ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a raw put.
    pub fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.insert(key, Some(value));
    }

    /// Stage a raw delete.
    pub fn delete_raw(&mut self, key: Vec<u8>) {
        self.ops.insert(key, None);
    }

    /// Stage a put into table `T`.
    pub fn put<T: Table>(&mut self, key: T::Key, value: &T::Value) {
        self.put_raw(table_key::<T>(key), value.compress());
    }

    /// Stage a delete from table `T`.
    pub fn delete<T: Table>(&mut self, key: T::Key) {
        self.delete_raw(table_key::<T>(key));
    }

    /// The staged operation for `key`, if any: `Some(None)` is a pending delete.
    pub fn staged(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.ops.get(key).map(Option::as_deref)
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Staged operations in key order; `None` values are deletes.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Option<&[u8]>)> {
        self.ops
            .iter()
            .map(|(key, value)| (key.as_slice(), value.as_deref()))
    }
}

/// A read-then-write unit of work.
///
/// Reads see the backend state overlaid with the writes staged so far.
/// Nothing reaches the backend until the owning [`KvStore::update`] call
/// commits the staged [`Batch`].
///
/// [`KvStore::update`]: crate::KvStore::update
pub struct Transaction<'a> {
    reader: &'a dyn KvRead,
    batch: Batch,
}

impl<'a> Transaction<'a> {
    /// Start a transaction reading through `reader`.
    pub fn new(reader: &'a dyn KvRead) -> Self {
        Self {
            reader,
            batch: Batch::new(),
        }
    }

    /// Typed lookup in table `T`.
    pub fn get<T: Table>(&self, key: T::Key) -> Result<Option<T::Value>, DatabaseError> {
        self.get_raw(&table_key::<T>(key))?
            .map(|value| T::Value::decompress(&value))
            .transpose()
    }

    /// Stage a put into table `T`.
    pub fn put<T: Table>(&mut self, key: T::Key, value: &T::Value) {
        self.batch.put::<T>(key, value);
    }

    /// Stage a delete from table `T`.
    pub fn delete<T: Table>(&mut self, key: T::Key) {
        self.batch.delete::<T>(key);
    }

    /// Writes staged so far.
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Finish the transaction, yielding the batch to commit.
    pub fn into_batch(self) -> Batch {
        self.batch
    }
}

impl KvRead for Transaction<'_> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        match self.batch.staged(key) {
            Some(staged) => Ok(staged.map(<[u8]>::to_vec)),
            None => self.reader.get_raw(key),
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("staged", &self.batch.len())
            .finish_non_exhaustive()
    }
}
