//! Ordered key-value backend traits.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use crate::{Batch, DatabaseError, Decode, Decompress, Table, Transaction, table_key};

/// Point lookups.
pub trait KvRead {
    /// Raw value stored under `key`, `None` if absent.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError>;
}

/// Typed lookups for any [`KvRead`], trait objects included.
pub trait KvReadExt: KvRead {
    /// Value stored under `key` in table `T`.
    fn get_value<T: Table>(&self, key: T::Key) -> Result<Option<T::Value>, DatabaseError> {
        self.get_raw(&table_key::<T>(key))?
            .map(|value| T::Value::decompress(&value))
            .transpose()
    }
}

impl<R: KvRead + ?Sized> KvReadExt for R {}

impl KvRead for BTreeMap<Vec<u8>, Vec<u8>> {
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        Ok(self.get(key).cloned())
    }
}

/// An ordered key-value store with atomic batched writes.
///
/// Keys iterate in lexicographic byte order. Implementations must be
/// thread-safe and must apply every [`Batch`] all-or-nothing.
pub trait KvStore: KvRead + Send + Sync {
    /// Visit entries with keys `>= start` in ascending order until `f` breaks
    /// or the key space ends.
    ///
    /// `f` may read and write the store; no lock is held across its calls.
    fn iterate_from(
        &self,
        start: &[u8],
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<ControlFlow<()>, DatabaseError>,
    ) -> Result<(), DatabaseError>;

    /// Apply `batch` atomically.
    fn write(&self, batch: Batch) -> Result<(), DatabaseError>;

    /// Run `f` inside a write transaction and commit what it staged.
    ///
    /// Write transactions are serialized: no other transaction commits
    /// between the reads `f` performs and the commit of its writes. If `f`
    /// fails nothing is written.
    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<DatabaseError>;

    /// Visit the entries of table `T` in key order, starting at `start` or
    /// at the first entry of the table.
    ///
    /// The callback's error is returned as-is.
    fn iterate_table<T, E, F>(&self, start: Option<T::Key>, mut f: F) -> Result<(), E>
    where
        Self: Sized,
        T: Table,
        E: From<DatabaseError>,
        F: FnMut(T::Key, T::Value) -> Result<ControlFlow<()>, E>,
    {
        let start = match start {
            Some(key) => table_key::<T>(key),
            None => vec![T::PREFIX],
        };

        let mut failure = None;
        self.iterate_from(&start, &mut |key, value| {
            match key.split_first() {
                Some((&prefix, rest)) if prefix == T::PREFIX => {
                    let key = T::Key::decode(rest)?;
                    let value = T::Value::decompress(value)?;
                    match f(key, value) {
                        Ok(flow) => Ok(flow),
                        Err(err) => {
                            failure = Some(err);
                            Ok(ControlFlow::Break(()))
                        }
                    }
                }
                // past the end of the table
                _ => Ok(ControlFlow::Break(())),
            }
        })?;

        failure.map_or(Ok(()), Err)
    }
}
