//! Score store: point UID -> [`PointRecord`].
//!
//! [`ScoreStore`] is the read-only side used while serving queries;
//! [`ScoreStoreWriter`] is the exclusive side used by ingestion. They are
//! distinct types so a serving process can never obtain a write handle.

#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(test)]
mod tests;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockScoreStore;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::constants::POINTS_COLLECTION;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::kv::{KvReader, KvWriter, WriteTxn};
use crate::storage::model::PointRecord;

/// Point record lookup used by the aggregator.
pub trait PointLookup: Send + Sync {
    /// Returns the record for `uid`; a miss is [`StoreError::NotFound`].
    fn lookup(&self, uid: &str) -> StoreResult<PointRecord>;

    /// Number of points available.
    fn point_count(&self) -> usize;
}

impl<S: PointLookup> PointLookup for Arc<S> {
    fn lookup(&self, uid: &str) -> StoreResult<PointRecord> {
        (**self).lookup(uid)
    }

    fn point_count(&self) -> usize {
        (**self).point_count()
    }
}

/// Read-only score store.
#[derive(Debug, Clone)]
pub struct ScoreStore {
    reader: KvReader,
    collection: String,
}

impl ScoreStore {
    /// Opens the default `main` collection of `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_collection(path, POINTS_COLLECTION)
    }

    pub fn open_collection(path: impl AsRef<Path>, collection: &str) -> StoreResult<Self> {
        let reader = KvReader::open(path)?;
        let store = Self {
            reader,
            collection: collection.to_string(),
        };

        info!(
            path = %store.reader.path().display(),
            collection = %store.collection,
            points = store.len(),
            "Opened score store"
        );

        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn get(&self, uid: &str) -> StoreResult<PointRecord> {
        let bytes = self
            .reader
            .get(&self.collection, uid.as_bytes())
            .ok_or_else(|| StoreError::NotFound {
                uid: uid.to_string(),
            })?;

        PointRecord::from_bytes(uid, bytes)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.reader.contains(&self.collection, uid.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.reader.len(&self.collection)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates all records in UID byte order.
    pub fn iter(&self) -> impl Iterator<Item = StoreResult<(String, PointRecord)>> + '_ {
        self.reader.entries(&self.collection).map(|(key, value)| {
            let uid = std::str::from_utf8(key).map_err(|e| StoreError::Decode {
                uid: String::from_utf8_lossy(key).into_owned(),
                message: e.to_string(),
            })?;
            let record = PointRecord::from_bytes(uid, value)?;
            Ok((uid.to_string(), record))
        })
    }
}

impl PointLookup for ScoreStore {
    fn lookup(&self, uid: &str) -> StoreResult<PointRecord> {
        self.get(uid)
    }

    fn point_count(&self) -> usize {
        self.len()
    }
}

/// Exclusive read-write score store used by ingestion.
#[derive(Debug)]
pub struct ScoreStoreWriter {
    writer: KvWriter,
    collection: String,
}

impl ScoreStoreWriter {
    /// Locks `path` and opens its default `main` collection for writing.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_collection(path, POINTS_COLLECTION)
    }

    pub fn open_collection(path: impl AsRef<Path>, collection: &str) -> StoreResult<Self> {
        Ok(Self {
            writer: KvWriter::open(path)?,
            collection: collection.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    /// Returns the committed record for `uid`, if any.
    pub fn get(&self, uid: &str) -> StoreResult<Option<PointRecord>> {
        self.writer
            .get(&self.collection, uid.as_bytes())
            .map(|bytes| PointRecord::from_bytes(uid, bytes))
            .transpose()
    }

    /// Starts an all-or-nothing batch of upserts.
    pub fn begin(&mut self) -> ScoreTxn<'_> {
        let mut txn = self.writer.begin();
        txn.create_collection(&self.collection);

        ScoreTxn {
            txn,
            collection: &self.collection,
        }
    }
}

/// A batch of record upserts; dropped without commit, it writes nothing.
#[derive(Debug)]
pub struct ScoreTxn<'a> {
    txn: WriteTxn<'a>,
    collection: &'a str,
}

impl ScoreTxn<'_> {
    /// Stages `record` under `uid`, replacing any previous value.
    pub fn put(&mut self, uid: &str, record: &PointRecord) -> StoreResult<()> {
        let bytes = record.to_bytes()?;
        self.txn.put(self.collection, uid.as_bytes(), bytes);
        Ok(())
    }

    pub fn commit(self) -> StoreResult<()> {
        self.txn.commit()
    }
}
