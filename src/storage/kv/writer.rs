use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};

use rkyv::rancor::Error as RkyvError;
use tracing::{debug, info, warn};

use super::{ArchivedStoreImage, CollectionImage, EntryImage, FORMAT_VERSION, StoreImage};
use super::{check_image, sibling_path};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::mmap::MmapFileHandle;

const LOCK_SUFFIX: &str = ".lock";
const TEMP_SUFFIX: &str = ".tmp";

type Collections = BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Exclusive advisory lock on `<store>.lock`, held for the lifetime of a
/// [`KvWriter`].
///
/// The file itself is left in place; only the OS lock on it matters, and the
/// kernel drops that lock when the holding process exits for any reason.
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
    _file: File,
}

impl LockFile {
    fn acquire(store_path: &Path) -> StoreResult<Self> {
        let path = sibling_path(store_path, LOCK_SUFFIX);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(StoreError::Locked {
                    path: store_path.to_path_buf(),
                    lock_path: path,
                });
            }
            Err(TryLockError::Error(e)) => return Err(StoreError::io(path, e)),
        }

        file.set_len(0)
            .and_then(|()| writeln!(file, "{}", std::process::id()))
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(lock_path = %path.display(), "Acquired store lock");
        Ok(Self { path, _file: file })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        debug!(lock_path = %self.path.display(), "Released store lock");
    }
}

/// Exclusive read-write handle on a store file.
///
/// Holds the committed contents in memory; every commit rewrites the file.
#[derive(Debug)]
pub struct KvWriter {
    path: PathBuf,
    committed: Collections,
    _lock: LockFile,
}

impl KvWriter {
    /// Locks `path` and loads its contents if the file already exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = LockFile::acquire(&path)?;

        let committed = if path.exists() {
            load_collections(&path)?
        } else {
            Collections::new()
        };

        debug!(
            path = %path.display(),
            collections = committed.len(),
            "Opened store for writing"
        );

        Ok(Self {
            path,
            committed,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a committed value.
    pub fn get(&self, collection: &str, key: &[u8]) -> Option<&[u8]> {
        self.committed
            .get(collection)
            .and_then(|entries| entries.get(key))
            .map(Vec::as_slice)
    }

    /// Starts a transaction; nothing reaches disk until [`WriteTxn::commit`].
    pub fn begin(&mut self) -> WriteTxn<'_> {
        WriteTxn {
            writer: self,
            staged: Collections::new(),
        }
    }
}

/// Staged upserts against a [`KvWriter`].
///
/// Dropping the transaction without committing discards it.
#[derive(Debug)]
pub struct WriteTxn<'a> {
    writer: &'a mut KvWriter,
    staged: Collections,
}

impl WriteTxn<'_> {
    /// Ensures `collection` exists in the committed image, even if empty.
    pub fn create_collection(&mut self, collection: &str) {
        self.staged.entry(collection.to_string()).or_default();
    }

    /// Stages an upsert; the last put for a key wins.
    pub fn put(&mut self, collection: &str, key: &[u8], value: Vec<u8>) {
        self.staged
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_vec(), value);
    }

    /// Reads through staged writes, then committed contents.
    pub fn get(&self, collection: &str, key: &[u8]) -> Option<&[u8]> {
        self.staged
            .get(collection)
            .and_then(|entries| entries.get(key))
            .map(Vec::as_slice)
            .or_else(|| self.writer.get(collection, key))
    }

    /// Number of staged entries across all collections.
    pub fn staged_len(&self) -> usize {
        self.staged.values().map(BTreeMap::len).sum()
    }

    /// Writes the merged image to a temp file, syncs it, and renames it over
    /// the store path.
    pub fn commit(self) -> StoreResult<()> {
        let WriteTxn { writer, staged } = self;
        let staged_len: usize = staged.values().map(BTreeMap::len).sum();

        let mut merged = writer.committed.clone();
        for (name, entries) in staged {
            merged.entry(name).or_default().extend(entries);
        }

        write_image(&writer.path, &merged)?;
        writer.committed = merged;

        info!(
            path = %writer.path.display(),
            entries = staged_len,
            "Committed store transaction"
        );

        Ok(())
    }
}

fn load_collections(path: &Path) -> StoreResult<Collections> {
    let handle = MmapFileHandle::open(path)?;
    let archived = handle.access_archived::<ArchivedStoreImage>()?;
    check_image(path, archived)?;

    let image = rkyv::deserialize::<StoreImage, RkyvError>(archived)
        .map_err(|e| StoreError::Serialization(format!("{:?}", e)))?;

    Ok(image
        .collections
        .into_iter()
        .map(|c| {
            let entries = c.entries.into_iter().map(|e| (e.key, e.value)).collect();
            (c.name, entries)
        })
        .collect())
}

fn write_image(path: &Path, collections: &Collections) -> StoreResult<()> {
    let image = StoreImage {
        format_version: FORMAT_VERSION,
        collections: collections
            .iter()
            .map(|(name, entries)| CollectionImage {
                name: name.clone(),
                entries: entries
                    .iter()
                    .map(|(key, value)| EntryImage {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            })
            .collect(),
    };

    let bytes = rkyv::to_bytes::<RkyvError>(&image)
        .map_err(|e| StoreError::Serialization(format!("{:?}", e)))?;

    let temp_path = sibling_path(path, TEMP_SUFFIX);
    {
        let mut file = File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(&bytes)
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&temp_path, e))?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp store file");
        }
        return Err(StoreError::io(path, e));
    }

    Ok(())
}
