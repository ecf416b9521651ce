//! Snapshot KV engine.
//!
//! A store file is one rkyv archive holding named collections of sorted
//! `key -> value` byte entries. Readers map the file and binary-search the
//! archive in place. Writers rebuild the whole image and swap it in with an
//! atomic rename, so a reader never observes a partial write.

mod writer;


pub use writer::{KvWriter, WriteTxn};

use std::path::{Path, PathBuf};

use rkyv::{Archive, Deserialize, Serialize};

use crate::storage::error::{StoreError, StoreResult};
use crate::storage::mmap::MmapFileHandle;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone, Default)]
pub(crate) struct StoreImage {
    pub format_version: u32,
    /// Sorted by name.
    pub collections: Vec<CollectionImage>,
}

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub(crate) struct CollectionImage {
    pub name: String,
    /// Sorted by key, keys unique.
    pub entries: Vec<EntryImage>,
}

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub(crate) struct EntryImage {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Read-only view over a store file.
#[derive(Debug, Clone)]
pub struct KvReader {
    handle: MmapFileHandle,
}

impl KvReader {
    /// Maps `path` and validates the archive once.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let handle = MmapFileHandle::open(path.as_ref())?;
        let image = handle.access_archived::<ArchivedStoreImage>()?;
        check_image(handle.path(), image)?;

        Ok(Self { handle })
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    fn image(&self) -> &ArchivedStoreImage {
        // SAFETY: The bytes were validated as an `ArchivedStoreImage` in `open`
        // and the read-only mapping cannot change for the lifetime of `self`.
        unsafe { rkyv::access_unchecked::<ArchivedStoreImage>(self.handle.as_slice()) }
    }

    fn collection(&self, name: &str) -> Option<&ArchivedCollectionImage> {
        let collections = &self.image().collections;
        collections
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|idx| &collections[idx])
    }

    /// Returns the value stored under `key`, borrowed from the mapping.
    pub fn get(&self, collection: &str, key: &[u8]) -> Option<&[u8]> {
        let entries = &self.collection(collection)?.entries;
        entries
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
            .map(|idx| entries[idx].value.as_slice())
    }

    pub fn contains(&self, collection: &str, key: &[u8]) -> bool {
        self.get(collection, key).is_some()
    }

    /// Number of entries in `collection` (0 when it does not exist).
    pub fn len(&self, collection: &str) -> usize {
        self.collection(collection).map_or(0, |c| c.entries.len())
    }

    /// Iterates `collection` in key order.
    pub fn entries(&self, collection: &str) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.collection(collection)
            .into_iter()
            .flat_map(|c| c.entries.iter())
            .map(|e| (e.key.as_slice(), e.value.as_slice()))
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.image().collections.iter().map(|c| c.name.as_str())
    }
}

fn check_image(path: &Path, image: &ArchivedStoreImage) -> StoreResult<()> {
    let found = image.format_version.to_native();
    if found != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found,
            expected: FORMAT_VERSION,
        });
    }

    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    for pair in image.collections.windows(2) {
        if pair[0].name.as_str() >= pair[1].name.as_str() {
            return Err(corrupt(format!(
                "collections out of order at '{}'",
                pair[1].name.as_str()
            )));
        }
    }

    for collection in image.collections.iter() {
        for pair in collection.entries.windows(2) {
            if pair[0].key.as_slice() >= pair[1].key.as_slice() {
                return Err(corrupt(format!(
                    "keys out of order in collection '{}'",
                    collection.name.as_str()
                )));
            }
        }
    }

    Ok(())
}

/// `<path><suffix>`, e.g. `scores.db` -> `scores.db.lock`.
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
