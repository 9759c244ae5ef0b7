//! In-process cache implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Cache, CacheBucket};

/// Entries keyed by `(bucket, key)`, each remembering the etag it was stored under.
type Entries = HashMap<(String, String), (String, Vec<u8>)>;

/// Process-local [`Cache`] backed by a shared hash map.
///
/// All buckets share one map, so handles from repeated `bucket()` calls see
/// the same entries. Entries live until overwritten or cleared.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all buckets.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            name: name.to_owned(),
            entries: Arc::clone(&self.entries),
        })
    }
}

/// Handle over one bucket's slice of the shared map.
struct MemoryCacheBucket {
    name: String,
    entries: Arc<RwLock<Entries>>,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().unwrap();
        let (stored_etag, value) = entries.get(&(self.name.clone(), key.to_owned()))?;
        if stored_etag != etag {
            tracing::debug!(bucket = %self.name, key, "cache entry stale");
            return None;
        }
        Some(value.clone())
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        self.entries.write().unwrap().insert(
            (self.name.clone(), key.to_owned()),
            (etag.to_owned(), value.to_vec()),
        );
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap()
            .retain(|(bucket, _), _| bucket != &self.name);
    }
}
