//! Typed JSON access on top of raw byte buckets.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// JSON convenience methods for any [`CacheBucket`].
///
/// Kept as a blanket extension so [`CacheBucket`] stays object-safe.
///
/// ```
/// use trellis_cache::{Cache, CacheBucketExt, MemoryCache};
///
/// let bucket = MemoryCache::new().bucket("menus");
/// bucket.set_json("footer", "7", &vec!["About", "Contact"]);
/// let labels: Option<Vec<String>> = bucket.get_json("footer", "7");
/// assert_eq!(labels.unwrap().len(), 2);
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve and deserialize a value.
    ///
    /// A value that no longer deserializes counts as a miss.
    fn get_json<T: DeserializeOwned>(&self, key: &str, etag: &str) -> Option<T> {
        let bytes = self.get(key, etag)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Serialize and store a value. Serialization failures are ignored.
    fn set_json<T: Serialize>(&self, key: &str, etag: &str, value: &T) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.set(key, etag, &bytes);
        }
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
