//! LRU cache of resolved subject metadata.
//!
//! - Unbounded by default; with a capacity the least recently used subject
//!   is evicted when full
//! - Thread-safe access via `RwLock`
//!
//! # Staleness Behavior
//!
//! Entries never expire. Metadata is read once per subject and served from
//! the cache until `invalidate()` or `clear()` is called. Empty metadata
//! (a subject whose variables could not be fetched) is cached like any other
//! result.

use crate::metadata::SubjectMetadata;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe per-subject metadata cache.
pub struct MetadataCache {
    subjects: RwLock<LruCache<String, Arc<SubjectMetadata>>>,
}

impl MetadataCache {
    /// Create a cache, unbounded when `capacity` is `None` or zero.
    pub fn new(capacity: Option<usize>) -> Self {
        let cache = match capacity.and_then(NonZeroUsize::new) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            subjects: RwLock::new(cache),
        }
    }

    /// Get cached metadata for a subject.
    pub async fn get(&self, subject: &str) -> Option<Arc<SubjectMetadata>> {
        // `get` updates recency, so it needs the write lock.
        let mut cache = self.subjects.write().await;
        let hit = cache.get(subject).cloned();
        if hit.is_some() {
            tracing::debug!(subject = %subject, "Metadata cache hit");
        }
        hit
    }

    /// Store metadata for a subject, replacing any previous entry.
    pub async fn put(&self, subject: String, metadata: Arc<SubjectMetadata>) {
        let variables = metadata.len();
        let mut cache = self.subjects.write().await;
        cache.put(subject.clone(), metadata);
        tracing::debug!(subject = %subject, variables, "Cached subject metadata");
    }

    /// Invalidate one subject's entry.
    pub async fn invalidate(&self, subject: &str) {
        let mut cache = self.subjects.write().await;
        if cache.pop(subject).is_some() {
            tracing::debug!(subject = %subject, "Metadata cache entry invalidated");
        }
    }

    /// Clear all cached entries.
    pub async fn clear(&self) {
        self.subjects.write().await.clear();
        tracing::debug!("Metadata cache cleared");
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let cache = self.subjects.read().await;
        CacheStats {
            cached_subjects: cache.len(),
            total_variables: cache.iter().map(|(_, metadata)| metadata.len()).sum(),
        }
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache").finish_non_exhaustive()
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of subjects with cached metadata
    pub cached_subjects: usize,
    /// Number of variable tables across all cached subjects
    pub total_variables: usize,
}
