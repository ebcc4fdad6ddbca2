// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for dataset detail lookups.
//!
//! The "most searched" ranking resolves each ranked ID to its detail; the
//! same handful of IDs come back on every call, so details are kept for a
//! short TTL instead of hitting CKAN each time.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::dataset::DatasetDetail;

pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    detail: DatasetDetail,
    inserted_at: Instant,
}

/// In-process LRU cache of dataset details keyed by dataset ID.
pub struct DatasetCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl DatasetCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Cached detail for `id`; `None` if absent or expired.
    pub fn get(&self, id: &str) -> Option<DatasetDetail> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.detail.clone());
            }
            cache.pop(id);
        }
        None
    }

    pub fn put(&self, id: &str, detail: DatasetDetail) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                id.to_string(),
                CacheEntry {
                    detail,
                    inserted_at: Instant::now(),
                },
            );
        }
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}
