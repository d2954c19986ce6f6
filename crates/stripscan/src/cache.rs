//! Content-addressed result memoization.
//!
//! The cache key is a 32-bit FNV-1a hash over a strided subsample of the
//! analyzed buffer (roughly 64 samples across the shorter dimension),
//! folding R/G/B only. Identical post-crop buffers therefore always replay
//! identical readings. The cache is an optimization layer only: it never
//! mutates a reading and analysis proceeds without it.

use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::chemistry::ChemistryReading;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Target sample count across the shorter image dimension.
const HASH_TARGET_SAMPLES: u32 = 64;

/// Default cache capacity in entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 60;

/// Content hash of an analyzed buffer as eight lowercase hex digits.
pub fn image_hash(img: &RgbaImage) -> String {
    let (w, h) = img.dimensions();
    let step = (w.min(h) / HASH_TARGET_SAMPLES).max(1) as usize;

    let mut hash = FNV_OFFSET_BASIS;
    for y in (0..h).step_by(step) {
        for x in (0..w).step_by(step) {
            let p = img.get_pixel(x, y).0;
            for c in 0..3 {
                hash ^= p[c] as u32;
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
    }

    format!("{hash:08x}")
}

/// One memoized reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Monotonic insertion stamp; lower means older.
    pub stamp: u64,
    pub reading: ChemistryReading,
}

/// Capacity-bounded memoization of readings by image hash.
///
/// On overflow the oldest-stamp entries are evicted until the cache is at
/// capacity again.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
    next_stamp: u64,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            next_stamp: 0,
        }
    }

    /// Look up a memoized reading.
    pub fn get(&self, hash: &str) -> Option<&ChemistryReading> {
        self.entries.get(hash).map(|e| &e.reading)
    }

    /// Memoize a reading, evicting oldest entries past capacity.
    ///
    /// Re-inserting an existing hash refreshes its age.
    pub fn put(&mut self, hash: &str, reading: ChemistryReading) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.entries
            .insert(hash.to_string(), CacheEntry { stamp, reading });

        if self.entries.len() > self.capacity {
            let mut by_age: Vec<(u64, String)> = self
                .entries
                .iter()
                .map(|(k, e)| (e.stamp, k.clone()))
                .collect();
            by_age.sort();
            let excess = self.entries.len() - self.capacity;
            for (_, key) in by_age.into_iter().take(excess) {
                self.entries.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
