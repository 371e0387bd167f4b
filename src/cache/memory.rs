//! In-memory cache sink.

use std::collections::BTreeMap;

use super::{CacheEntry, CacheError, CacheKey, CacheResult, CacheWriter};

/// Cache held in an ordered map.
///
/// Used by tests and by `--dry-run`, which rebuilds into memory and only
/// reports what would have been written.
#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: BTreeMap<String, Vec<u8>>,
    writes: Vec<String>,
    clears: usize,
    fail_after: Option<usize>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every upsert after the first `n` with an I/O error.
    ///
    /// Models a cache server going away in the middle of a run.
    #[must_use]
    pub fn fail_after_upserts(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries
            .get(key)
            .map(|bytes| CacheEntry::from_bytes(bytes.clone()))
    }

    /// All stored entries, ordered by key.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.entries
    }

    /// Keys in the order they were written, including overwrites.
    #[must_use]
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Number of `clear` calls.
    #[must_use]
    pub fn clears(&self) -> usize {
        self.clears
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheWriter for MemoryCache {
    fn upsert(&mut self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()> {
        if self.fail_after.is_some_and(|n| self.writes.len() >= n) {
            return Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "cache connection closed",
            )));
        }
        self.entries
            .insert(key.as_str().to_string(), entry.as_bytes().to_vec());
        self.writes.push(key.as_str().to_string());
        Ok(())
    }

    fn clear(&mut self) -> CacheResult<()> {
        self.entries.clear();
        self.clears += 1;
        Ok(())
    }
}
