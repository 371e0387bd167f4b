//! Statement cache sink.
//!
//! This module provides the write side of the rebuild: every batch of a
//! subject's statements is stored under one key, overwriting what was there.
//!
//! # Architecture
//!
//! * [`key`]: deterministic key composition from (subject, state, dataset).
//! * [`entry`]: encoding of a batch into the bytes stored under a key.
//! * [`redis`]: the Redis sink, one synchronous connection per run.
//! * [`memory`]: an in-memory cache used by tests and dry runs.
//!
//! # Write Semantics
//!
//! [`CacheWriter::upsert`] replaces a single key atomically. Repeating a
//! rebuild against unchanged data therefore converges to the same cache
//! contents, whatever state an interrupted run left behind.

pub mod entry;
pub mod key;
pub mod memory;
pub mod redis;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use memory::MemoryCache;
pub use self::redis::RedisCache;

/// Errors raised while writing to the cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The cache server could not be reached.
    #[error("Failed to connect to cache at {addr}: {source}")]
    Connect {
        /// Connection URL that was used
        addr: String,
        /// The underlying client error
        #[source]
        source: ::redis::RedisError,
    },

    /// A command failed or the server answered with an error.
    #[error("Cache error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Writing to the cache failed at the I/O level.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server reply did not match what the command expects.
    #[error("Unexpected cache reply: {0}")]
    Protocol(String),

    /// A batch could not be encoded.
    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// A key-value cache the rebuild writes into.
pub trait CacheWriter {
    /// Store `entry` under `key`, replacing any previous value.
    fn upsert(&mut self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()>;

    /// Remove every entry from the cache namespace.
    fn clear(&mut self) -> CacheResult<()>;
}

impl<W: CacheWriter + ?Sized> CacheWriter for &mut W {
    fn upsert(&mut self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()> {
        (**self).upsert(key, entry)
    }

    fn clear(&mut self) -> CacheResult<()> {
        (**self).clear()
    }
}

impl<W: CacheWriter + ?Sized> CacheWriter for Box<W> {
    fn upsert(&mut self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()> {
        (**self).upsert(key, entry)
    }

    fn clear(&mut self) -> CacheResult<()> {
        (**self).clear()
    }
}
