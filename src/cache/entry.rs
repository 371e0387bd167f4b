//! Cache entry encoding.

use serde::{Deserialize, Serialize};

use super::CacheResult;
use crate::store::Statement;

#[derive(Serialize)]
struct EntryRef<'a> {
    statements: &'a [Statement],
}

#[derive(Deserialize)]
struct EntryOwned {
    statements: Vec<Statement>,
}

/// The encoded value stored under one cache key.
///
/// Encoding is compact JSON with fields in declaration order, so the same
/// statements always produce the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    bytes: Vec<u8>,
}

impl CacheEntry {
    /// Encode a batch of statements.
    pub fn encode(statements: &[Statement]) -> CacheResult<Self> {
        let bytes = serde_json::to_vec(&EntryRef { statements })?;
        Ok(Self { bytes })
    }

    /// Wrap bytes previously read back from a cache.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decode the statements held by this entry.
    pub fn decode(&self) -> CacheResult<Vec<Statement>> {
        let entry: EntryOwned = serde_json::from_slice(&self.bytes)?;
        Ok(entry.statements)
    }

    /// Encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the encoding is empty. Never true for encoded batches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
