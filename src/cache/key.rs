//! Cache key composition.

use crate::store::ApprovalState;

const DELIMITER: char = '-';

/// Key of one cache entry: `subject-state` for the aggregate scope,
/// `subject-dataset-state` otherwise.
///
/// The delimiter is not escaped. Identifiers that contain `-` can produce
/// the same key as a different (subject, dataset, state) triple, e.g.
/// `("Q1-x", "", 0)` and `("Q1", "x", 0)` both map to `Q1-x-0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a subject's statements in `dataset` with `state`.
    /// An empty `dataset` denotes all datasets.
    #[must_use]
    pub fn build(subject: &str, state: ApprovalState, dataset: &str) -> Self {
        let state = state.code().to_string();
        let mut key = String::with_capacity(subject.len() + dataset.len() + state.len() + 2);
        key.push_str(subject);
        key.push(DELIMITER);
        if !dataset.is_empty() {
            key.push_str(dataset);
            key.push(DELIMITER);
        }
        key.push_str(&state);
        Self(key)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the underlying string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
