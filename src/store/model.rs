//! Statement data model.

use serde::{Deserialize, Serialize};

use super::StoreError;

/// Review classification of a statement.
///
/// The integer codes are stable: they are stored in the database and
/// rendered into cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// Not yet reviewed. The only state rebuilt into the cache.
    Unapproved = 0,
    /// Accepted into the target knowledge base.
    Approved = 1,
    /// Rejected as factually wrong.
    Wrong = 2,
    /// Already present from another source.
    OtherSource = 3,
    /// Duplicate of another statement.
    Duplicate = 4,
    /// Source was blacklisted.
    Blacklisted = 5,
}

impl ApprovalState {
    /// Numeric code as stored in the `state` column.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decode a stored state code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownApprovalState`] for codes outside the enum.
    pub fn from_code(code: i32) -> Result<Self, StoreError> {
        match code {
            0 => Ok(Self::Unapproved),
            1 => Ok(Self::Approved),
            2 => Ok(Self::Wrong),
            3 => Ok(Self::OtherSource),
            4 => Ok(Self::Duplicate),
            5 => Ok(Self::Blacklisted),
            other => Err(StoreError::UnknownApprovalState(other)),
        }
    }
}

impl std::fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single fact about a subject, as read from the store.
///
/// `property` and `value` form the payload; the cache stores them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Row identifier in the store
    pub id: i64,
    /// Subject identifier (e.g. `Q42`)
    pub subject: String,
    /// Property identifier (e.g. `P31`)
    pub property: String,
    /// Serialized object value
    pub value: String,
    /// Dataset the statement was uploaded with
    pub dataset: String,
    /// Upload batch the statement belongs to
    pub upload: i64,
    /// Review state
    pub state: ApprovalState,
}

impl Statement {
    /// Create an unapproved statement with no dataset and upload `0`.
    #[must_use]
    pub fn new(
        id: i64,
        subject: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            property: property.into(),
            value: value.into(),
            dataset: String::new(),
            upload: 0,
            state: ApprovalState::Unapproved,
        }
    }

    /// Set the dataset.
    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Set the upload id.
    #[must_use]
    pub fn with_upload(mut self, upload: i64) -> Self {
        self.upload = upload;
        self
    }

    /// Set the review state.
    #[must_use]
    pub fn with_state(mut self, state: ApprovalState) -> Self {
        self.state = state;
        self
    }
}

/// A dataset filter. The empty scope selects statements of every dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Scope(String);

impl Scope {
    /// The aggregate "all datasets" scope.
    #[must_use]
    pub fn all() -> Self {
        Self(String::new())
    }

    /// Scope restricted to one dataset.
    #[must_use]
    pub fn dataset(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Dataset name, or `""` for the aggregate scope.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is the aggregate scope.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a statement falls inside this scope.
    #[must_use]
    pub fn contains(&self, statement: &Statement) -> bool {
        self.is_all() || statement.dataset == self.0
    }

    /// Human-readable label used in logs and progress bars.
    #[must_use]
    pub fn label(&self) -> String {
        if self.is_all() {
            "all datasets".to_string()
        } else {
            format!("dataset {}", self.0)
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
