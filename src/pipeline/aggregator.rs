//! Grouping of a statement stream into per-subject batches.
//!
//! # Overview
//!
//! [`BatchAggregator`] is a two-state machine:
//!
//! - **Empty**: no current subject.
//! - **Accumulating**: collecting statements of one subject.
//!
//! A statement with the current subject is appended. A statement with a
//! different subject closes the current batch, which is emitted, and starts
//! a new one. The end of the stream closes the last batch.
//!
//! This is a single O(n) pass holding only the current batch, and it relies
//! on the input being sorted by subject. Unsorted input splits a subject
//! into several batches with the same key; the last one written wins.
//! [`BufferedAggregator`] trades memory for independence from ordering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::store::{ApprovalState, Scope, Statement};

/// Statements of one subject within one scope and state, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Cache key the batch is written under
    pub key: CacheKey,
    /// Subject shared by every statement
    pub subject: String,
    /// The statements, in the order they were read
    pub statements: Vec<Statement>,
}

#[derive(Debug, Default)]
enum AggregatorState {
    #[default]
    Empty,
    Accumulating {
        subject: String,
        statements: Vec<Statement>,
    },
}

/// Groups a subject-ordered stream into maximal same-subject runs.
///
/// # Example
///
/// ```
/// use updatecache::pipeline::BatchAggregator;
/// use updatecache::store::{ApprovalState, Scope, Statement};
///
/// let mut aggregator = BatchAggregator::new(ApprovalState::Unapproved, &Scope::all());
/// assert!(aggregator.push(Statement::new(1, "Q1", "P31", "A")).is_none());
/// assert!(aggregator.push(Statement::new(2, "Q1", "P31", "B")).is_none());
///
/// let q1 = aggregator.push(Statement::new(3, "Q2", "P31", "C")).unwrap();
/// assert_eq!(q1.key.as_str(), "Q1-0");
/// assert_eq!(q1.statements.len(), 2);
///
/// let q2 = aggregator.finish().unwrap();
/// assert_eq!(q2.key.as_str(), "Q2-0");
/// ```
#[derive(Debug)]
pub struct BatchAggregator {
    approval: ApprovalState,
    dataset: String,
    state: AggregatorState,
}

impl BatchAggregator {
    /// Create an empty aggregator for statements with `approval` in `scope`.
    #[must_use]
    pub fn new(approval: ApprovalState, scope: &Scope) -> Self {
        Self {
            approval,
            dataset: scope.name().to_string(),
            state: AggregatorState::Empty,
        }
    }

    /// Feed the next statement. Returns the batch it closed, if any.
    pub fn push(&mut self, statement: Statement) -> Option<Batch> {
        if let AggregatorState::Accumulating {
            subject,
            statements,
        } = &mut self.state
        {
            if *subject == statement.subject {
                statements.push(statement);
                return None;
            }
        }

        let next = AggregatorState::Accumulating {
            subject: statement.subject.clone(),
            statements: vec![statement],
        };
        let previous = std::mem::replace(&mut self.state, next);
        self.close(previous)
    }

    /// Signal the end of the stream. Returns the last open batch, if any,
    /// and leaves the aggregator empty.
    pub fn finish(&mut self) -> Option<Batch> {
        let previous = std::mem::take(&mut self.state);
        self.close(previous)
    }

    /// Whether no batch is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.state, AggregatorState::Empty)
    }

    fn close(&self, state: AggregatorState) -> Option<Batch> {
        match state {
            AggregatorState::Empty => None,
            AggregatorState::Accumulating {
                subject,
                statements,
            } => Some(Batch {
                key: CacheKey::build(&subject, self.approval, &self.dataset),
                subject,
                statements,
            }),
        }
    }
}

/// Groups statements by subject regardless of input order.
///
/// Holds the whole scope in memory and emits every batch, ordered by
/// subject, when the stream ends.
#[derive(Debug)]
pub struct BufferedAggregator {
    approval: ApprovalState,
    dataset: String,
    subjects: BTreeMap<String, Vec<Statement>>,
}

impl BufferedAggregator {
    /// Create an empty buffered aggregator.
    #[must_use]
    pub fn new(approval: ApprovalState, scope: &Scope) -> Self {
        Self {
            approval,
            dataset: scope.name().to_string(),
            subjects: BTreeMap::new(),
        }
    }

    /// Buffer a statement.
    pub fn push(&mut self, statement: Statement) {
        self.subjects
            .entry(statement.subject.clone())
            .or_default()
            .push(statement);
    }

    /// Drain all buffered batches, ordered by subject.
    pub fn finish(&mut self) -> Vec<Batch> {
        std::mem::take(&mut self.subjects)
            .into_iter()
            .map(|(subject, statements)| Batch {
                key: CacheKey::build(&subject, self.approval, &self.dataset),
                subject,
                statements,
            })
            .collect()
    }
}

/// How statements are grouped into batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// Close a batch whenever the subject changes. Requires sorted input.
    #[default]
    Adjacent,
    /// Buffer the whole scope and group by subject at the end.
    Buffered,
}

impl std::fmt::Display for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grouping::Adjacent => write!(f, "adjacent"),
            Grouping::Buffered => write!(f, "buffered"),
        }
    }
}

/// Either aggregator behind one interface.
#[derive(Debug)]
pub enum Grouper {
    /// Adjacency-based grouping
    Adjacent(BatchAggregator),
    /// Map-based grouping
    Buffered(BufferedAggregator),
}

impl Grouper {
    /// Create the aggregator selected by `grouping`.
    #[must_use]
    pub fn new(grouping: Grouping, approval: ApprovalState, scope: &Scope) -> Self {
        match grouping {
            Grouping::Adjacent => Self::Adjacent(BatchAggregator::new(approval, scope)),
            Grouping::Buffered => Self::Buffered(BufferedAggregator::new(approval, scope)),
        }
    }

    /// Feed the next statement. Returns a batch closed by it, if any.
    pub fn push(&mut self, statement: Statement) -> Option<Batch> {
        match self {
            Self::Adjacent(aggregator) => aggregator.push(statement),
            Self::Buffered(aggregator) => {
                aggregator.push(statement);
                None
            }
        }
    }

    /// Signal the end of the stream and return the remaining batches.
    pub fn finish(&mut self) -> Vec<Batch> {
        match self {
            Self::Adjacent(aggregator) => aggregator.finish().into_iter().collect(),
            Self::Buffered(aggregator) => aggregator.finish(),
        }
    }
}
