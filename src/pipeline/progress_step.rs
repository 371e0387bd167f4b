//! Progress update cadence.

/// Number of periodic progress updates per scope.
pub const PROGRESS_STEPS: u64 = 100;

/// Decides after which statements a periodic progress update is due.
///
/// The step is one percent of the scope's total. Scopes with fewer than
/// [`PROGRESS_STEPS`] statements have no step and only get the start and
/// completion updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStep {
    step: Option<u64>,
}

impl ProgressStep {
    /// Cadence for a scope holding `total` statements.
    #[must_use]
    pub fn for_total(total: u64) -> Self {
        let step = total / PROGRESS_STEPS;
        Self {
            step: (step > 0).then_some(step),
        }
    }

    /// Statements between periodic updates, if any.
    #[must_use]
    pub fn step(&self) -> Option<u64> {
        self.step
    }

    /// Whether a periodic update is due after `observed` statements.
    #[must_use]
    pub fn is_due(&self, observed: u64) -> bool {
        self.step.is_some_and(|step| observed % step == 0)
    }
}
