//! Progress reporting utilities using indicatif.
//!
//! The rebuild reports progress through [`ProgressReporter`]. [`Progress`]
//! renders one bar per scope in the terminal; [`RecordingProgress`] keeps
//! the calls for inspection in tests.

use std::cell::RefCell;

use indicatif::{ProgressBar, ProgressStyle};

use crate::store::Scope;

/// Receives progress of a cache rebuild.
pub trait ProgressReporter {
    /// Called when a scope starts, with the number of statements it holds.
    fn on_scope_start(&self, scope: &Scope, total: u64);

    /// Called with the number of statements observed so far in the scope.
    ///
    /// Must tolerate repeated and non-monotonic counts.
    fn update(&self, count: u64);

    /// Called when a scope has been fully written.
    fn on_scope_end(&self, scope: &Scope, count: u64);

    /// Called instead of [`on_scope_end`](Self::on_scope_end) when the scope
    /// failed after `count` statements.
    fn on_scope_abort(&self, scope: &Scope, count: u64);
}

/// Terminal progress bars.
pub struct Progress {
    bar: RefCell<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use updatecache::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: RefCell::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:70.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
    }
}

impl ProgressReporter for Progress {
    fn on_scope_start(&self, scope: &Scope, total: u64) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(total);
        pb.set_style(Self::style());
        pb.set_message(format!("Updating entries for {scope}"));
        if let Some(previous) = self.bar.replace(Some(pb)) {
            previous.finish_and_clear();
        }
    }

    fn update(&self, count: u64) {
        if let Some(ref pb) = *self.bar.borrow() {
            pb.set_position(count);
        }
    }

    fn on_scope_end(&self, scope: &Scope, count: u64) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.set_position(count);
            pb.finish_with_message(format!("Updated entries for {scope}"));
        }
    }

    fn on_scope_abort(&self, scope: &Scope, count: u64) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.set_position(count);
            pb.abandon_with_message(format!("Aborted updating entries for {scope}"));
        }
    }
}

/// A progress call recorded by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// `on_scope_start(scope, total)`
    Start {
        /// Dataset name, `""` for all datasets
        scope: String,
        /// Statements in the scope
        total: u64,
    },
    /// `update(count)`
    Update(u64),
    /// `on_scope_end(scope, count)`
    End {
        /// Dataset name, `""` for all datasets
        scope: String,
        /// Statements observed
        count: u64,
    },
    /// `on_scope_abort(scope, count)`
    Abort {
        /// Dataset name, `""` for all datasets
        scope: String,
        /// Statements observed before the failure
        count: u64,
    },
}

/// Reporter that records every call.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: RefCell<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls, in order.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.borrow().clone()
    }

    /// Events recorded between the start and end of the scope named `scope`.
    #[must_use]
    pub fn updates_for(&self, scope: &str) -> Vec<u64> {
        let mut inside = false;
        let mut updates = Vec::new();
        for event in self.events.borrow().iter() {
            match event {
                ProgressEvent::Start { scope: s, .. } => inside = s == scope,
                ProgressEvent::Update(n) if inside => updates.push(*n),
                ProgressEvent::End { scope: s, .. } | ProgressEvent::Abort { scope: s, .. }
                    if s == scope =>
                {
                    inside = false
                }
                _ => {}
            }
        }
        updates
    }
}

impl ProgressReporter for RecordingProgress {
    fn on_scope_start(&self, scope: &Scope, total: u64) {
        self.events.borrow_mut().push(ProgressEvent::Start {
            scope: scope.name().to_string(),
            total,
        });
    }

    fn update(&self, count: u64) {
        self.events.borrow_mut().push(ProgressEvent::Update(count));
    }

    fn on_scope_end(&self, scope: &Scope, count: u64) {
        self.events.borrow_mut().push(ProgressEvent::End {
            scope: scope.name().to_string(),
            count,
        });
    }

    fn on_scope_abort(&self, scope: &Scope, count: u64) {
        self.events.borrow_mut().push(ProgressEvent::Abort {
            scope: scope.name().to_string(),
            count,
        });
    }
}
