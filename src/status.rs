//! Per-module pipeline status
//!
//! Build-script and parcelize rewrites must run once per module even when
//! many files of that module migrate in parallel. The tracker is an
//! explicit context object handed into each call; it lives for one batch
//! invocation only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    BuildScript,
    Parcelize,
}

#[derive(Debug, Default)]
pub struct StatusTracker {
    states: Mutex<HashMap<(PathBuf, Pipeline), MigrationStatus>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a pipeline for a module. Returns true for the caller that
    /// gets to run it; everyone else sees InProgress/Done and backs off.
    pub fn try_begin(&self, module: &Path, pipeline: Pipeline) -> bool {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states
            .entry((module.to_path_buf(), pipeline))
            .or_default();
        if *state == MigrationStatus::NotStarted {
            *state = MigrationStatus::InProgress;
            true
        } else {
            false
        }
    }

    pub fn complete(&self, module: &Path, pipeline: Pipeline) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.insert((module.to_path_buf(), pipeline), MigrationStatus::Done);
    }

    /// Failure reverts to NotStarted so a later file of the same module
    /// can retry.
    pub fn fail(&self, module: &Path, pipeline: Pipeline) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.insert((module.to_path_buf(), pipeline), MigrationStatus::NotStarted);
    }

    pub fn status(&self, module: &Path, pipeline: Pipeline) -> MigrationStatus {
        let states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states
            .get(&(module.to_path_buf(), pipeline))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_once() {
        let tracker = StatusTracker::new();
        let module = Path::new("/app");
        assert!(tracker.try_begin(module, Pipeline::BuildScript));
        assert!(!tracker.try_begin(module, Pipeline::BuildScript));
        // the other pipeline of the same module is independent
        assert!(tracker.try_begin(module, Pipeline::Parcelize));
    }

    #[test]
    fn test_fail_allows_retry() {
        let tracker = StatusTracker::new();
        let module = Path::new("/app");
        assert!(tracker.try_begin(module, Pipeline::BuildScript));
        tracker.fail(module, Pipeline::BuildScript);
        assert_eq!(
            tracker.status(module, Pipeline::BuildScript),
            MigrationStatus::NotStarted
        );
        assert!(tracker.try_begin(module, Pipeline::BuildScript));
    }

    #[test]
    fn test_complete_is_terminal() {
        let tracker = StatusTracker::new();
        let module = Path::new("/app");
        assert!(tracker.try_begin(module, Pipeline::BuildScript));
        tracker.complete(module, Pipeline::BuildScript);
        assert!(!tracker.try_begin(module, Pipeline::BuildScript));
        assert_eq!(
            tracker.status(module, Pipeline::BuildScript),
            MigrationStatus::Done
        );
    }
}
