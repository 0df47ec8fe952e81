use std::fmt;

use crate::error::SnapError;

/// Lifecycle shared by the decode and encode stages. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageState {
    Idle,
    Opened,
    Configured,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageState::Idle => "idle",
            StageState::Opened => "opened",
            StageState::Configured => "configured",
            StageState::Running => "running",
            StageState::Completed => "completed",
            StageState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one stage run and logs every failure with the step it happened in.
#[derive(Debug)]
pub(crate) struct StageTracker {
    stage: &'static str,
    state: StageState,
}

impl StageTracker {
    pub(crate) fn new(stage: &'static str) -> Self {
        Self {
            stage,
            state: StageState::Idle,
        }
    }

    pub(crate) fn state(&self) -> StageState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: StageState) {
        debug_assert!(
            next > self.state && self.state < StageState::Completed,
            "{} stage cannot move from {} to {}",
            self.stage,
            self.state,
            next
        );
        log::trace!("{} stage: {} -> {}", self.stage, self.state, next);
        self.state = next;
    }

    /// Marks the stage failed and passes the error through.
    pub(crate) fn fail(&mut self, step: &str, err: SnapError) -> SnapError {
        log::error!("{} stage failed at {} ({}): {}", self.stage, step, self.state, err);
        self.state = StageState::Failed;
        err
    }
}
