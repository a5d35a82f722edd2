use serde::{Deserialize, Serialize};

/// Ephemeral per-interaction execution state for a coding question. Lives
/// only for one run/test/submit action, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecAction {
    Run,
    Test,
    Save,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecPhase {
    Idle,
    Compiling,
    Executing,
    Testing,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Idle,
    Running(ExecAction),
    Success,
    Failed,
    TimedOut,
}

impl ExecStatus {
    pub fn is_running(self) -> bool {
        matches!(self, ExecStatus::Running(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecProgress {
    pub phase: ExecPhase,
    pub percent: u8,
    pub message: String,
}

impl ExecProgress {
    pub fn new(phase: ExecPhase, percent: u8, message: impl Into<String>) -> Self {
        Self {
            phase,
            percent: percent.min(100),
            message: message.into(),
        }
    }
}
