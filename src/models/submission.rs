use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub candidate_id: Uuid,
    pub timing: SubmissionTiming,
    #[serde(default = "default_attempt")]
    pub attempt_number: i32,
    pub status: SubmissionStatus,
}

fn default_attempt() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionTiming {
    pub started_at: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// `Submitted` is terminal; no save/run/submit call is valid past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    InProgress,
    Submitted,
}

impl Submission {
    pub fn is_terminal(&self) -> bool {
        self.status == SubmissionStatus::Submitted
    }
}
