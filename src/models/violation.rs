use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TabSwitch,
    WindowBlur,
    FullscreenExit,
    PageReload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl ViolationKind {
    pub fn severity(self) -> Severity {
        match self {
            ViolationKind::TabSwitch => Severity::High,
            ViolationKind::WindowBlur => Severity::Medium,
            ViolationKind::FullscreenExit => Severity::High,
            ViolationKind::PageReload => Severity::Critical,
        }
    }
}

/// One proctoring anomaly, append-only on the backend. The running count,
/// not the individual records, is the enforcement signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub submission_id: Uuid,
    pub student_id: Uuid,
    pub assignment_id: Uuid,
    pub event_type: ViolationKind,
    pub severity: Severity,
    pub event_details: String,
    pub session_info: SessionInfo,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub screen_resolution: String,
    pub user_agent: String,
}
