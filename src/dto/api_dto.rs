use crate::error::{Error, Result};
use crate::models::answer::AnswerStatus;
use crate::models::question::QuestionType;
use crate::models::section::Section;
use crate::models::submission::Submission;
use crate::models::violation::{SessionInfo, Severity, ViolationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSubmissionRequest {
    pub screen_resolution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: Uuid,
    pub title: String,
    pub duration_minutes: i32,
}

/// Response of both `POST /submissions/start/:assignmentId` and
/// `PUT /submissions/resume/:submissionId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBootstrap {
    pub submission: Submission,
    pub assessment: AssessmentSummary,
    pub test: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnswerRequest {
    pub section_id: Uuid,
    pub question_id: Uuid,
    #[serde(rename = "type")]
    pub answer_type: QuestionType,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub selected_options: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_solution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_answer: Option<String>,
    pub is_marked_for_review: bool,
    pub time_taken_seconds: i64,
    pub is_skipped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnswerResponse {
    pub answer_id: Uuid,
    #[serde(default)]
    pub already_submitted: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlreadySubmittedResponse {
    pub already_submitted: bool,
}

/// `GET /submissions/section-wise-status/:id` — answer statuses keyed by
/// section id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionStatusResponse {
    pub sections: HashMap<Uuid, Vec<AnswerStatus>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTestsRequest {
    pub code: String,
    pub language_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub status: String,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
}

impl TestCaseResult {
    pub fn passed(&self) -> bool {
        self.status.eq_ignore_ascii_case("passed")
            || self.status.eq_ignore_ascii_case("accepted")
    }
}

/// Canonical test-run envelope is `{ "sample_results": [...] }`. Older
/// backend builds answered with `results`, `data`, or a bare array; those
/// are accepted here and nowhere else.
pub fn parse_test_results(body: JsonValue) -> Result<Vec<TestCaseResult>> {
    let array = if let Some(arr) = body.as_array() {
        arr.clone()
    } else if let Some(arr) = body
        .get("sample_results")
        .or_else(|| body.get("results"))
        .or_else(|| body.get("data"))
        .and_then(|v| v.as_array())
    {
        arr.clone()
    } else {
        return Err(Error::BadRequest(format!(
            "Unrecognized test-result envelope: {}",
            body
        )));
    };

    array
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(Error::from))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCodeRequest {
    pub question_id: Uuid,
    pub code: String,
    pub language: String,
    pub language_id: i32,
    pub answer_id: Uuid,
}

/// Judge0-style remote execution payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileRequest {
    pub source_code: String,
    pub language_id: i32,
    pub stdin: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileResponse {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub status: Option<CompileStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileStatus {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEventRequest {
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
pub struct ViolationCountResponse {
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one_result() -> JsonValue {
        json!({
            "status": "passed",
            "input": "1 2",
            "expected_output": "3",
            "actual_output": "3"
        })
    }

    #[test]
    fn parses_all_four_envelope_shapes() {
        for body in [
            json!({ "sample_results": [one_result()] }),
            json!({ "results": [one_result()] }),
            json!({ "data": [one_result()] }),
            json!([one_result()]),
        ] {
            let parsed = parse_test_results(body).expect("envelope accepted");
            assert_eq!(parsed.len(), 1);
            assert!(parsed[0].passed());
        }
    }

    #[test]
    fn rejects_unknown_envelope() {
        let err = parse_test_results(json!({ "verdicts": [] }));
        assert!(err.is_err());
    }

    #[test]
    fn failed_status_is_not_passed() {
        let r = TestCaseResult {
            status: "failed".into(),
            input: "".into(),
            expected_output: "1".into(),
            actual_output: "2".into(),
        };
        assert!(!r.passed());
    }

    #[test]
    fn save_request_omits_empty_channels() {
        let req = SaveAnswerRequest {
            section_id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            answer_type: QuestionType::SingleCorrect,
            selected_options: vec![Uuid::new_v4()],
            code_solution: None,
            code_language: None,
            text_answer: None,
            is_marked_for_review: false,
            time_taken_seconds: 12,
            is_skipped: false,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("code_solution").is_none());
        assert_eq!(v["type"], "single_correct");
    }
}
