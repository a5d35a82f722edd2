use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-question answer record as the backend reports it. Single source of
/// truth for the navigation-palette coloring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerStatus {
    pub question_id: Uuid,
    #[serde(default)]
    pub selected_options: Vec<Uuid>,
    #[serde(default)]
    pub text_answer: Option<String>,
    #[serde(default)]
    pub code_solution: Option<String>,
    #[serde(default)]
    pub code_language: Option<String>,
    #[serde(default)]
    pub is_marked_for_review: bool,
    #[serde(default)]
    pub is_skipped: bool,
    #[serde(default)]
    pub is_submitted: bool,
}

impl AnswerStatus {
    /// A question counts as answered when any of the three answer channels
    /// is non-empty.
    pub fn has_answer(&self) -> bool {
        !self.selected_options.is_empty()
            || self
                .code_solution
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
            || self
                .text_answer
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteState {
    Current,
    MarkedForReview,
    Answered,
    UnansweredVisited,
    NotVisited,
}

/// Palette classification with strict priority:
/// current > marked-for-review > answered > visited-but-unanswered > not-visited.
pub fn classify_palette(
    question_id: Uuid,
    current_question_id: Uuid,
    status: Option<&AnswerStatus>,
    visited: bool,
) -> PaletteState {
    if question_id == current_question_id {
        return PaletteState::Current;
    }
    if let Some(s) = status {
        if s.is_marked_for_review {
            return PaletteState::MarkedForReview;
        }
        if s.has_answer() {
            return PaletteState::Answered;
        }
    }
    if visited {
        PaletteState::UnansweredVisited
    } else {
        PaletteState::NotVisited
    }
}
