use crate::models::question::Question;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered grouping of questions. Immutable for the life of a submission;
/// answer state is tracked separately in `AnswerStatus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub questions: Vec<Question>,
}

impl Section {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}
