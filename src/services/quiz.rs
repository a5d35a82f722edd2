use crate::dto::api_dto::SaveAnswerRequest;
use crate::error::{Error, Result};
use crate::models::events::{ToastLevel, UiEffect};
use crate::models::question::{Question, QuestionType};
use crate::services::api_client::{retry_with_backoff, RetryPolicy};
use crate::SessionContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct QuizTiming {
    pub debounce: Duration,
    pub retry: RetryPolicy,
}

impl Default for QuizTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizSaveState {
    Idle,
    Saving,
    Saved,
    Failed,
}

/// Answer state for one non-coding question. Saves are debounced so rapid
/// clicks coalesce, and run under a blocking overlay so a second save
/// cannot start while one is in flight.
pub struct QuizAnswer {
    submission_id: Uuid,
    section_id: Uuid,
    question_id: Uuid,
    answer_type: QuestionType,
    selected: Vec<Uuid>,
    text: Option<String>,
    marked_for_review: bool,
    entered_at: Instant,
    timing: QuizTiming,
    save_state: Arc<Mutex<QuizSaveState>>,
    pending: Option<(JoinHandle<()>, Arc<AtomicBool>)>,
    save_gate: Arc<tokio::sync::Mutex<()>>,
}

impl QuizAnswer {
    pub fn new(submission_id: Uuid, question: &Question) -> Result<Self> {
        match question.question_type {
            QuestionType::SingleCorrect | QuestionType::MultiCorrect | QuestionType::Descriptive => {}
            QuestionType::Coding => {
                return Err(Error::BadRequest(
                    "coding questions use the execution workflow".into(),
                ))
            }
        }
        Ok(Self {
            submission_id,
            section_id: question.section_id,
            question_id: question.id,
            answer_type: question.question_type,
            selected: Vec::new(),
            text: None,
            marked_for_review: false,
            entered_at: Instant::now(),
            timing: QuizTiming::default(),
            save_state: Arc::new(Mutex::new(QuizSaveState::Idle)),
            pending: None,
            save_gate: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    pub fn with_timing(mut self, timing: QuizTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn selected(&self) -> &[Uuid] {
        &self.selected
    }

    pub fn is_marked_for_review(&self) -> bool {
        self.marked_for_review
    }

    pub fn save_state(&self) -> QuizSaveState {
        *self.save_state.lock().unwrap()
    }

    fn has_answer(&self) -> bool {
        !self.selected.is_empty()
            || self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Single-correct replaces the whole selection; multi-correct toggles
    /// membership.
    pub fn select_option(&mut self, option: Uuid) {
        match self.answer_type {
            QuestionType::MultiCorrect => {
                if let Some(pos) = self.selected.iter().position(|&o| o == option) {
                    self.selected.remove(pos);
                } else {
                    self.selected.push(option);
                }
            }
            _ => {
                self.selected.clear();
                self.selected.push(option);
            }
        }
    }

    pub fn set_text_answer(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Marking for review requires something to review.
    pub fn mark_for_review(&mut self) -> Result<()> {
        if !self.has_answer() {
            return Err(Error::BadRequest(
                "select an answer before marking for review".into(),
            ));
        }
        self.marked_for_review = true;
        Ok(())
    }

    pub fn unmark_for_review(&mut self) {
        self.marked_for_review = false;
    }

    fn save_request(&self) -> SaveAnswerRequest {
        SaveAnswerRequest {
            section_id: self.section_id,
            question_id: self.question_id,
            answer_type: self.answer_type,
            selected_options: self.selected.clone(),
            code_solution: None,
            code_language: None,
            text_answer: self.text.clone(),
            is_marked_for_review: self.marked_for_review,
            time_taken_seconds: self.entered_at.elapsed().as_secs() as i64,
            is_skipped: !self.has_answer(),
        }
    }

    /// Schedule a debounced save. A newer call cancels a save still inside
    /// its debounce window; a save that has already fired is never aborted,
    /// it resolves and the newer payload queues behind it on the save gate.
    pub fn schedule_save(&mut self, ctx: &SessionContext, effects: &mpsc::Sender<UiEffect>) {
        if let Some((previous, fired)) = self.pending.take() {
            if !fired.load(Ordering::SeqCst) && !previous.is_finished() {
                previous.abort();
            }
        }

        let api = ctx.api.clone();
        let submission_id = self.submission_id;
        let request = self.save_request();
        let timing = self.timing.clone();
        let state = self.save_state.clone();
        let effects = effects.clone();
        let gate = self.save_gate.clone();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = fired.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(timing.debounce).await;
            fired_flag.store(true, Ordering::SeqCst);
            let _slot = gate.lock().await;
            *state.lock().unwrap() = QuizSaveState::Saving;
            let _ = effects.send(UiEffect::SavingOverlay(true)).await;

            let result = retry_with_backoff("save-answer", &timing.retry, || {
                let api = api.clone();
                let request = request.clone();
                async move { api.save_answer(submission_id, &request).await }
            })
            .await;

            let _ = effects.send(UiEffect::SavingOverlay(false)).await;
            match result {
                Ok(_) => {
                    *state.lock().unwrap() = QuizSaveState::Saved;
                }
                Err(e) => {
                    *state.lock().unwrap() = QuizSaveState::Failed;
                    tracing::warn!("Quiz answer save failed: {}", e);
                    let _ = effects
                        .send(UiEffect::toast(
                            ToastLevel::Error,
                            "Could not save your answer. Please retry.",
                        ))
                        .await;
                }
            }
        });
        self.pending = Some((handle, fired));
    }

    /// Await the in-flight save, if any. Used on navigation away and in
    /// tests.
    pub async fn flush(&mut self) {
        if let Some((handle, _)) = self.pending.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{ChoiceDetails, QuestionDetails, QuestionPrompt};

    fn question(question_type: QuestionType) -> Question {
        let section_id = Uuid::new_v4();
        Question {
            id: Uuid::new_v4(),
            section_id,
            question_type,
            marks: 1,
            prompt: QuestionPrompt {
                text: "pick".into(),
                image_urls: vec![],
            },
            details: QuestionDetails::Choice(ChoiceDetails { options: vec![] }),
        }
    }

    #[test]
    fn single_correct_replaces_selection() {
        let mut quiz = QuizAnswer::new(Uuid::new_v4(), &question(QuestionType::SingleCorrect))
            .unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        quiz.select_option(a);
        quiz.select_option(b);
        assert_eq!(quiz.selected(), &[b]);
    }

    #[test]
    fn multi_correct_toggles_membership() {
        let mut quiz =
            QuizAnswer::new(Uuid::new_v4(), &question(QuestionType::MultiCorrect)).unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        quiz.select_option(a);
        quiz.select_option(b);
        assert_eq!(quiz.selected(), &[a, b]);
        quiz.select_option(a);
        assert_eq!(quiz.selected(), &[b]);
    }

    #[test]
    fn mark_for_review_requires_a_selection() {
        let mut quiz = QuizAnswer::new(Uuid::new_v4(), &question(QuestionType::SingleCorrect))
            .unwrap();
        assert!(quiz.mark_for_review().is_err());
        quiz.select_option(Uuid::new_v4());
        assert!(quiz.mark_for_review().is_ok());
        assert!(quiz.is_marked_for_review());
    }

    #[test]
    fn descriptive_answers_count_text() {
        let mut quiz =
            QuizAnswer::new(Uuid::new_v4(), &question(QuestionType::Descriptive)).unwrap();
        assert!(quiz.mark_for_review().is_err());
        quiz.set_text_answer("an essay");
        assert!(quiz.mark_for_review().is_ok());
    }

    #[test]
    fn coding_questions_are_rejected() {
        let q = question(QuestionType::Coding);
        assert!(QuizAnswer::new(Uuid::new_v4(), &q).is_err());
    }
}
