use crate::dto::api_dto::{
    CompileRequest, CompileResponse, RunTestsRequest, SaveAnswerRequest, SaveAnswerResponse,
    SubmitCodeRequest, TestCaseResult,
};
use crate::error::{Error, Result};
use crate::models::events::{ToastLevel, UiEffect};
use crate::models::execution::{ExecAction, ExecPhase, ExecProgress, ExecStatus};
use crate::models::question::{CodingDetails, LanguageOption, Question, QuestionType};
use crate::SessionContext;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Editors holding more code than this get a confirmation before a language
/// switch may discard it.
const LANGUAGE_SWITCH_CONFIRM_THRESHOLD: usize = 50;

/// Blocking decision point at the engine boundary (the browser `confirm`).
pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct ExecTiming {
    /// Forcibly resets a stuck progress overlay even if the underlying
    /// request never resolves.
    pub watchdog: Duration,
    pub progress_step: Duration,
}

impl Default for ExecTiming {
    fn default() -> Self {
        Self {
            watchdog: Duration::from_secs(60),
            progress_step: Duration::from_millis(700),
        }
    }
}

/// Per-coding-question editor and run/save/submit state machine.
pub struct CodeExecution {
    submission_id: Uuid,
    section_id: Uuid,
    question_id: Uuid,
    details: CodingDetails,
    editor_code: String,
    language: LanguageOption,
    run_status: ExecStatus,
    save_status: ExecStatus,
    submit_status: ExecStatus,
    is_submitted: bool,
    entered_at: Instant,
    timing: ExecTiming,
}

impl CodeExecution {
    pub fn new(submission_id: Uuid, question: &Question) -> Result<Self> {
        let details = question
            .coding_details()
            .ok_or_else(|| Error::BadRequest("not a coding question".into()))?
            .clone();
        let language = details
            .languages
            .first()
            .cloned()
            .ok_or_else(|| Error::BadRequest("coding question has no languages".into()))?;
        Ok(Self {
            submission_id,
            section_id: question.section_id,
            question_id: question.id,
            editor_code: language.template.clone(),
            language,
            details,
            run_status: ExecStatus::Idle,
            save_status: ExecStatus::Idle,
            submit_status: ExecStatus::Idle,
            is_submitted: false,
            entered_at: Instant::now(),
            timing: ExecTiming::default(),
        })
    }

    pub fn with_timing(mut self, timing: ExecTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Restore state fetched from the backend when revisiting a question.
    pub fn restore(&mut self, code: Option<String>, language_name: Option<&str>, submitted: bool) {
        if let Some(code) = code {
            if !code.is_empty() {
                self.editor_code = code;
            }
        }
        if let Some(name) = language_name {
            if let Some(lang) = self.details.languages.iter().find(|l| l.name == name) {
                self.language = lang.clone();
            }
        }
        self.is_submitted = submitted;
    }

    /// Pull the persisted answer for this question and restore from it,
    /// including the submitted lock, when revisiting after navigation or a
    /// reload.
    pub async fn hydrate(&mut self, ctx: &SessionContext) -> Result<()> {
        let status = ctx
            .api
            .answered_status(self.submission_id, self.question_id)
            .await?;
        let submitted = status.is_submitted
            || ctx
                .api
                .is_already_submitted(self.submission_id, self.question_id)
                .await?;
        self.restore(status.code_solution, status.code_language.as_deref(), submitted);
        if submitted {
            ctx.store.lock_question(self.submission_id, self.question_id);
        }
        Ok(())
    }

    pub fn editor_code(&self) -> &str {
        &self.editor_code
    }

    pub fn set_editor_code(&mut self, code: impl Into<String>) -> Result<()> {
        if self.is_submitted {
            return Err(Error::AlreadySubmitted);
        }
        self.editor_code = code.into();
        Ok(())
    }

    pub fn language(&self) -> &LanguageOption {
        &self.language
    }

    pub fn statuses(&self) -> (ExecStatus, ExecStatus, ExecStatus) {
        (self.run_status, self.save_status, self.submit_status)
    }

    pub fn is_submitted(&self) -> bool {
        self.is_submitted
    }

    pub fn reset_timer(&mut self) {
        self.entered_at = Instant::now();
    }

    fn elapsed_seconds(&self) -> i64 {
        self.entered_at.elapsed().as_secs() as i64
    }

    fn ensure_unlocked(&mut self, ctx: &SessionContext) -> Result<()> {
        if self.is_submitted || ctx.store.is_question_locked(self.submission_id, self.question_id)
        {
            self.is_submitted = true;
            return Err(Error::AlreadySubmitted);
        }
        Ok(())
    }

    fn lock(&mut self, ctx: &SessionContext) {
        self.is_submitted = true;
        ctx.store.lock_question(self.submission_id, self.question_id);
    }

    /// Switch the editor language. With substantial code present the
    /// candidate chooses between keeping it and loading the new template;
    /// either way the language tag used by subsequent saves changes.
    pub fn switch_language(
        &mut self,
        language_id: i32,
        prompt: &dyn ConfirmPrompt,
    ) -> Result<()> {
        if self.is_submitted {
            return Err(Error::AlreadySubmitted);
        }
        let next = self
            .details
            .languages
            .iter()
            .find(|l| l.language_id == language_id)
            .cloned()
            .ok_or_else(|| {
                Error::BadRequest(format!("language {} not offered here", language_id))
            })?;
        let keep_code = self.editor_code.chars().count() > LANGUAGE_SWITCH_CONFIRM_THRESHOLD
            && prompt.confirm("Keep your current code for the new language?");
        if !keep_code {
            self.editor_code = next.template.clone();
        }
        self.language = next;
        Ok(())
    }

    fn save_request(&self) -> SaveAnswerRequest {
        SaveAnswerRequest {
            section_id: self.section_id,
            question_id: self.question_id,
            answer_type: QuestionType::Coding,
            selected_options: vec![],
            code_solution: Some(self.editor_code.clone()),
            code_language: Some(self.language.name.clone()),
            text_answer: None,
            is_marked_for_review: false,
            time_taken_seconds: self.elapsed_seconds(),
            is_skipped: self.editor_code.trim().is_empty(),
        }
    }

    /// Persist the current editor state. A backend "already submitted"
    /// rejection flips the local lock instead of surfacing as a crash.
    pub async fn save(&mut self, ctx: &SessionContext) -> Result<SaveAnswerResponse> {
        self.ensure_unlocked(ctx)?;
        self.save_status = ExecStatus::Running(ExecAction::Save);
        let request = self.save_request();
        match ctx.api.save_answer(self.submission_id, &request).await {
            Ok(response) => {
                self.save_status = ExecStatus::Success;
                if response.already_submitted {
                    self.lock(ctx);
                }
                Ok(response)
            }
            Err(Error::AlreadySubmitted) => {
                self.save_status = ExecStatus::Failed;
                self.lock(ctx);
                Err(Error::AlreadySubmitted)
            }
            Err(e) => {
                self.save_status = ExecStatus::Failed;
                Err(e)
            }
        }
    }

    /// Run the editor code against custom stdin. The progress overlay is
    /// simulated independently of the network call; completion is whatever
    /// the call returns, and the watchdog resets a stuck overlay.
    pub async fn run_custom_input(
        &mut self,
        ctx: &SessionContext,
        effects: &mpsc::Sender<UiEffect>,
        stdin: String,
    ) -> Result<CompileResponse> {
        self.ensure_unlocked(ctx)?;
        self.run_status = ExecStatus::Running(ExecAction::Run);

        let ticker = spawn_progress_ticker(effects.clone(), self.timing.progress_step);
        let request = CompileRequest {
            source_code: self.editor_code.clone(),
            language_id: self.language.language_id,
            stdin,
        };
        let outcome = tokio::time::timeout(self.timing.watchdog, ctx.api.run_code(&request)).await;
        ticker.abort();

        match outcome {
            Ok(Ok(response)) => {
                self.run_status = ExecStatus::Success;
                let _ = effects
                    .send(UiEffect::ExecProgress(ExecProgress::new(
                        ExecPhase::Idle,
                        100,
                        "Execution complete",
                    )))
                    .await;
                Ok(response)
            }
            Ok(Err(e)) => {
                self.run_status = ExecStatus::Failed;
                let _ = effects
                    .send(UiEffect::toast(
                        ToastLevel::Error,
                        format!("Run failed: {}", e),
                    ))
                    .await;
                Err(e)
            }
            Err(_) => {
                self.run_status = ExecStatus::TimedOut;
                let _ = effects
                    .send(UiEffect::ExecProgress(ExecProgress::new(
                        ExecPhase::Idle,
                        0,
                        "Execution timed out",
                    )))
                    .await;
                let _ = effects
                    .send(UiEffect::toast(
                        ToastLevel::Error,
                        "Code execution timed out, please try again",
                    ))
                    .await;
                Err(Error::Timeout("code execution".into()))
            }
        }
    }

    /// Run the question's sample tests. Always saves first so the tested
    /// code is the persisted code.
    pub async fn run_sample_tests(
        &mut self,
        ctx: &SessionContext,
        effects: &mpsc::Sender<UiEffect>,
    ) -> Result<Vec<TestCaseResult>> {
        self.ensure_unlocked(ctx)?;
        self.save(ctx).await?;
        self.run_status = ExecStatus::Running(ExecAction::Test);

        let request = RunTestsRequest {
            code: self.editor_code.clone(),
            language_id: self.language.language_id,
        };
        match ctx.api.run_test_cases(self.question_id, &request).await {
            Ok(results) => {
                self.run_status = ExecStatus::Success;
                let passed = results.iter().filter(|r| r.passed()).count();
                let total = results.len();
                let effect = if passed == total && total > 0 {
                    UiEffect::toast(
                        ToastLevel::Info,
                        format!("All sample tests passed ({}/{})", passed, total),
                    )
                } else {
                    UiEffect::toast(
                        ToastLevel::Warning,
                        format!("{} of {} sample tests passed", passed, total),
                    )
                };
                let _ = effects.send(effect).await;
                Ok(results)
            }
            Err(e) => {
                self.run_status = ExecStatus::Failed;
                let _ = effects
                    .send(UiEffect::toast(
                        ToastLevel::Error,
                        format!("Sample test run failed: {}", e),
                    ))
                    .await;
                Err(e)
            }
        }
    }

    /// Final submit: save-then-evaluate. On success the question is locked
    /// locally and in the store, and stays locked across reloads.
    pub async fn submit_final(
        &mut self,
        ctx: &SessionContext,
        effects: &mpsc::Sender<UiEffect>,
    ) -> Result<()> {
        self.ensure_unlocked(ctx)?;
        self.submit_status = ExecStatus::Running(ExecAction::Submit);

        let saved = match self.save(ctx).await {
            Ok(saved) => saved,
            Err(e) => {
                self.submit_status = ExecStatus::Failed;
                return Err(e);
            }
        };
        if saved.already_submitted {
            self.submit_status = ExecStatus::Failed;
            return Err(Error::AlreadySubmitted);
        }

        let request = SubmitCodeRequest {
            question_id: self.question_id,
            code: self.editor_code.clone(),
            language: self.language.name.clone(),
            language_id: self.language.language_id,
            answer_id: saved.answer_id,
        };
        match ctx.api.submit_code(self.submission_id, &request).await {
            Ok(()) => {
                self.lock(ctx);
                self.submit_status = ExecStatus::Success;
                let _ = effects
                    .send(UiEffect::toast(ToastLevel::Info, "Solution submitted for evaluation"))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.submit_status = ExecStatus::Failed;
                let _ = effects
                    .send(UiEffect::toast(
                        ToastLevel::Error,
                        format!("Submit failed: {}", e),
                    ))
                    .await;
                Err(e)
            }
        }
    }
}

/// Perceived-responsiveness ticker: compiling then executing, on a clock
/// unrelated to the actual network latency.
fn spawn_progress_ticker(
    effects: mpsc::Sender<UiEffect>,
    step: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let stages = [
            ExecProgress::new(ExecPhase::Compiling, 15, "Compiling..."),
            ExecProgress::new(ExecPhase::Compiling, 35, "Compiling..."),
            ExecProgress::new(ExecPhase::Executing, 55, "Executing..."),
            ExecProgress::new(ExecPhase::Executing, 75, "Executing..."),
            ExecProgress::new(ExecPhase::Executing, 90, "Almost there..."),
        ];
        for stage in stages {
            let _ = effects.send(UiEffect::ExecProgress(stage)).await;
            tokio::time::sleep(step).await;
        }
    })
}
