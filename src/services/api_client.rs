use crate::dto::api_dto::{
    parse_test_results, AlreadySubmittedResponse, CompileRequest, CompileResponse,
    LogEventRequest, RunTestsRequest, SaveAnswerRequest, SaveAnswerResponse,
    SectionStatusResponse, SessionBootstrap, StartSubmissionRequest, SubmitCodeRequest,
    TestCaseResult, ViolationCountResponse,
};
use crate::error::{Error, Result};
use crate::models::answer::AnswerStatus;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Bounded exponential backoff used by the answer-save path: 3 attempts,
/// 1 s / 2 s / 4 s between them, 10 s budget per attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub per_attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            per_attempt_timeout: Duration::from_secs(10),
        }
    }
}

pub async fn retry_with_backoff<T, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = String::new();
    for attempt in 1..=policy.attempts {
        if attempt > 1 {
            let delay = policy.base_delay * 2u32.pow(attempt - 2);
            tokio::time::sleep(delay).await;
        }
        match tokio::time::timeout(policy.per_attempt_timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if e.is_retryable() => {
                tracing::warn!(
                    "{} attempt {}/{} failed: {}",
                    operation,
                    attempt,
                    policy.attempts,
                    e
                );
                last_error = e.to_string();
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                tracing::warn!(
                    "{} attempt {}/{} timed out after {:?}",
                    operation,
                    attempt,
                    policy.attempts,
                    policy.per_attempt_timeout
                );
                last_error = format!("timed out after {:?}", policy.per_attempt_timeout);
            }
        }
    }
    Err(Error::RetriesExhausted {
        operation: operation.to_string(),
        attempts: policy.attempts,
        last_error,
    })
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    compiler_timeout: Duration,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str, compiler_timeout: Duration) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            compiler_timeout,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn api_error(status: StatusCode, body: String) -> Error {
        let message = serde_json::from_str::<JsonValue>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(body);
        if status == StatusCode::BAD_REQUEST
            && message.to_lowercase().contains("already submitted")
        {
            Error::AlreadySubmitted
        } else {
            Error::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::api_error(status, body))
        }
    }

    async fn handle_empty(resp: Response) -> Result<()> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Self::api_error(status, body))
        }
    }

    pub async fn start_submission(
        &self,
        assignment_id: uuid::Uuid,
        screen_resolution: &str,
    ) -> Result<SessionBootstrap> {
        let resp = self
            .client
            .post(self.url(&format!("submissions/start/{}", assignment_id))?)
            .json(&StartSubmissionRequest {
                screen_resolution: screen_resolution.to_string(),
            })
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn resume_submission(&self, submission_id: uuid::Uuid) -> Result<SessionBootstrap> {
        let resp = self
            .client
            .put(self.url(&format!("submissions/resume/{}", submission_id))?)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn save_answer(
        &self,
        submission_id: uuid::Uuid,
        request: &SaveAnswerRequest,
    ) -> Result<SaveAnswerResponse> {
        let resp = self
            .client
            .put(self.url(&format!("submissions/{}/save-answer", submission_id))?)
            .json(request)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn is_already_submitted(
        &self,
        submission_id: uuid::Uuid,
        question_id: uuid::Uuid,
    ) -> Result<bool> {
        let resp = self
            .client
            .post(self.url(&format!("submissions/{}/is-already-submitted", submission_id))?)
            .json(&serde_json::json!({ "question_id": question_id }))
            .send()
            .await?;
        let body: AlreadySubmittedResponse = Self::handle(resp).await?;
        Ok(body.already_submitted)
    }

    pub async fn section_wise_status(
        &self,
        submission_id: uuid::Uuid,
    ) -> Result<SectionStatusResponse> {
        let resp = self
            .client
            .get(self.url(&format!("submissions/section-wise-status/{}", submission_id))?)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn answered_status(
        &self,
        submission_id: uuid::Uuid,
        question_id: uuid::Uuid,
    ) -> Result<AnswerStatus> {
        let mut url = self.url(&format!("submissions/answered-status/{}", submission_id))?;
        url.query_pairs_mut()
            .append_pair("questionId", &question_id.to_string());
        let resp = self.client.get(url).send().await?;
        Self::handle(resp).await
    }

    pub async fn run_test_cases(
        &self,
        question_id: uuid::Uuid,
        request: &RunTestsRequest,
    ) -> Result<Vec<TestCaseResult>> {
        let resp = self
            .client
            .post(self.url(&format!("submissions/test-cases/{}", question_id))?)
            .json(request)
            .send()
            .await?;
        let body: JsonValue = Self::handle(resp).await?;
        parse_test_results(body)
    }

    pub async fn submit_code(
        &self,
        submission_id: uuid::Uuid,
        request: &SubmitCodeRequest,
    ) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("submissions/{}/submitCode", submission_id))?)
            .json(request)
            .send()
            .await?;
        Self::handle_empty(resp).await
    }

    pub async fn submit_submission(&self, submission_id: uuid::Uuid) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&format!("submissions/{}/submit", submission_id))?)
            .send()
            .await?;
        Self::handle_empty(resp).await
    }

    /// Remote execution with custom stdin. Carries its own timeout and no
    /// retry; a stuck run is handled by the caller's watchdog.
    pub async fn run_code(&self, request: &CompileRequest) -> Result<CompileResponse> {
        let resp = self
            .client
            .post(self.url("compiler/")?)
            .timeout(self.compiler_timeout)
            .json(request)
            .send()
            .await?;
        Self::handle(resp).await
    }

    pub async fn log_violation(&self, request: &LogEventRequest) -> Result<()> {
        let resp = self
            .client
            .post(self.url("proctoring/log-event")?)
            .json(request)
            .send()
            .await?;
        Self::handle_empty(resp).await
    }

    pub async fn violation_count(&self, submission_id: uuid::Uuid) -> Result<u32> {
        let resp = self
            .client
            .get(self.url(&format!("proctoring/violations/{}/count", submission_id))?)
            .send()
            .await?;
        let body: ViolationCountResponse = Self::handle(resp).await?;
        Ok(body.count)
    }
}
