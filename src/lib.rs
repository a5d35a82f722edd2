pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod utils;

use crate::dto::api_dto::SessionBootstrap;
use crate::error::Result;
use crate::services::api_client::ApiClient;
use crate::services::pending::PendingWrites;
use crate::session::{JsonFileBackend, MemoryBackend, SessionStore, StorageBackend};
use crate::utils::time::compute_end_time;
use crate::utils::token::generate_session_nonce;
use reqwest::Client;
use std::time::Duration;

/// Shared state for one assessment session: the API client, the persisted
/// session store, and the in-flight write registry. Components receive this
/// the way the backend services receive their pool.
pub struct SessionContext {
    pub api: ApiClient,
    pub store: SessionStore,
    pub pending: PendingWrites,
    pub screen_resolution: String,
    pub user_agent: String,
}

impl SessionContext {
    pub fn new() -> Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let api = ApiClient::new(
            http_client,
            &config.api_base_url,
            Duration::from_secs(config.compiler_timeout_secs),
        )?;
        let backend: Box<dyn StorageBackend> = match &config.session_file {
            Some(path) => Box::new(JsonFileBackend::open(path)),
            None => Box::new(MemoryBackend::new()),
        };
        let store = SessionStore::new(backend, generate_session_nonce(16));
        Ok(Self {
            api,
            store,
            pending: PendingWrites::new(),
            screen_resolution: config.screen_resolution.clone(),
            user_agent: default_user_agent(),
        })
    }

    /// Test and embedding constructor that bypasses the process-wide config.
    pub fn from_parts(api: ApiClient, store: SessionStore) -> Self {
        Self {
            api,
            store,
            pending: PendingWrites::new(),
            screen_resolution: "1920x1080".to_string(),
            user_agent: default_user_agent(),
        }
    }

    /// Start a fresh submission. Stale keys left behind by an interrupted
    /// earlier session are cleared first so they cannot shorten the new
    /// window.
    pub async fn start(&self, assignment_id: uuid::Uuid) -> Result<SessionBootstrap> {
        let bootstrap = self
            .api
            .start_submission(assignment_id, &self.screen_resolution)
            .await?;
        self.store.clear_session();
        self.persist_session(&bootstrap, false);
        Ok(bootstrap)
    }

    /// Resume an interrupted session. The end time is recomputed from the
    /// backend's `timing.started_at` and clamped to any previously persisted
    /// value, so a reload can never extend the session.
    pub async fn resume(&self, submission_id: uuid::Uuid) -> Result<SessionBootstrap> {
        let bootstrap = self.api.resume_submission(submission_id).await?;
        self.persist_session(&bootstrap, true);
        Ok(bootstrap)
    }

    fn persist_session(&self, bootstrap: &SessionBootstrap, clamp_to_previous: bool) {
        let duration = bootstrap.assessment.duration_minutes as i64;
        let mut end = compute_end_time(bootstrap.submission.timing.started_at, duration);
        if clamp_to_previous {
            if let Some(previous) = self.store.end_time() {
                end = end.min(previous);
            }
        }
        self.store.set_submission_id(bootstrap.submission.id);
        self.store.set_duration_minutes(duration);
        self.store.set_end_time(end);
        tracing::info!(
            "Session persisted: submission={} ends at {}",
            bootstrap.submission.id,
            end.to_rfc3339()
        );
    }

    pub async fn shutdown(&self) {
        self.pending.shutdown().await;
    }
}

fn default_user_agent() -> String {
    format!("assessment-client/{}", env!("CARGO_PKG_VERSION"))
}
