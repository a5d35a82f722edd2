use crate::error::{Error, Result};
use crate::utils::time::from_rfc3339;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

const KEY_SUBMISSION_ID: &str = "submission_id";
const KEY_END_TIME: &str = "assessment_end_time";
const KEY_DURATION: &str = "assessment_duration";

/// Narrow persistence seam standing in for browser localStorage. All reads
/// and writes of session keys go through `SessionStore`; nothing else in the
/// crate touches a backend directly.
#[cfg_attr(test, mockall::automock)]
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn clear(&self);
}

#[derive(Default)]
pub struct MemoryBackend {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.map.lock().unwrap().remove(key);
    }

    fn clear(&self) {
        self.map.lock().unwrap().clear();
    }
}

/// File-backed variant for the headless binary. Persistence is best-effort:
/// a failed flush is logged, never surfaced to the answer path.
pub struct JsonFileBackend {
    path: PathBuf,
    map: Mutex<HashMap<String, String>>,
}

impl JsonFileBackend {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            path,
            map: Mutex::new(map),
        }
    }

    fn flush(&self, map: &HashMap<String, String>) {
        match serde_json::to_string_pretty(map) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    tracing::warn!("Failed to persist session file {:?}: {}", self.path, e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize session state: {}", e),
        }
    }
}

impl StorageBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut map = self.map.lock().unwrap();
        map.insert(key.to_string(), value.to_string());
        self.flush(&map);
    }

    fn remove(&self, key: &str) {
        let mut map = self.map.lock().unwrap();
        map.remove(key);
        self.flush(&map);
    }

    fn clear(&self) {
        let mut map = self.map.lock().unwrap();
        map.clear();
        self.flush(&map);
    }
}

/// Typed facade over the backend. Owns the session nonce that namespaces
/// per-question submitted locks, so stale locks from an earlier browser
/// session cannot shadow a fresh one.
pub struct SessionStore {
    backend: Box<dyn StorageBackend>,
    nonce: String,
}

impl SessionStore {
    pub fn new(backend: Box<dyn StorageBackend>, nonce: String) -> Self {
        Self { backend, nonce }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn submission_id(&self) -> Option<Uuid> {
        self.backend
            .get(KEY_SUBMISSION_ID)
            .and_then(|raw| raw.parse().ok())
    }

    pub fn set_submission_id(&self, id: Uuid) {
        self.backend.set(KEY_SUBMISSION_ID, &id.to_string());
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.backend
            .get(KEY_END_TIME)
            .and_then(|raw| from_rfc3339(&raw).ok())
    }

    pub fn set_end_time(&self, end: DateTime<Utc>) {
        self.backend.set(KEY_END_TIME, &end.to_rfc3339());
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.backend
            .get(KEY_DURATION)
            .and_then(|raw| raw.parse().ok())
    }

    pub fn set_duration_minutes(&self, minutes: i64) {
        self.backend.set(KEY_DURATION, &minutes.to_string());
    }

    fn lock_key(&self, submission_id: Uuid, question_id: Uuid) -> String {
        format!("code_submitted:{}:{}:{}", submission_id, question_id, self.nonce)
    }

    pub fn is_question_locked(&self, submission_id: Uuid, question_id: Uuid) -> bool {
        self.backend
            .get(&self.lock_key(submission_id, question_id))
            .as_deref()
            == Some("true")
    }

    pub fn lock_question(&self, submission_id: Uuid, question_id: Uuid) {
        self.backend
            .set(&self.lock_key(submission_id, question_id), "true");
    }

    /// Fail-closed session check: without a submission id and a persisted
    /// end time there is nothing valid to render.
    pub fn validate(&self) -> Result<(Uuid, DateTime<Utc>)> {
        let id = self
            .submission_id()
            .ok_or_else(|| Error::SessionInvalid("no persisted submission id".into()))?;
        let end = self
            .end_time()
            .ok_or_else(|| Error::SessionInvalid("no persisted end time".into()))?;
        Ok((id, end))
    }

    pub fn clear_session(&self) {
        self.backend.remove(KEY_SUBMISSION_ID);
        self.backend.remove(KEY_END_TIME);
        self.backend.remove(KEY_DURATION);
    }
}
