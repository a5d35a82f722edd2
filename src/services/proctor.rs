use crate::dto::api_dto::LogEventRequest;
use crate::models::events::{BrowserEvent, Route, ToastLevel, UiEffect};
use crate::models::violation::{SessionInfo, ViolationKind};
use crate::SessionContext;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

/// Hard cap on logged violations before forced termination.
pub const MAX_VIOLATIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct ProctorConfig {
    pub threshold: u32,
    /// A blur arriving this soon after a tab switch is the same gesture and
    /// is not double-counted.
    pub blur_suppression: Duration,
    pub fullscreen_warning: Duration,
    pub fullscreen_violation: Duration,
    pub idle_after: Duration,
    pub termination_grace: Duration,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            threshold: MAX_VIOLATIONS,
            blur_suppression: Duration::from_secs(1),
            fullscreen_warning: Duration::from_secs(5),
            fullscreen_violation: Duration::from_secs(10),
            idle_after: Duration::from_secs(120),
            termination_grace: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProctorIds {
    pub submission_id: Uuid,
    pub student_id: Uuid,
    pub assignment_id: Uuid,
}

/// Independent observer of browser-level behavior. Never on the navigation
/// critical path: a failed log call drops the violation and the candidate
/// keeps typing.
pub struct ProctorMonitor {
    ctx: Arc<SessionContext>,
    config: ProctorConfig,
    ids: ProctorIds,
    effects: mpsc::Sender<UiEffect>,
    last_tab_switch: Option<Instant>,
    last_activity: Instant,
    in_fullscreen: bool,
    warning_deadline: Option<Instant>,
    violation_deadline: Option<Instant>,
    terminated: bool,
}

async fn maybe_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl ProctorMonitor {
    pub fn new(
        ctx: Arc<SessionContext>,
        ids: ProctorIds,
        config: ProctorConfig,
        effects: mpsc::Sender<UiEffect>,
    ) -> Self {
        Self {
            ctx,
            config,
            ids,
            effects,
            last_tab_switch: None,
            last_activity: Instant::now(),
            in_fullscreen: true,
            warning_deadline: None,
            violation_deadline: None,
            terminated: false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<BrowserEvent>) {
        loop {
            let idle_at = self.last_activity + self.config.idle_after;
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                _ = maybe_sleep(self.warning_deadline) => {
                    self.warning_deadline = None;
                    self.toast(ToastLevel::Warning, "Return to fullscreen to continue your assessment")
                        .await;
                }
                _ = maybe_sleep(self.violation_deadline) => {
                    self.violation_deadline = None;
                    self.record(ViolationKind::FullscreenExit, "Fullscreen not re-entered within the grace period")
                        .await;
                }
                _ = tokio::time::sleep_until(idle_at) => {
                    self.last_activity = Instant::now();
                    self.toast(ToastLevel::Warning, "No activity detected for 2 minutes")
                        .await;
                }
            }
            if self.terminated {
                break;
            }
        }
    }

    pub async fn handle_event(&mut self, event: BrowserEvent) {
        if self.terminated {
            return;
        }
        match event {
            BrowserEvent::VisibilityHidden => {
                self.last_tab_switch = Some(Instant::now());
                self.record(ViolationKind::TabSwitch, "Tab hidden").await;
            }
            BrowserEvent::VisibilityVisible | BrowserEvent::WindowFocus => {
                self.last_activity = Instant::now();
            }
            BrowserEvent::WindowBlur => {
                let shadowed = self
                    .last_tab_switch
                    .is_some_and(|at| at.elapsed() <= self.config.blur_suppression);
                if !shadowed {
                    self.record(ViolationKind::WindowBlur, "Window lost focus").await;
                }
            }
            BrowserEvent::FullscreenExited => {
                self.in_fullscreen = false;
                self.warning_deadline = Some(Instant::now() + self.config.fullscreen_warning);
                self.violation_deadline = Some(Instant::now() + self.config.fullscreen_violation);
            }
            BrowserEvent::FullscreenEntered => {
                self.in_fullscreen = true;
                self.warning_deadline = None;
                self.violation_deadline = None;
            }
            BrowserEvent::BeforeUnload => {
                let _ = self.effects.send(UiEffect::PreventUnload).await;
                self.record(ViolationKind::PageReload, "Page unload attempted").await;
            }
            BrowserEvent::Copy => {
                self.toast(ToastLevel::Warning, "Copying is not allowed during the assessment")
                    .await;
            }
            BrowserEvent::Paste => {
                self.toast(ToastLevel::Warning, "Pasting is not allowed during the assessment")
                    .await;
            }
            BrowserEvent::ContextMenu => {
                self.toast(ToastLevel::Warning, "Right-click is disabled during the assessment")
                    .await;
            }
            BrowserEvent::KeyDown(combo) => {
                self.last_activity = Instant::now();
                if combo.is_suppressed() {
                    self.toast(ToastLevel::Warning, "This shortcut is disabled during the assessment")
                        .await;
                }
            }
            BrowserEvent::Activity => {
                self.last_activity = Instant::now();
            }
        }
    }

    /// Log one violation and enforce the cap against the backend's count.
    /// Logging failures drop the violation silently; proctoring is advisory.
    async fn record(&mut self, kind: ViolationKind, details: &str) {
        if self.terminated {
            return;
        }
        let request = LogEventRequest {
            submission_id: self.ids.submission_id,
            student_id: self.ids.student_id,
            assignment_id: self.ids.assignment_id,
            event_type: kind,
            severity: kind.severity(),
            event_details: details.to_string(),
            session_info: SessionInfo {
                screen_resolution: self.ctx.screen_resolution.clone(),
                user_agent: self.ctx.user_agent.clone(),
            },
            timestamp: Utc::now(),
        };
        if let Err(e) = self.ctx.api.log_violation(&request).await {
            tracing::debug!("Violation log dropped ({:?}): {}", kind, e);
            return;
        }

        // Authoritative count from the backend, so a reload cannot reset
        // the tally.
        let count = match self.ctx.api.violation_count(self.ids.submission_id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Violation count lookup failed: {}", e);
                return;
            }
        };
        tracing::info!("Violation #{} recorded ({:?})", count, kind);

        if count >= self.config.threshold {
            self.terminate().await;
        } else {
            let left = self.config.threshold - count;
            self.toast(
                ToastLevel::Warning,
                format!("Suspicious activity detected. {} attempts left", left),
            )
            .await;
        }
    }

    /// One-way forced termination. The flag flips before the grace sleep so
    /// events arriving during the window cannot re-trigger the sequence.
    async fn terminate(&mut self) {
        self.terminated = true;
        tracing::warn!(
            "Violation threshold reached for submission {}, terminating session",
            self.ids.submission_id
        );
        let _ = self
            .effects
            .send(UiEffect::SessionTerminated {
                reason: "Too many proctoring violations. Your assessment has been terminated.".into(),
            })
            .await;
        tokio::time::sleep(self.config.termination_grace).await;
        if self.in_fullscreen {
            let _ = self.effects.send(UiEffect::ExitFullscreen).await;
        }
        self.ctx.store.clear_session();
        let _ = self.effects.send(UiEffect::Navigate(Route::Dashboard)).await;
    }

    async fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        let _ = self.effects.send(UiEffect::toast(level, message)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api_client::ApiClient;
    use crate::session::{MemoryBackend, SessionStore};
    use reqwest::Client;

    // Points at a closed port: every log call fails, which is exactly the
    // "silently dropped" path.
    fn offline_monitor(effects: mpsc::Sender<UiEffect>) -> ProctorMonitor {
        let api = ApiClient::new(
            Client::new(),
            "http://127.0.0.1:9",
            Duration::from_secs(1),
        )
        .unwrap();
        let store = SessionStore::new(Box::new(MemoryBackend::new()), "t".into());
        let ctx = Arc::new(SessionContext::from_parts(api, store));
        let ids = ProctorIds {
            submission_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
        };
        ProctorMonitor::new(ctx, ids, ProctorConfig::default(), effects)
    }

    #[tokio::test]
    async fn copy_paste_context_menu_are_warnings_only() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut monitor = offline_monitor(tx);
        for event in [BrowserEvent::Copy, BrowserEvent::Paste, BrowserEvent::ContextMenu] {
            monitor.handle_event(event).await;
        }
        for _ in 0..3 {
            match rx.recv().await {
                Some(UiEffect::Toast { level, .. }) => assert_eq!(level, ToastLevel::Warning),
                other => panic!("expected warning toast, got {:?}", other),
            }
        }
        assert!(!monitor.is_terminated());
    }

    #[tokio::test]
    async fn failed_violation_log_is_silently_dropped() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut monitor = offline_monitor(tx);
        monitor.handle_event(BrowserEvent::VisibilityHidden).await;
        assert!(!monitor.is_terminated());
        // No enforcement toast either: the write never landed.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unload_attempt_raises_native_prompt() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut monitor = offline_monitor(tx);
        monitor.handle_event(BrowserEvent::BeforeUnload).await;
        assert_eq!(rx.recv().await, Some(UiEffect::PreventUnload));
    }

    #[tokio::test]
    async fn fullscreen_reentry_cancels_pending_timers() {
        let (tx, _rx) = mpsc::channel(16);
        let mut monitor = offline_monitor(tx);
        monitor.handle_event(BrowserEvent::FullscreenExited).await;
        assert!(monitor.warning_deadline.is_some());
        assert!(monitor.violation_deadline.is_some());
        monitor.handle_event(BrowserEvent::FullscreenEntered).await;
        assert!(monitor.warning_deadline.is_none());
        assert!(monitor.violation_deadline.is_none());
    }
}
