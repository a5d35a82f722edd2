use crate::error::Result;
use crate::models::events::{BrowserEvent, KeyCombo, Route, ToastLevel, UiEffect};
use crate::SessionContext;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    NotStarted,
    Running,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenPhase {
    Fullscreen,
    Exited,
    ExitConfirmed,
}

/// Countdown to the persisted end time. The end time is read once; a page
/// reload re-reads the same persisted value, so the timer can only shrink.
pub struct SessionTimer {
    end_time: DateTime<Utc>,
    phase: TimerPhase,
    auto_submitted: bool,
    tick: Duration,
}

impl SessionTimer {
    /// Fail-closed: without a valid persisted session there is nothing to
    /// count down. Callers redirect to the dashboard on error.
    pub fn from_store(ctx: &SessionContext) -> Result<Self> {
        let (_, end_time) = ctx.store.validate()?;
        Ok(Self {
            end_time,
            phase: TimerPhase::NotStarted,
            auto_submitted: false,
            tick: Duration::from_secs(1),
        })
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn remaining(&self) -> chrono::Duration {
        (self.end_time - Utc::now()).max(chrono::Duration::zero())
    }

    /// Tick loop. On expiry fires final submit exactly once, clears the
    /// persisted session and navigates away.
    pub async fn run(
        mut self,
        ctx: Arc<SessionContext>,
        effects: mpsc::Sender<UiEffect>,
    ) -> Result<()> {
        self.phase = TimerPhase::Running;
        let mut interval = tokio::time::interval(self.tick);
        loop {
            interval.tick().await;
            if self.remaining() > chrono::Duration::zero() {
                continue;
            }
            self.phase = TimerPhase::Expired;
            if self.auto_submitted {
                break;
            }
            self.auto_submitted = true;
            tracing::info!("Session time elapsed, auto-submitting");
            if let Some(submission_id) = ctx.store.submission_id() {
                if let Err(e) = ctx.api.submit_submission(submission_id).await {
                    tracing::error!("Auto-submit failed: {}", e);
                }
            }
            ctx.store.clear_session();
            let _ = effects
                .send(UiEffect::toast(ToastLevel::Info, "Time is up, your assessment was submitted"))
                .await;
            let _ = effects.send(UiEffect::Navigate(Route::Dashboard)).await;
            break;
        }
        Ok(())
    }
}

/// Fullscreen enforcement and exit-confirmation gating, independent of the
/// countdown. Right-click and devtool shortcuts are suppressed at the DOM
/// level while active; deterrence, not a security boundary.
pub struct LifecycleGuard {
    fullscreen: FullscreenPhase,
    skip_fullscreen_check: bool,
    exit_prompt_open: bool,
}

impl LifecycleGuard {
    pub fn new(skip_fullscreen_check: bool) -> Self {
        Self {
            fullscreen: FullscreenPhase::Exited,
            skip_fullscreen_check,
            exit_prompt_open: false,
        }
    }

    pub fn fullscreen_phase(&self) -> FullscreenPhase {
        self.fullscreen
    }

    pub fn exit_prompt_open(&self) -> bool {
        self.exit_prompt_open
    }

    /// (Re)acquire fullscreen when the assessment view mounts.
    pub fn on_mount(&mut self) -> Vec<UiEffect> {
        if self.skip_fullscreen_check {
            self.fullscreen = FullscreenPhase::Fullscreen;
            return vec![];
        }
        vec![UiEffect::RequestFullscreen]
    }

    pub fn handle_event(&mut self, event: &BrowserEvent) -> Vec<UiEffect> {
        match event {
            BrowserEvent::FullscreenEntered => {
                self.fullscreen = FullscreenPhase::Fullscreen;
                self.exit_prompt_open = false;
                vec![]
            }
            BrowserEvent::FullscreenExited if !self.skip_fullscreen_check => {
                self.fullscreen = FullscreenPhase::Exited;
                self.open_prompt()
            }
            BrowserEvent::WindowBlur if !self.skip_fullscreen_check => self.open_prompt(),
            _ => vec![],
        }
    }

    fn open_prompt(&mut self) -> Vec<UiEffect> {
        if self.exit_prompt_open {
            return vec![];
        }
        self.exit_prompt_open = true;
        vec![UiEffect::OpenExitPrompt]
    }

    /// Candidate confirmed leaving: clear everything and go home.
    pub fn confirm_exit(&mut self, ctx: &SessionContext) -> Vec<UiEffect> {
        self.fullscreen = FullscreenPhase::ExitConfirmed;
        self.exit_prompt_open = false;
        ctx.store.clear_session();
        vec![
            UiEffect::ExitFullscreen,
            UiEffect::Navigate(Route::Dashboard),
        ]
    }

    /// Candidate cancelled the prompt: back into fullscreen.
    pub fn cancel_exit(&mut self) -> Vec<UiEffect> {
        self.exit_prompt_open = false;
        vec![UiEffect::RequestFullscreen]
    }

    /// Whether a keydown should be swallowed before the browser sees it.
    pub fn should_suppress_key(&self, combo: &KeyCombo) -> bool {
        combo.is_suppressed()
    }

    pub fn should_suppress_context_menu(&self) -> bool {
        true
    }
}
