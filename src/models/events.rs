use crate::models::execution::ExecProgress;
use serde::{Deserialize, Serialize};

/// Browser-level input at the engine boundary. The thin DOM glue translates
/// real listener callbacks into these; everything past this point is plain
/// state-machine logic.
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserEvent {
    VisibilityHidden,
    VisibilityVisible,
    WindowBlur,
    WindowFocus,
    FullscreenEntered,
    FullscreenExited,
    /// Navigation away / reload attempt, before the page is torn down.
    BeforeUnload,
    Copy,
    Paste,
    ContextMenu,
    KeyDown(KeyCombo),
    /// Any mouse movement or keystroke; resets the idle clock.
    Activity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyCombo {
    fn ctrl_or_meta(&self) -> bool {
        self.ctrl || self.meta
    }

    /// F12, Ctrl/Cmd+Shift+I/C/J and Ctrl/Cmd+U open devtools or source
    /// view. Suppressed while a session is active; deterrence only.
    pub fn is_devtools_shortcut(&self) -> bool {
        let key = self.key.to_ascii_uppercase();
        if key == "F12" {
            return true;
        }
        if self.ctrl_or_meta() && self.shift && matches!(key.as_str(), "I" | "C" | "J") {
            return true;
        }
        self.ctrl_or_meta() && !self.shift && key == "U"
    }

    pub fn is_reload_shortcut(&self) -> bool {
        let key = self.key.to_ascii_uppercase();
        key == "F5" || (self.ctrl_or_meta() && key == "R")
    }

    pub fn is_escape(&self) -> bool {
        self.key.eq_ignore_ascii_case("escape")
    }

    pub fn is_suppressed(&self) -> bool {
        self.is_devtools_shortcut() || self.is_reload_shortcut() || self.is_escape()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
}

/// Engine output the host UI has to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEffect {
    Toast {
        level: ToastLevel,
        message: String,
    },
    RequestFullscreen,
    ExitFullscreen,
    /// Ask the browser to raise its native "leave site?" prompt.
    PreventUnload,
    OpenExitPrompt,
    /// Full-screen blocking overlay while a quiz save is in flight.
    SavingOverlay(bool),
    ExecProgress(ExecProgress),
    Navigate(Route),
    SessionTerminated {
        reason: String,
    },
}

impl UiEffect {
    pub fn toast(level: ToastLevel, message: impl Into<String>) -> Self {
        UiEffect::Toast {
            level,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(key: &str, ctrl: bool, meta: bool, shift: bool) -> KeyCombo {
        KeyCombo {
            key: key.into(),
            ctrl,
            meta,
            shift,
        }
    }

    #[test]
    fn devtools_shortcuts_are_recognized() {
        assert!(combo("F12", false, false, false).is_devtools_shortcut());
        assert!(combo("i", true, false, true).is_devtools_shortcut());
        assert!(combo("J", false, true, true).is_devtools_shortcut());
        assert!(combo("u", true, false, false).is_devtools_shortcut());
        assert!(!combo("i", true, false, false).is_devtools_shortcut());
        assert!(!combo("u", false, false, false).is_devtools_shortcut());
    }

    #[test]
    fn reload_and_escape_are_suppressed() {
        assert!(combo("F5", false, false, false).is_suppressed());
        assert!(combo("r", true, false, false).is_suppressed());
        assert!(combo("Escape", false, false, false).is_suppressed());
        assert!(!combo("a", false, false, false).is_suppressed());
    }
}
