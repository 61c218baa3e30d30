//! Compose/direct mode state machine.
//!
//! The mode flips only on a complete press/release cycle of the mode-switch
//! key with no other key in between. The pending flag tracks that cycle.

/// Input mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Keystrokes build a Chinese composition.
    #[default]
    Compose,
    /// Keystrokes go straight to the application.
    Direct,
}

impl InputMode {
    pub fn from_english(english: bool) -> Self {
        if english {
            InputMode::Direct
        } else {
            InputMode::Compose
        }
    }

    pub fn is_english(self) -> bool {
        self == InputMode::Direct
    }

    pub fn toggled(self) -> Self {
        match self {
            InputMode::Compose => InputMode::Direct,
            InputMode::Direct => InputMode::Compose,
        }
    }

    /// Short label for the status-area indicator.
    pub fn indicator_label(self) -> &'static str {
        match self {
            InputMode::Compose => "中",
            InputMode::Direct => "En",
        }
    }

    /// Text for the transient banner shown after a switch.
    pub fn banner_text(self) -> &'static str {
        match self {
            InputMode::Compose => "中文",
            InputMode::Direct => "English",
        }
    }
}

/// Mode indicator as presented by the host's status area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeIndicator {
    pub label: &'static str,
    /// Checked while in direct mode.
    pub checked: bool,
}

impl From<InputMode> for ModeIndicator {
    fn from(mode: InputMode) -> Self {
        Self {
            label: mode.indicator_label(),
            checked: mode.is_english(),
        }
    }
}

/// Mode plus the modifier press/release sub-state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeController {
    mode: InputMode,
    toggle_pending: bool,
}

impl ModeController {
    pub fn new(mode: InputMode) -> Self {
        Self {
            mode,
            toggle_pending: false,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode;
    }

    pub fn toggle_pending(&self) -> bool {
        self.toggle_pending
    }

    /// Mode-switch key went down.
    pub fn arm(&mut self) {
        self.toggle_pending = true;
    }

    /// Mode-switch key came up. Returns true if this completes a cycle.
    pub fn release(&mut self) -> bool {
        std::mem::take(&mut self.toggle_pending)
    }

    /// Another key arrived while the cycle was open.
    pub fn abandon(&mut self) {
        self.toggle_pending = false;
    }

    /// Flip the mode and return the new one.
    pub fn toggle(&mut self) -> InputMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    pub fn indicator(&self) -> ModeIndicator {
        self.mode.into()
    }
}
