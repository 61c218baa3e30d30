//! Key classification.
//!
//! `route` maps a key event plus a snapshot of session state to the action the
//! session should take. The guards run in a fixed priority order and the first
//! match wins:
//!
//! 1. mode-switch key press arms a pending toggle
//! 2. mode-switch key release completes the toggle if one is pending
//! 3. any other key abandons a pending toggle, then evaluation continues
//! 4. other release events pass through
//! 5. control/alt/super chords pass through
//! 6. direct mode passes everything through
//! 7. with an empty buffer only letters, mapped punctuation, Escape and the
//!    paging keys are taken
//! 8. otherwise control keys, then literal keys
//!
//! Classification is pure; [`Session`](crate::Session) performs the effects.

use crate::keys::{keysym, KeyEvent};
use crate::mode::InputMode;
use crate::punctuation::PunctuationMap;

/// Session state the router needs to classify a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteState {
    pub toggle_pending: bool,
    pub mode: InputMode,
    pub buffer_len: usize,
    pub cursor: usize,
    pub page: usize,
    pub page_size: usize,
}

impl RouteState {
    fn page_index(&self, slot: usize) -> usize {
        self.page * self.page_size + slot
    }
}

/// Action chosen for a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Mode-switch key pressed.
    ArmToggle,
    /// Mode-switch key released; `complete` if the press was not interrupted.
    ReleaseToggle { complete: bool },
    /// Append a lowercase letter to the composition.
    Type(char),
    /// Append a syllable separator.
    Separator,
    /// Commit native punctuation directly.
    Punctuation(&'static str),
    /// Select the candidate at an absolute index.
    Select(usize),
    Backspace,
    Delete,
    /// Drop the composition.
    Cancel,
    CursorLeft,
    CursorRight,
    /// Commit the raw, unconverted input.
    CommitRaw,
    PageUp,
    PageDown,
    PassThrough,
}

/// Router output: the action plus whether a pending toggle was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub abandon_toggle: bool,
    pub route: Route,
}

pub fn route(state: &RouteState, event: &KeyEvent) -> Decision {
    if event.is_mode_toggle() {
        let route = if event.is_release() {
            Route::ReleaseToggle {
                complete: state.toggle_pending,
            }
        } else {
            Route::ArmToggle
        };
        return Decision {
            abandon_toggle: false,
            route,
        };
    }

    Decision {
        abandon_toggle: state.toggle_pending,
        route: classify(state, event),
    }
}

fn classify(state: &RouteState, event: &KeyEvent) -> Route {
    if event.is_release() || event.has_pass_through_modifier() {
        return Route::PassThrough;
    }
    if state.mode == InputMode::Direct {
        return Route::PassThrough;
    }
    if state.buffer_len == 0 {
        return classify_idle(event);
    }
    control_key(state, event)
        .or_else(|| literal_key(state, event))
        .unwrap_or(Route::PassThrough)
}

/// Nothing is being composed: start a composition or substitute punctuation.
/// Escape and the paging keys are still consumed, as no-ops.
fn classify_idle(event: &KeyEvent) -> Route {
    match event.keyval {
        keysym::ESCAPE => return Route::Cancel,
        keysym::PAGE_UP => return Route::PageUp,
        keysym::PAGE_DOWN => return Route::PageDown,
        _ => {}
    }
    match event.ascii() {
        Some(ch) if ch.is_ascii_lowercase() => Route::Type(ch),
        Some(ch) => PunctuationMap::lookup(ch)
            .map(Route::Punctuation)
            .unwrap_or(Route::PassThrough),
        None => Route::PassThrough,
    }
}

fn control_key(state: &RouteState, event: &KeyEvent) -> Option<Route> {
    let route = match event.keyval {
        keysym::BACKSPACE => Route::Backspace,
        keysym::DELETE => Route::Delete,
        keysym::ESCAPE => Route::Cancel,
        keysym::LEFT if state.cursor > 0 => Route::CursorLeft,
        keysym::RIGHT if state.cursor < state.buffer_len => Route::CursorRight,
        keysym::RETURN | keysym::KP_ENTER => Route::CommitRaw,
        keysym::PAGE_UP | keysym::MINUS => Route::PageUp,
        keysym::PAGE_DOWN | keysym::EQUAL => Route::PageDown,
        _ => return None,
    };
    Some(route)
}

fn literal_key(state: &RouteState, event: &KeyEvent) -> Option<Route> {
    let route = match event.ascii()? {
        ch @ 'a'..='z' => Route::Type(ch),
        '\'' => Route::Separator,
        ch @ '1'..='9' => Route::Select(state.page_index(ch as usize - '1' as usize)),
        '0' => Route::Select(state.page_index(9)),
        // the best candidate overall, whatever page is showing
        ' ' => Route::Select(0),
        _ => return None,
    };
    Some(route)
}
