//! Per-input-context session controller.
//!
//! A `Session` owns one composition over the shared engine and drives the
//! host's display through a [`Presenter`]. Key events are classified by
//! [`router::route`](crate::router::route) and the resulting action is
//! carried out here, after which the session re-renders its [`View`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::candidate::CandidatePager;
use crate::composition::CompositionBuffer;
use crate::engine::ConversionContext;
use crate::keys::{KeyEvent, KeyResult};
use crate::mode::{InputMode, ModeController};
use crate::presentation::{BannerTimer, Preedit, PresentationSink, Presenter, View};
use crate::registry::SessionRegistry;
use crate::router::{self, Route, RouteState};
use crate::Config;

/// Mouse button that selects a clicked candidate.
pub const PRIMARY_BUTTON: u32 = 1;

pub struct Session<C, S> {
    buffer: CompositionBuffer<C>,
    pager: CandidatePager,
    mode: ModeController,
    registry: Rc<RefCell<SessionRegistry>>,
    presenter: Presenter<S>,
    banner: Option<&'static str>,
    banner_timer: BannerTimer,
}

impl<C: ConversionContext, S: PresentationSink> Session<C, S> {
    /// Create a session and publish its initial mode indicator.
    pub fn new(
        context: C,
        sink: S,
        config: &Config,
        registry: Rc<RefCell<SessionRegistry>>,
    ) -> Self {
        let mut session = Self {
            buffer: CompositionBuffer::new(context),
            pager: CandidatePager::new(config.page_size()),
            mode: ModeController::default(),
            registry,
            presenter: Presenter::new(sink),
            banner: None,
            banner_timer: BannerTimer::new(config.banner_timeout()),
        };
        session.refresh();
        session
    }

    /// Session with a private registry, for hosts that track a single client.
    pub fn standalone(context: C, sink: S, config: &Config) -> Self {
        let registry = SessionRegistry::new(config.registry_capacity());
        Self::new(context, sink, config, Rc::new(RefCell::new(registry)))
    }

    pub fn mode(&self) -> InputMode {
        self.mode.mode()
    }

    pub fn toggle_pending(&self) -> bool {
        self.mode.toggle_pending()
    }

    pub fn buffer(&self) -> &CompositionBuffer<C> {
        &self.buffer
    }

    pub fn pager(&self) -> &CandidatePager {
        &self.pager
    }

    pub fn sink(&self) -> &S {
        self.presenter.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.presenter.sink_mut()
    }

    pub fn registry(&self) -> &Rc<RefCell<SessionRegistry>> {
        &self.registry
    }

    /// Host entry point: decode raw key data and process it.
    ///
    /// Returns true when the key was consumed.
    pub fn on_key_event(&mut self, keyval: u32, keycode: u32, modifiers: u32) -> bool {
        self.process_key(KeyEvent::from_raw(keyval, keycode, modifiers))
            .is_handled()
    }

    pub fn process_key(&mut self, event: KeyEvent) -> KeyResult {
        let decision = router::route(&self.route_state(), &event);
        tracing::debug!(
            keyval = format_args!("{:#x}", event.keyval),
            keycode = event.keycode,
            modifiers = format_args!("{:#x}", event.modifiers.bits()),
            route = ?decision.route,
            "key event"
        );

        if decision.abandon_toggle {
            self.mode.abandon();
        }

        match decision.route {
            Route::ArmToggle => {
                self.mode.arm();
                KeyResult::PassThrough
            }
            Route::ReleaseToggle { complete } => {
                if self.mode.release() && complete {
                    self.switch_mode(Instant::now());
                }
                KeyResult::PassThrough
            }
            Route::PassThrough => KeyResult::PassThrough,
            Route::Type(ch) => {
                let mut utf8 = [0u8; 4];
                self.edit(|buffer| buffer.type_text(ch.encode_utf8(&mut utf8)));
                KeyResult::Handled
            }
            Route::Separator => {
                self.edit(|buffer| buffer.type_text("'"));
                KeyResult::Handled
            }
            Route::Punctuation(text) => {
                self.presenter.commit(text);
                KeyResult::Handled
            }
            Route::Select(index) => {
                self.select_candidate(index);
                KeyResult::Handled
            }
            Route::Backspace => {
                self.edit(CompositionBuffer::backspace);
                KeyResult::Handled
            }
            Route::Delete => {
                self.edit(CompositionBuffer::delete);
                KeyResult::Handled
            }
            Route::Cancel => {
                self.reset();
                KeyResult::Handled
            }
            Route::CursorLeft => {
                let pos = self.buffer.cursor().saturating_sub(1);
                self.edit(|buffer| buffer.set_cursor(pos));
                KeyResult::Handled
            }
            Route::CursorRight => {
                let pos = self.buffer.cursor() + 1;
                self.edit(|buffer| buffer.set_cursor(pos));
                KeyResult::Handled
            }
            Route::CommitRaw => {
                self.commit_raw();
                KeyResult::Handled
            }
            Route::PageUp => {
                self.page_up();
                KeyResult::Handled
            }
            Route::PageDown => {
                self.page_down();
                KeyResult::Handled
            }
        }
    }

    /// Select the candidate at an absolute index.
    ///
    /// A selection that converts the whole input commits the sentence,
    /// teaches it to the engine and resets. A partial one narrows the
    /// candidates to the remaining input.
    pub fn select_candidate(&mut self, index: usize) {
        let Some(selection) = self.buffer.select(index) else {
            return;
        };

        if selection.completed {
            let sentence = self.buffer.composed_sentence();
            self.presenter.commit(&sentence);
            self.buffer.learn();
            self.reset();
        } else {
            self.pager.reset();
            self.refresh();
        }
    }

    /// Candidate clicked in the host's lookup table. `index` is relative to
    /// the visible page.
    pub fn candidate_clicked(&mut self, index: usize, button: u32, _state: u32) {
        if button != PRIMARY_BUTTON {
            return;
        }
        self.select_candidate(self.pager.absolute_index(index));
    }

    pub fn page_up(&mut self) {
        if self.pager.page_up() {
            self.refresh();
        }
    }

    pub fn page_down(&mut self) {
        if self.pager.page_down(self.buffer.candidates().len()) {
            self.refresh();
        }
    }

    pub fn cursor_up(&mut self) {
        if self.pager.cursor_up() {
            self.refresh();
        }
    }

    pub fn cursor_down(&mut self) {
        if self.pager.cursor_down(self.buffer.candidates().len()) {
            self.refresh();
        }
    }

    /// Drop the composition and hide the preedit and candidates.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pager.reset();
        self.refresh();
    }

    pub fn enable(&mut self) {
        self.reset();
    }

    pub fn disable(&mut self) {
        self.reset();
    }

    pub fn focus_in(&mut self) {
        self.focus_in_at(Instant::now());
    }

    fn focus_in_at(&mut self, now: Instant) {
        // hosts forget registered properties across focus changes
        self.presenter.republish_indicator(self.mode.indicator());
        self.announce_mode(now);
    }

    /// Focus-in with a client identity: restore that client's mode.
    pub fn focus_in_id(&mut self, object_path: &str, client: &str) {
        let stored = self.registry.borrow_mut().get(object_path);
        let mode = stored.map(InputMode::from_english).unwrap_or_default();
        tracing::debug!(object_path, client, ?mode, known = stored.is_some(), "focus in");
        self.mode.set_mode(mode);
        self.focus_in();
    }

    pub fn focus_out(&mut self) {
        if !self.buffer.is_empty() {
            self.reset();
        }
    }

    /// Focus-out with a client identity: remember the current mode.
    pub fn focus_out_id(&mut self, object_path: &str) {
        let english = self.mode.mode().is_english();
        tracing::debug!(object_path, english, "focus out");
        self.registry.borrow_mut().put(object_path, english);
        self.focus_out();
    }

    /// Drive the banner timer. Hosts call this once `next_deadline` passes.
    pub fn tick(&mut self, now: Instant) {
        if self.banner_timer.fire(now) {
            self.banner = None;
            self.refresh();
        }
    }

    /// When the host should next call [`tick`](Self::tick).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.banner_timer.deadline()
    }

    /// What the host should be showing right now.
    pub fn view(&self) -> View {
        let preedit = if self.buffer.is_empty() {
            None
        } else {
            let (text, cursor) = self.buffer.preedit();
            Some(Preedit::underlined(text, cursor))
        };

        let visible = self.pager.visible(self.buffer.candidates());
        let candidates = if visible.is_empty() {
            None
        } else {
            Some(visible.iter().map(|c| c.text.clone()).collect())
        };

        View {
            preedit,
            candidates,
            banner: self.banner.map(str::to_string),
            indicator: Some(self.mode.indicator()),
        }
    }

    fn route_state(&self) -> RouteState {
        RouteState {
            toggle_pending: self.mode.toggle_pending(),
            mode: self.mode.mode(),
            buffer_len: self.buffer.len(),
            cursor: self.buffer.cursor(),
            page: self.pager.current_page(),
            page_size: self.pager.page_size(),
        }
    }

    /// Apply a buffer mutation. Candidates change, so paging starts over.
    fn edit(&mut self, mutate: impl FnOnce(&mut CompositionBuffer<C>)) {
        mutate(&mut self.buffer);
        if self.buffer.is_empty() {
            self.reset();
        } else {
            self.pager.reset();
            self.refresh();
        }
    }

    fn commit_raw(&mut self) {
        let raw = self.buffer.raw_input().to_string();
        self.reset();
        self.presenter.commit(&raw);
    }

    fn switch_mode(&mut self, now: Instant) {
        if !self.buffer.is_empty() {
            tracing::info!(raw = self.buffer.raw_input(), "mode switch with pending input");
            self.commit_raw();
        }
        let mode = self.mode.toggle();
        tracing::info!(?mode, "input mode switched");
        self.announce_mode(now);
    }

    /// Show the mode banner and schedule its hide.
    fn announce_mode(&mut self, now: Instant) {
        if !self.buffer.is_empty() {
            self.buffer.clear();
            self.pager.reset();
        }
        self.banner = Some(self.mode.mode().banner_text());
        self.banner_timer.schedule(now);
        self.refresh();
    }

    fn refresh(&mut self) {
        // the preedit takes over the auxiliary area
        if !self.buffer.is_empty() && self.banner.take().is_some() {
            self.banner_timer.cancel();
        }
        let view = self.view();
        self.presenter.render(view);
    }
}

impl<C, S> std::fmt::Debug for Session<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pager", &self.pager)
            .field("mode", &self.mode)
            .field("banner", &self.banner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::testing::{nihao_table, ScriptedContext};
    use crate::keys::{keysym, Modifiers};
    use crate::presentation::testing::{Op, RecordingSink};
    use std::time::Duration;

    type TestSession = Session<ScriptedContext, RecordingSink>;

    fn session() -> TestSession {
        let mut s = Session::standalone(
            ScriptedContext::new(nihao_table()),
            RecordingSink::default(),
            &Config::default(),
        );
        s.sink_mut().take();
        s
    }

    fn session_with_registry(registry: &Rc<RefCell<SessionRegistry>>) -> TestSession {
        let mut s = Session::new(
            ScriptedContext::new(nihao_table()),
            RecordingSink::default(),
            &Config::default(),
            Rc::clone(registry),
        );
        s.sink_mut().take();
        s
    }

    fn key(s: &mut TestSession, keyval: u32) -> KeyResult {
        s.process_key(KeyEvent::press(keyval))
    }

    fn type_str(s: &mut TestSession, text: &str) {
        for ch in text.chars() {
            assert_eq!(key(s, ch as u32), KeyResult::Handled);
        }
    }

    fn tap_shift(s: &mut TestSession) -> (KeyResult, KeyResult) {
        let down = s.process_key(KeyEvent::press(keysym::SHIFT_L));
        let up = s.process_key(KeyEvent::release(keysym::SHIFT_L));
        (down, up)
    }

    #[test]
    fn test_new_session_publishes_indicator() {
        let s = Session::standalone(
            ScriptedContext::new(nihao_table()),
            RecordingSink::default(),
            &Config::default(),
        );
        assert_eq!(s.sink().ops, vec![Op::Indicator("中".into(), false)]);
        assert_eq!(s.mode(), InputMode::Compose);
    }

    #[test]
    fn test_type_and_space_commits_best_sentence() {
        let mut s = session();
        type_str(&mut s, "nihao");
        assert_eq!(
            s.view().candidates,
            Some(vec!["你好".into(), "拟好".into(), "你".into(), "泥".into()])
        );
        assert_eq!(s.view().preedit, Some(Preedit::underlined("nihao".into(), 5)));

        assert_eq!(key(&mut s, keysym::SPACE), KeyResult::Handled);
        assert_eq!(s.sink().commits(), vec!["你好".to_string()]);
        assert!(s.buffer().is_empty());
        assert_eq!(s.buffer().context().learned, vec!["你好".to_string()]);

        let ops = s.sink_mut().take();
        let tail = &ops[ops.len() - 3..];
        assert_eq!(
            tail,
            &[Op::Commit("你好".into()), Op::HidePreedit, Op::HideCandidates]
        );
    }

    #[test]
    fn test_partial_selection_then_complete() {
        let mut s = session();
        type_str(&mut s, "nihao");
        key(&mut s, '3' as u32);

        assert!(s.sink().commits().is_empty());
        assert_eq!(s.view().preedit, Some(Preedit::underlined("你hao".into(), 4)));
        assert_eq!(s.view().candidates, Some(vec!["好".into(), "号".into()]));

        key(&mut s, '1' as u32);
        assert_eq!(s.sink().commits(), vec!["你好".to_string()]);
        assert!(s.buffer().is_empty());
    }

    #[test]
    fn test_return_commits_raw_input() {
        let mut s = session();
        type_str(&mut s, "nihao");
        assert_eq!(key(&mut s, keysym::RETURN), KeyResult::Handled);
        assert_eq!(s.sink().commits(), vec!["nihao".to_string()]);
        assert!(s.buffer().is_empty());
        assert!(s.buffer().context().learned.is_empty());
    }

    #[test]
    fn test_escape_discards() {
        let mut s = session();
        type_str(&mut s, "ni");
        assert_eq!(key(&mut s, keysym::ESCAPE), KeyResult::Handled);
        assert!(s.sink().commits().is_empty());
        assert_eq!(s.view().preedit, None);
        assert_eq!(s.view().candidates, None);
    }

    #[test]
    fn test_escape_and_paging_swallowed_when_idle() {
        let mut s = session();
        for keyval in [keysym::ESCAPE, keysym::PAGE_UP, keysym::PAGE_DOWN] {
            assert_eq!(key(&mut s, keyval), KeyResult::Handled);
        }
        // consumed without any visible effect
        assert!(s.sink_mut().take().is_empty());
        assert_eq!(s.pager().current_page(), 0);
        assert!(s.buffer().is_empty());
    }

    #[test]
    fn test_backspace_to_empty_hides_everything() {
        let mut s = session();
        type_str(&mut s, "n");
        s.sink_mut().take();
        assert_eq!(key(&mut s, keysym::BACKSPACE), KeyResult::Handled);
        assert_eq!(s.sink_mut().take(), vec![Op::HidePreedit, Op::HideCandidates]);

        // nothing left to edit: the application gets the key
        assert_eq!(key(&mut s, keysym::BACKSPACE), KeyResult::PassThrough);
    }

    #[test]
    fn test_punctuation_with_empty_buffer() {
        let mut s = session();
        assert_eq!(key(&mut s, ',' as u32), KeyResult::Handled);
        assert_eq!(key(&mut s, '.' as u32), KeyResult::Handled);
        assert_eq!(s.sink().commits(), vec!["，".to_string(), "。".to_string()]);
        assert_eq!(key(&mut s, '@' as u32), KeyResult::PassThrough);
    }

    #[test]
    fn test_shift_tap_toggles_mode() {
        let mut s = session();
        assert_eq!(tap_shift(&mut s), (KeyResult::PassThrough, KeyResult::PassThrough));
        assert_eq!(s.mode(), InputMode::Direct);
        assert_eq!(
            s.sink_mut().take(),
            vec![
                Op::ShowBanner("English".into()),
                Op::Indicator("En".into(), true)
            ]
        );
        assert!(s.next_deadline().is_some());

        // direct mode passes letters to the application
        assert_eq!(key(&mut s, 'a' as u32), KeyResult::PassThrough);

        tap_shift(&mut s);
        assert_eq!(s.mode(), InputMode::Compose);
        assert_eq!(
            s.sink_mut().take(),
            vec![
                Op::ShowBanner("中文".into()),
                Op::Indicator("中".into(), false)
            ]
        );
    }

    #[test]
    fn test_shift_chord_does_not_toggle() {
        let mut s = session();
        s.process_key(KeyEvent::press(keysym::SHIFT_L));
        assert!(s.toggle_pending());
        let upper = KeyEvent::new('A' as u32, 0, Modifiers::SHIFT);
        assert_eq!(s.process_key(upper), KeyResult::PassThrough);
        assert!(!s.toggle_pending());
        s.process_key(KeyEvent::release(keysym::SHIFT_L));
        assert_eq!(s.mode(), InputMode::Compose);
    }

    #[test]
    fn test_toggle_with_pending_input_commits_raw() {
        let mut s = session();
        type_str(&mut s, "ni");
        s.sink_mut().take();
        tap_shift(&mut s);
        assert_eq!(s.mode(), InputMode::Direct);
        assert_eq!(
            s.sink_mut().take(),
            vec![
                Op::HidePreedit,
                Op::HideCandidates,
                Op::Commit("ni".into()),
                Op::ShowBanner("English".into()),
                Op::Indicator("En".into(), true),
            ]
        );
    }

    #[test]
    fn test_banner_hides_after_timeout() {
        let mut s = session();
        tap_shift(&mut s);
        s.sink_mut().take();

        let deadline = s.next_deadline().unwrap();
        s.tick(deadline - Duration::from_millis(1));
        assert!(s.sink_mut().take().is_empty());

        s.tick(deadline);
        assert_eq!(s.sink_mut().take(), vec![Op::HideBanner]);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_reshowing_banner_keeps_one_deadline() {
        let mut s = session();
        tap_shift(&mut s);
        let first = s.next_deadline().unwrap();
        tap_shift(&mut s);
        let second = s.next_deadline().unwrap();
        assert!(second >= first);
        assert_eq!(s.view().banner, Some("中文".into()));

        s.tick(second);
        assert_eq!(s.view().banner, None);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn test_typing_hides_banner() {
        let mut s = session();
        tap_shift(&mut s);
        tap_shift(&mut s);
        s.sink_mut().take();

        type_str(&mut s, "n");
        assert_eq!(s.next_deadline(), None);
        let ops = s.sink_mut().take();
        assert!(ops.contains(&Op::HideBanner));
    }

    #[test]
    fn test_paging_and_page_relative_digits() {
        let config = Config {
            page_size: 2,
            ..Config::default()
        };
        let mut s = Session::standalone(
            ScriptedContext::new(nihao_table()),
            RecordingSink::default(),
            &config,
        );
        type_str(&mut s, "nihao");
        assert_eq!(s.view().candidates, Some(vec!["你好".into(), "拟好".into()]));

        assert_eq!(key(&mut s, keysym::PAGE_DOWN), KeyResult::Handled);
        assert_eq!(s.pager().current_page(), 1);
        assert_eq!(s.view().candidates, Some(vec!["你".into(), "泥".into()]));

        // already on the last page
        assert_eq!(key(&mut s, '=' as u32), KeyResult::Handled);
        assert_eq!(s.pager().current_page(), 1);

        // '1' on page 1 picks absolute index 2
        key(&mut s, '1' as u32);
        assert_eq!(s.view().preedit, Some(Preedit::underlined("你hao".into(), 4)));
        assert_eq!(s.pager().current_page(), 0);

        assert_eq!(key(&mut s, '-' as u32), KeyResult::Handled);
        assert_eq!(s.pager().current_page(), 0);
    }

    #[test]
    fn test_typing_resets_page() {
        let config = Config {
            page_size: 2,
            ..Config::default()
        };
        let mut s = Session::standalone(
            ScriptedContext::new(nihao_table()),
            RecordingSink::default(),
            &config,
        );
        type_str(&mut s, "nihao");
        s.page_down();
        assert_eq!(s.pager().current_page(), 1);
        key(&mut s, keysym::BACKSPACE);
        assert_eq!(s.pager().current_page(), 0);
    }

    #[test]
    fn test_out_of_range_selection_is_handled_without_effect() {
        let mut s = session();
        type_str(&mut s, "nihao");
        s.sink_mut().take();
        assert_eq!(key(&mut s, '9' as u32), KeyResult::Handled);
        assert!(s.sink_mut().take().is_empty());
        assert_eq!(s.buffer().raw_input(), "nihao");
    }

    #[test]
    fn test_candidate_click_is_page_relative() {
        let config = Config {
            page_size: 2,
            ..Config::default()
        };
        let mut s = Session::standalone(
            ScriptedContext::new(nihao_table()),
            RecordingSink::default(),
            &config,
        );
        type_str(&mut s, "nihao");

        // secondary button is ignored
        s.candidate_clicked(0, 3, 0);
        assert_eq!(s.buffer().raw_input(), "nihao");
        assert!(s.sink().commits().is_empty());

        s.page_down();
        s.candidate_clicked(1, PRIMARY_BUTTON, 0);
        assert_eq!(s.view().preedit, Some(Preedit::underlined("泥hao".into(), 4)));
    }

    #[test]
    fn test_cursor_movement() {
        let mut s = session();
        type_str(&mut s, "ni");
        assert_eq!(key(&mut s, keysym::RIGHT), KeyResult::PassThrough);
        assert_eq!(key(&mut s, keysym::LEFT), KeyResult::Handled);
        assert_eq!(s.buffer().cursor(), 1);
        assert_eq!(key(&mut s, keysym::LEFT), KeyResult::Handled);
        assert_eq!(key(&mut s, keysym::LEFT), KeyResult::PassThrough);
        assert_eq!(key(&mut s, keysym::DELETE), KeyResult::Handled);
        assert_eq!(s.buffer().raw_input(), "i");
    }

    #[test]
    fn test_chords_and_releases_pass_through_while_composing() {
        let mut s = session();
        type_str(&mut s, "ni");
        let ctrl_c = KeyEvent::new('c' as u32, 0, Modifiers::CONTROL);
        assert_eq!(s.process_key(ctrl_c), KeyResult::PassThrough);
        assert_eq!(
            s.process_key(KeyEvent::release('n' as u32)),
            KeyResult::PassThrough
        );
        assert_eq!(s.buffer().raw_input(), "ni");
    }

    #[test]
    fn test_focus_restores_mode_per_client() {
        let registry = Rc::new(RefCell::new(SessionRegistry::default()));
        let mut s = session_with_registry(&registry);

        s.focus_in_id("/ctx/1", "app-1");
        tap_shift(&mut s);
        assert_eq!(s.mode(), InputMode::Direct);
        s.focus_out_id("/ctx/1");

        s.focus_in_id("/ctx/2", "app-2");
        assert_eq!(s.mode(), InputMode::Compose);
        s.focus_out_id("/ctx/2");

        s.sink_mut().take();
        s.focus_in_id("/ctx/1", "app-1");
        assert_eq!(s.mode(), InputMode::Direct);
        assert_eq!(
            s.sink_mut().take(),
            vec![
                Op::Indicator("En".into(), true),
                Op::ShowBanner("English".into()),
            ]
        );
        assert_eq!(registry.borrow().len(), 2);
    }

    #[test]
    fn test_focus_out_clears_composition() {
        let mut s = session();
        type_str(&mut s, "ni");
        s.sink_mut().take();
        s.focus_out();
        assert!(s.buffer().is_empty());
        assert_eq!(s.sink_mut().take(), vec![Op::HidePreedit, Op::HideCandidates]);
        assert!(s.sink().commits().is_empty());
    }

    #[test]
    fn test_on_key_event_decodes_raw_modifiers() {
        let mut s = session();
        assert!(s.on_key_event('n' as u32, 57, 0));
        assert!(!s.on_key_event('n' as u32, 57, Modifiers::RELEASE.bits()));
        assert!(!s.on_key_event('c' as u32, 54, Modifiers::CONTROL.bits()));
    }
}
