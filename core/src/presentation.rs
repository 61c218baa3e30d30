//! Presentation of composition state to the host.
//!
//! The session computes a [`View`] (plain data) and hands it to a
//! [`Presenter`], which diffs it against what was last shown and calls only
//! the sink methods whose part changed. The transient mode banner hides
//! itself through a cancellable [`BannerTimer`] driven by the host's event
//! loop.

use crate::mode::ModeIndicator;
use std::time::{Duration, Instant};

/// Style hint attached to preedit text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreeditStyle {
    #[default]
    Underline,
}

/// Preedit text with a cursor offset in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preedit {
    pub text: String,
    pub cursor: usize,
    pub style: PreeditStyle,
}

impl Preedit {
    pub fn underlined(text: String, cursor: usize) -> Self {
        Self {
            text,
            cursor,
            style: PreeditStyle::Underline,
        }
    }
}

/// Display primitives implemented by the host.
pub trait PresentationSink {
    fn show_preedit(&mut self, preedit: &Preedit);
    fn hide_preedit(&mut self);
    fn show_candidate_page(&mut self, items: &[String]);
    fn hide_candidates(&mut self);
    fn show_auxiliary_banner(&mut self, text: &str);
    fn hide_auxiliary_banner(&mut self);
    fn set_mode_indicator(&mut self, label: &str, checked: bool);
    /// Insert finished text into the client application.
    fn commit_text(&mut self, text: &str);
}

/// Everything the host should be showing for one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct View {
    pub preedit: Option<Preedit>,
    pub candidates: Option<Vec<String>>,
    pub banner: Option<String>,
    pub indicator: Option<ModeIndicator>,
}

/// Applies views to a sink, emitting only what changed.
#[derive(Debug)]
pub struct Presenter<S> {
    sink: S,
    shown: View,
}

impl<S: PresentationSink> Presenter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            shown: View::default(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn commit(&mut self, text: &str) {
        tracing::info!(text, "committing text");
        self.sink.commit_text(text);
    }

    /// Bring the sink in line with `next`.
    pub fn render(&mut self, next: View) {
        if next.preedit != self.shown.preedit {
            match &next.preedit {
                Some(preedit) => self.sink.show_preedit(preedit),
                None => self.sink.hide_preedit(),
            }
        }

        if next.candidates != self.shown.candidates {
            match &next.candidates {
                Some(items) => self.sink.show_candidate_page(items),
                None => self.sink.hide_candidates(),
            }
        }

        if next.banner != self.shown.banner {
            match &next.banner {
                Some(text) => self.sink.show_auxiliary_banner(text),
                None => self.sink.hide_auxiliary_banner(),
            }
        }

        if next.indicator != self.shown.indicator {
            if let Some(indicator) = &next.indicator {
                self.sink.set_mode_indicator(indicator.label, indicator.checked);
            }
        }

        self.shown = next;
    }

    /// Re-publish the mode indicator even if unchanged (e.g. on focus-in,
    /// when the host forgets registered properties).
    pub fn republish_indicator(&mut self, indicator: ModeIndicator) {
        self.sink.set_mode_indicator(indicator.label, indicator.checked);
        self.shown.indicator = Some(indicator);
    }
}

/// One-shot hide task for the mode banner.
///
/// Showing the banner again replaces the pending deadline, so at most one
/// hide is ever outstanding.
#[derive(Debug, Clone)]
pub struct BannerTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl BannerTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Schedule a hide `timeout` after `now`, cancelling any pending one.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending hide if it is due at `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for BannerTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::mode::InputMode;

    #[test]
    fn test_render_emits_only_changes() {
        let mut presenter = Presenter::new(RecordingSink::default());

        let view = View {
            preedit: Some(Preedit::underlined("ni".into(), 2)),
            candidates: Some(vec!["你".into(), "泥".into()]),
            ..View::default()
        };
        presenter.render(view.clone());
        assert_eq!(
            presenter.sink_mut().take(),
            vec![
                Op::ShowPreedit("ni".into(), 2),
                Op::ShowCandidates(vec!["你".into(), "泥".into()]),
            ]
        );

        // same view again: nothing to do
        presenter.render(view);
        assert!(presenter.sink_mut().take().is_empty());

        presenter.render(View::default());
        assert_eq!(
            presenter.sink_mut().take(),
            vec![Op::HidePreedit, Op::HideCandidates]
        );
    }

    #[test]
    fn test_indicator_and_banner() {
        let mut presenter = Presenter::new(RecordingSink::default());
        presenter.render(View {
            banner: Some("English".into()),
            indicator: Some(InputMode::Direct.into()),
            ..View::default()
        });
        assert_eq!(
            presenter.sink_mut().take(),
            vec![
                Op::ShowBanner("English".into()),
                Op::Indicator("En".into(), true)
            ]
        );

        presenter.republish_indicator(InputMode::Direct.into());
        assert_eq!(
            presenter.sink_mut().take(),
            vec![Op::Indicator("En".into(), true)]
        );
    }

    #[test]
    fn test_banner_timer_reschedule_replaces_deadline() {
        let start = Instant::now();
        let mut timer = BannerTimer::new(Duration::from_secs(1));

        timer.schedule(start);
        timer.schedule(start + Duration::from_millis(600));

        // the first deadline no longer fires
        assert!(!timer.fire(start + Duration::from_millis(1100)));
        assert!(timer.fire(start + Duration::from_millis(1600)));
        // one-shot
        assert!(!timer.fire(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_banner_timer_cancel() {
        let start = Instant::now();
        let mut timer = BannerTimer::default();
        timer.schedule(start);
        timer.cancel();
        assert_eq!(timer.deadline(), None);
        assert!(!timer.fire(start + Duration::from_secs(2)));
    }
}
