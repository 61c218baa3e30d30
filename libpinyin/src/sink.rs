//! Presentation sink that writes each display operation as a JSON line.

use std::io::Write;

use imsession_core::{Preedit, PresentationSink};
use serde::Serialize;

/// One display operation, as printed by the console host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SinkEvent {
    ShowPreedit { text: String, cursor: usize },
    HidePreedit,
    ShowCandidates { items: Vec<String> },
    HideCandidates,
    ShowBanner { text: String },
    HideBanner,
    ModeIndicator { label: String, checked: bool },
    Commit { text: String },
    /// Outcome of a key press; not a sink call, emitted by the host.
    Key { name: String, handled: bool },
}

#[derive(Debug)]
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn emit(&mut self, event: &SinkEvent) {
        let written = serde_json::to_string(event)
            .map_err(anyhow::Error::from)
            .and_then(|line| writeln!(self.out, "{line}").map_err(anyhow::Error::from));
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to write sink event");
        }
    }
}

impl<W: Write> PresentationSink for JsonSink<W> {
    fn show_preedit(&mut self, preedit: &Preedit) {
        self.emit(&SinkEvent::ShowPreedit {
            text: preedit.text.clone(),
            cursor: preedit.cursor,
        });
    }

    fn hide_preedit(&mut self) {
        self.emit(&SinkEvent::HidePreedit);
    }

    fn show_candidate_page(&mut self, items: &[String]) {
        self.emit(&SinkEvent::ShowCandidates {
            items: items.to_vec(),
        });
    }

    fn hide_candidates(&mut self) {
        self.emit(&SinkEvent::HideCandidates);
    }

    fn show_auxiliary_banner(&mut self, text: &str) {
        self.emit(&SinkEvent::ShowBanner { text: text.into() });
    }

    fn hide_auxiliary_banner(&mut self) {
        self.emit(&SinkEvent::HideBanner);
    }

    fn set_mode_indicator(&mut self, label: &str, checked: bool) {
        self.emit(&SinkEvent::ModeIndicator {
            label: label.into(),
            checked,
        });
    }

    fn commit_text(&mut self, text: &str) {
        self.emit(&SinkEvent::Commit { text: text.into() });
    }
}
