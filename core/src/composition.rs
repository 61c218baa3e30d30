//! Composition buffer: the session's view of one conversion context.
//!
//! The buffer is a thin proxy. It forwards edits to the engine context,
//! guards selection indices, and reports whether a selection finished the
//! sentence. Candidates belong to the context and must not be cached across
//! a mutation.

use crate::candidate::Candidate;
use crate::engine::ConversionContext;

/// Result of selecting a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// True when the selection converted the whole input.
    pub completed: bool,
}

/// Raw input, cursor and candidates of an in-progress composition.
#[derive(Debug)]
pub struct CompositionBuffer<C> {
    context: C,
}

impl<C: ConversionContext> CompositionBuffer<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    pub fn type_text(&mut self, text: &str) {
        self.context.type_text(text);
    }

    pub fn backspace(&mut self) {
        self.context.backspace();
    }

    pub fn delete(&mut self) {
        self.context.delete();
    }

    /// Move the cursor, clamped to the input length.
    pub fn set_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.context.len());
        self.context.set_cursor(pos);
    }

    pub fn clear(&mut self) {
        self.context.clear();
    }

    pub fn len(&self) -> usize {
        self.context.len()
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.context.cursor()
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.context.candidates()
    }

    pub fn raw_input(&self) -> &str {
        self.context.user_input()
    }

    pub fn composed_sentence(&self) -> String {
        self.context.sentence()
    }

    pub fn preedit(&self) -> (String, usize) {
        self.context.preedit()
    }

    /// Select the candidate at `index`.
    ///
    /// Returns `None` if the index is out of range for the current list.
    pub fn select(&mut self, index: usize) -> Option<Selection> {
        let count = self.context.candidates().len();
        if index >= count {
            tracing::warn!(index, total = count, "invalid candidate index");
            return None;
        }
        tracing::debug!(index, text = %self.context.candidates()[index].text, "selecting candidate");
        self.context.select(index);
        Some(Selection {
            completed: self.context.is_selected(),
        })
    }

    pub fn learn(&mut self) {
        self.context.learn();
    }

    pub fn context(&self) -> &C {
        &self.context
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn buffer() -> CompositionBuffer<ScriptedContext> {
        CompositionBuffer::new(ScriptedContext::new(nihao_table()))
    }

    fn type_all(buf: &mut CompositionBuffer<ScriptedContext>, s: &str) {
        for ch in s.chars() {
            buf.type_text(&ch.to_string());
        }
    }

    #[test]
    fn test_type_then_backspace_restores_state() {
        let mut buf = buffer();
        type_all(&mut buf, "ni");
        let before = (buf.raw_input().to_string(), buf.cursor());

        buf.type_text("h");
        buf.backspace();

        assert_eq!((buf.raw_input().to_string(), buf.cursor()), before);
    }

    #[test]
    fn test_select_out_of_range_is_none() {
        let mut buf = buffer();
        type_all(&mut buf, "nihao");
        assert_eq!(buf.select(99), None);
        assert_eq!(buf.raw_input(), "nihao");
    }

    #[test]
    fn test_complete_select_learn_clear() {
        let mut buf = buffer();
        type_all(&mut buf, "nihao");
        assert!(!buf.candidates().is_empty());

        let sel = buf.select(0).unwrap();
        assert!(sel.completed);
        assert_eq!(buf.composed_sentence(), "你好");

        buf.learn();
        buf.clear();
        assert_eq!(buf.len(), 0);
        assert!(buf.candidates().is_empty());
        assert_eq!(buf.context().learned, vec!["你好".to_string()]);
    }

    #[test]
    fn test_partial_select_keeps_suffix() {
        let mut buf = buffer();
        type_all(&mut buf, "nihao");

        let sel = buf.select(2).unwrap();
        assert!(!sel.completed);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.candidates()[0].text, "好");
        assert_eq!(buf.preedit(), ("你hao".to_string(), 4));
    }

    #[test]
    fn test_set_cursor_is_clamped() {
        let mut buf = buffer();
        type_all(&mut buf, "ni");
        buf.set_cursor(10);
        assert_eq!(buf.cursor(), 2);
        buf.set_cursor(0);
        assert_eq!(buf.cursor(), 0);
    }
}
