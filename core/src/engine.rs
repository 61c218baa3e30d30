// core/src/engine.rs
//
// Seams to the conversion engine. The controller never converts pinyin
// itself; it drives a per-session context over one shared engine.

use crate::candidate::Candidate;
use bitflags::bitflags;
use std::path::Path;
use std::sync::Arc;

bitflags! {
    /// Fuzzy matching rules understood by conversion engines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FuzzyFlags: u32 {
        const COMMON_TYPO = 1 << 0;
        const V_U = 1 << 1;
        const AN_ANG = 1 << 2;
        const EN_ENG = 1 << 3;
        const IAN_IANG = 1 << 4;
        const IN_ING = 1 << 5;
        const U_OU = 1 << 6;
        const UAN_UANG = 1 << 7;
        const C_CH = 1 << 8;
        const F_H = 1 << 9;
        const L_N = 1 << 10;
        const S_SH = 1 << 11;
        const Z_ZH = 1 << 12;
        const VE_UE = 1 << 13;
        const INNER = 1 << 14;
        const INNER_SHORT = 1 << 15;
        const PARTIAL_FINAL = 1 << 16;
        const PARTIAL_SP = 1 << 17;
        const ADVANCED_TYPO = 1 << 18;
        const CORRECTION = 1 << 19;
        const L_R = 1 << 20;
    }
}

/// Configuration names for each fuzzy flag.
const FUZZY_FLAG_NAMES: &[(&str, FuzzyFlags)] = &[
    ("CommonTypo", FuzzyFlags::COMMON_TYPO),
    ("V_U", FuzzyFlags::V_U),
    ("AN_ANG", FuzzyFlags::AN_ANG),
    ("EN_ENG", FuzzyFlags::EN_ENG),
    ("IAN_IANG", FuzzyFlags::IAN_IANG),
    ("IN_ING", FuzzyFlags::IN_ING),
    ("U_OU", FuzzyFlags::U_OU),
    ("UAN_UANG", FuzzyFlags::UAN_UANG),
    ("C_CH", FuzzyFlags::C_CH),
    ("F_H", FuzzyFlags::F_H),
    ("L_N", FuzzyFlags::L_N),
    ("S_SH", FuzzyFlags::S_SH),
    ("Z_ZH", FuzzyFlags::Z_ZH),
    ("VE_UE", FuzzyFlags::VE_UE),
    ("Inner", FuzzyFlags::INNER),
    ("InnerShort", FuzzyFlags::INNER_SHORT),
    ("PartialFinal", FuzzyFlags::PARTIAL_FINAL),
    ("PartialSp", FuzzyFlags::PARTIAL_SP),
    ("AdvancedTypo", FuzzyFlags::ADVANCED_TYPO),
    ("Correction", FuzzyFlags::CORRECTION),
    ("L_R", FuzzyFlags::L_R),
];

impl FuzzyFlags {
    /// Flag for a configuration name such as `"Z_ZH"` or `"CommonTypo"`.
    pub fn from_config_name(name: &str) -> Option<Self> {
        FUZZY_FLAG_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flag)| *flag)
    }

    /// Combine a list of names. Unknown names are logged and skipped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = FuzzyFlags::empty();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            match Self::from_config_name(name) {
                Some(flag) => flags |= flag,
                None => tracing::warn!(flag = name, "ignoring unknown fuzzy flag"),
            }
        }
        flags
    }

    /// Parse a comma-separated list, e.g. `"Z_ZH, C_CH"`.
    pub fn parse_list(list: &str) -> Self {
        Self::from_names(list.split(','))
    }
}

/// Shared conversion engine: dictionary, language model and user history.
///
/// Constructed and configured once, then shared read-only by every session
/// through an `Arc`. Each session drives its own [`ConversionContext`].
pub trait ConversionEngine {
    type Context: ConversionContext;

    /// Load a system dictionary. Called once during bring-up.
    fn load_dictionary(&mut self, path: &Path) -> anyhow::Result<()>;

    /// Set the number of sentence candidates and the fuzzy rules.
    fn configure(&mut self, nbest: usize, fuzzy: FuzzyFlags);

    /// Create an independent composition context over the shared engine.
    fn new_context(engine: Arc<Self>) -> Self::Context
    where
        Self: Sized;
}

/// One in-progress composition against a conversion engine.
///
/// Candidates are a function of the current input and are recomputed by the
/// implementation after every mutating call.
pub trait ConversionContext {
    /// Insert text at the cursor.
    fn type_text(&mut self, text: &str);

    /// Remove one symbol before the cursor.
    fn backspace(&mut self);

    /// Remove one symbol at the cursor.
    fn delete(&mut self);

    fn set_cursor(&mut self, pos: usize);

    fn clear(&mut self);

    /// Length of the raw user input, in symbols.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cursor(&self) -> usize;

    fn candidates(&self) -> &[Candidate];

    /// Raw, unconverted user input.
    fn user_input(&self) -> &str;

    /// Full converted text once every segment has been selected.
    fn sentence(&self) -> String;

    /// Rendered preedit text and the cursor position within it, in chars.
    fn preedit(&self) -> (String, usize);

    /// Select a candidate by absolute index.
    fn select(&mut self, index: usize);

    /// Whether the whole input has been converted by selections.
    fn is_selected(&self) -> bool;

    /// Record the finished sentence to adapt future ranking.
    fn learn(&mut self);
}
