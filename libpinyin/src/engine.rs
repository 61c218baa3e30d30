//! Table-driven pinyin conversion engine.
//!
//! `TableEngine` is shared by every session behind an `Arc`. Each session
//! converts through its own [`TableContext`], which tracks the raw input,
//! cursor and the segments selected so far. Learned user frequencies and the
//! candidate cache live in the engine behind `RefCell`s; sessions run on
//! the host's single event thread.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use imsession_core::{Candidate, ConversionContext, ConversionEngine, FuzzyFlags};
use lru::LruCache;

use crate::dictionary::{Dictionary, Entry};
use crate::fuzzy::{FuzzyMap, FUZZY_PENALTY};
use crate::parser::{Parser, Syllable};

const CACHE_CAPACITY: usize = 256;
const USER_WEIGHT: f32 = 3.0;
const INCOMPLETE_PENALTY: f32 = 0.5;
const MAX_COMPLETIONS: usize = 24;
const MAX_KEY_VARIANTS: usize = 128;
const RAW_SCORE: f32 = -100.0;

/// Dictionary key and phrase of one converted segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: String,
    pub text: String,
}

/// A candidate plus what selecting it means for the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub candidate: Candidate,
    /// Bytes of raw input covered.
    pub consumed: usize,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
struct Scored {
    key: String,
    text: String,
    score: f32,
}

pub struct TableEngine {
    dictionary: Dictionary,
    parser: Parser,
    fuzzy: FuzzyMap,
    nbest: usize,
    user: RefCell<AHashMap<String, AHashMap<String, u32>>>,
    cache: RefCell<LruCache<String, Vec<Conversion>>>,
}

impl TableEngine {
    /// Engine with an empty dictionary.
    pub fn new() -> Self {
        Self::with_dictionary(Dictionary::new())
    }

    /// Engine over the built-in demo table.
    pub fn demo() -> Self {
        Self::with_dictionary(Dictionary::demo())
    }

    pub fn with_dictionary(dictionary: Dictionary) -> Self {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            dictionary,
            parser: Parser::new(),
            fuzzy: FuzzyMap::default(),
            nbest: 3,
            user: RefCell::new(AHashMap::new()),
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn nbest(&self) -> usize {
        self.nbest
    }

    /// How often the user has committed `text` for `key`.
    pub fn user_frequency(&self, key: &str, text: &str) -> u32 {
        self.user
            .borrow()
            .get(key)
            .and_then(|phrases| phrases.get(text))
            .copied()
            .unwrap_or(0)
    }

    /// Candidates for raw input, best first.
    pub fn convert(&self, input: &str) -> Vec<Conversion> {
        if let Some(hit) = self.cache.borrow_mut().get(input) {
            return hit.clone();
        }
        let conversions = self.compute(input);
        self.cache
            .borrow_mut()
            .put(input.to_string(), conversions.clone());
        conversions
    }

    /// Record committed segments. A multi-segment sentence is also learned
    /// as a phrase of its own.
    pub fn learn(&self, segments: &[Segment]) {
        if segments.is_empty() {
            return;
        }
        {
            let mut user = self.user.borrow_mut();
            for seg in segments {
                *user
                    .entry(seg.key.clone())
                    .or_default()
                    .entry(seg.text.clone())
                    .or_default() += 1;
            }
            if segments.len() > 1 {
                let key = segments
                    .iter()
                    .map(|s| s.key.as_str())
                    .collect::<Vec<_>>()
                    .join("'");
                let text: String = segments.iter().map(|s| s.text.as_str()).collect();
                tracing::debug!(key = %key, text = %text, "learned sentence");
                *user.entry(key).or_default().entry(text).or_default() += 1;
            }
        }
        self.cache.borrow_mut().clear();
    }

    fn compute(&self, input: &str) -> Vec<Conversion> {
        let syllables = self.parser.segment(input);
        if syllables.is_empty() {
            return Vec::new();
        }
        let n = syllables.len();

        // input consumed by the first k syllables, trailing separators included
        let boundary = |k: usize| {
            if k < n {
                syllables[k].start
            } else {
                input.len()
            }
        };

        let by_prefix: Vec<Vec<Scored>> = (1..=n).map(|k| self.lookup(&syllables[..k])).collect();
        let mut out = Vec::new();

        if n > 1 && by_prefix[n - 1].is_empty() {
            out.extend(self.sentences(&syllables, input.len()));
        }

        for k in (1..=n).rev() {
            for scored in &by_prefix[k - 1] {
                let consumed = boundary(k);
                if out
                    .iter()
                    .any(|c| c.candidate.text == scored.text && c.consumed == consumed)
                {
                    continue;
                }
                out.push(Conversion {
                    candidate: Candidate::new(scored.text.clone(), scored.score),
                    consumed,
                    segments: vec![Segment {
                        key: scored.key.clone(),
                        text: scored.text.clone(),
                    }],
                });
            }
        }

        if out.is_empty() {
            // nothing in the dictionary: offer the raw input itself
            out.push(Conversion {
                candidate: Candidate::new(input, RAW_SCORE),
                consumed: input.len(),
                segments: vec![Segment {
                    key: raw_key(&syllables),
                    text: input.to_string(),
                }],
            });
        }

        out
    }

    /// Whole-input candidates built greedily from the longest dictionary
    /// match at each position. The `i`-th sentence starts with the `i`-th
    /// best phrase for the first segment.
    fn sentences(&self, syllables: &[Syllable], len: usize) -> Vec<Conversion> {
        let (first_len, first) = match self.longest_at(syllables, 0) {
            Some(hit) => hit,
            None => (1, Vec::new()),
        };
        let rest = self.greedy_from(syllables, first_len);

        let heads: Vec<Segment> = if first.is_empty() {
            vec![raw_segment(&syllables[0])]
        } else {
            first
                .iter()
                .take(self.nbest)
                .map(|s| Segment {
                    key: s.key.clone(),
                    text: s.text.clone(),
                })
                .collect()
        };

        let mut out: Vec<Conversion> = Vec::new();
        for head in heads {
            let mut segments = vec![head];
            segments.extend(rest.iter().map(|(seg, _)| seg.clone()));
            let text: String = segments.iter().map(|s| s.text.as_str()).collect();
            if out.iter().any(|c| c.candidate.text == text) {
                continue;
            }
            let score = self.segment_score(&segments[0], &first)
                + rest.iter().map(|(_, s)| s).sum::<f32>();
            out.push(Conversion {
                candidate: Candidate::new(text, score),
                consumed: len,
                segments,
            });
        }
        out
    }

    fn segment_score(&self, head: &Segment, choices: &[Scored]) -> f32 {
        choices
            .iter()
            .find(|s| s.text == head.text)
            .map(|s| s.score)
            .unwrap_or(RAW_SCORE)
    }

    /// Best segment for each position from `start`, greedily.
    fn greedy_from(&self, syllables: &[Syllable], start: usize) -> Vec<(Segment, f32)> {
        let mut out = Vec::new();
        let mut pos = start;
        while pos < syllables.len() {
            match self.longest_at(syllables, pos) {
                Some((len, choices)) => {
                    let best = &choices[0];
                    out.push((
                        Segment {
                            key: best.key.clone(),
                            text: best.text.clone(),
                        },
                        best.score,
                    ));
                    pos += len;
                }
                None => {
                    out.push((raw_segment(&syllables[pos]), RAW_SCORE));
                    pos += 1;
                }
            }
        }
        out
    }

    fn longest_at(&self, syllables: &[Syllable], pos: usize) -> Option<(usize, Vec<Scored>)> {
        (1..=syllables.len() - pos).rev().find_map(|len| {
            let found = self.lookup(&syllables[pos..pos + len]);
            (!found.is_empty()).then_some((len, found))
        })
    }

    /// Phrases spelled by exactly `syllables`, best first.
    fn lookup(&self, syllables: &[Syllable]) -> Vec<Scored> {
        let mut found: Vec<Scored> = Vec::new();
        let user = self.user.borrow();

        for (key, penalty) in self.key_variants(syllables) {
            let learned = user.get(&key);
            let entries = self.dictionary.get(&key).iter().map(|e| (e.phrase.as_str(), e.freq));
            let learned_only = learned
                .into_iter()
                .flat_map(|m| m.keys())
                .filter(|text| !self.dictionary.get(&key).iter().any(|e: &Entry| &e.phrase == *text))
                .map(|text| (text.as_str(), 0));

            for (text, freq) in entries.chain(learned_only) {
                let boost = learned.and_then(|m| m.get(text)).copied().unwrap_or(0);
                let score = (freq as f32).ln_1p() + USER_WEIGHT * boost as f32 - penalty;
                match found.iter_mut().find(|s| s.text == text) {
                    Some(existing) if existing.score >= score => {}
                    Some(existing) => {
                        existing.score = score;
                        existing.key = key.clone();
                    }
                    None => found.push(Scored {
                        key: key.clone(),
                        text: text.to_string(),
                        score,
                    }),
                }
            }
        }

        found.sort_by(|a, b| b.score.total_cmp(&a.score));
        found
    }

    /// Dictionary keys the syllables may stand for, with their penalties.
    fn key_variants(&self, syllables: &[Syllable]) -> Vec<(String, f32)> {
        let mut keys: Vec<(String, f32)> = vec![(String::new(), 0.0)];
        for syllable in syllables {
            let alts = self.alternatives(syllable);
            if alts.is_empty() {
                return Vec::new();
            }
            let mut next = Vec::with_capacity(keys.len() * alts.len());
            'outer: for (prefix, penalty) in &keys {
                for (alt, alt_penalty) in &alts {
                    if next.len() >= MAX_KEY_VARIANTS {
                        break 'outer;
                    }
                    let key = if prefix.is_empty() {
                        alt.clone()
                    } else {
                        format!("{prefix}'{alt}")
                    };
                    next.push((key, penalty + alt_penalty));
                }
            }
            keys = next;
        }
        keys
    }

    fn alternatives(&self, syllable: &Syllable) -> Vec<(String, f32)> {
        if syllable.incomplete {
            return self
                .parser
                .completions(&syllable.text)
                .take(MAX_COMPLETIONS)
                .map(|s| (s.to_string(), INCOMPLETE_PENALTY))
                .collect();
        }
        let mut alts = vec![(syllable.text.clone(), 0.0)];
        alts.extend(
            self.fuzzy
                .alternatives(&syllable.text)
                .into_iter()
                .filter(|s| self.parser.is_syllable(s))
                .map(|s| (s, FUZZY_PENALTY)),
        );
        alts
    }
}

impl Default for TableEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TableEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEngine")
            .field("phrases", &self.dictionary.len())
            .field("fuzzy", &self.fuzzy)
            .field("nbest", &self.nbest)
            .finish_non_exhaustive()
    }
}

impl ConversionEngine for TableEngine {
    type Context = TableContext;

    fn load_dictionary(&mut self, path: &Path) -> anyhow::Result<()> {
        let loaded = Dictionary::load(path)?;
        tracing::info!(phrases = loaded.len(), "dictionary loaded");
        self.dictionary.extend(loaded);
        self.cache.get_mut().clear();
        Ok(())
    }

    fn configure(&mut self, nbest: usize, fuzzy: FuzzyFlags) {
        self.nbest = nbest.max(1);
        self.fuzzy = FuzzyMap::new(fuzzy);
        self.cache.get_mut().clear();
    }

    fn new_context(engine: Arc<Self>) -> TableContext {
        TableContext::new(engine)
    }
}

fn raw_segment(syllable: &Syllable) -> Segment {
    Segment {
        key: syllable.text.clone(),
        text: syllable.text.clone(),
    }
}

fn raw_key(syllables: &[Syllable]) -> String {
    syllables
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("'")
}

/// One composition over a shared [`TableEngine`].
#[derive(Debug)]
pub struct TableContext {
    engine: Arc<TableEngine>,
    input: String,
    cursor: usize,
    selected: Vec<(Conversion, usize)>,
    conversions: Vec<Conversion>,
    candidates: Vec<Candidate>,
}

impl TableContext {
    pub fn new(engine: Arc<TableEngine>) -> Self {
        Self {
            engine,
            input: String::new(),
            cursor: 0,
            selected: Vec::new(),
            conversions: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Raw input covered by selections so far.
    pub fn selected_len(&self) -> usize {
        self.selected.last().map(|(_, end)| *end).unwrap_or(0)
    }

    pub fn engine(&self) -> &Arc<TableEngine> {
        &self.engine
    }

    fn update(&mut self) {
        let rest = &self.input[self.selected_len()..];
        self.conversions = if rest.is_empty() {
            Vec::new()
        } else {
            self.engine.convert(rest)
        };
        self.candidates = self
            .conversions
            .iter()
            .map(|c| c.candidate.clone())
            .collect();
    }
}

impl ConversionContext for TableContext {
    fn type_text(&mut self, text: &str) {
        let accepted: String = text
            .chars()
            .filter(|c| c.is_ascii_lowercase() || *c == '\'')
            .collect();
        if accepted.is_empty() {
            return;
        }
        self.input.insert_str(self.cursor, &accepted);
        self.cursor += accepted.len();
        self.update();
    }

    fn backspace(&mut self) {
        // at the edge of the converted prefix, step back one selection
        if !self.selected.is_empty() && self.cursor == self.selected_len() {
            self.selected.pop();
        } else if self.cursor > 0 {
            self.cursor -= 1;
            self.input.remove(self.cursor);
        }
        self.update();
    }

    fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
            self.update();
        }
    }

    fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.clamp(self.selected_len(), self.input.len());
    }

    fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.selected.clear();
        self.update();
    }

    fn len(&self) -> usize {
        self.input.len()
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    fn user_input(&self) -> &str {
        &self.input
    }

    fn sentence(&self) -> String {
        self.selected
            .iter()
            .map(|(c, _)| c.candidate.text.as_str())
            .collect()
    }

    fn preedit(&self) -> (String, usize) {
        let done = self.sentence();
        let split = self.selected_len();
        let cursor = done.chars().count() + self.cursor.saturating_sub(split);
        (format!("{done}{}", &self.input[split..]), cursor)
    }

    fn select(&mut self, index: usize) {
        let Some(conversion) = self.conversions.get(index).cloned() else {
            tracing::warn!(index, total = self.conversions.len(), "select out of range");
            return;
        };
        let end = self.selected_len() + conversion.consumed;
        self.selected.push((conversion, end));
        self.cursor = self.cursor.max(end);
        self.update();
    }

    fn is_selected(&self) -> bool {
        !self.input.is_empty() && self.selected_len() == self.input.len()
    }

    fn learn(&mut self) {
        let segments: Vec<Segment> = self
            .selected
            .iter()
            .flat_map(|(c, _)| c.segments.iter().cloned())
            .collect();
        self.engine.learn(&segments);
    }
}
