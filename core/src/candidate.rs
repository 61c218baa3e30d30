//! Candidate types and page arithmetic.
//!
//! This module provides:
//! - `Candidate`: a single converted text proposal with its score
//! - `CandidatePager`: page-granular navigation over a candidate list whose
//!   length changes after every buffer mutation

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single text candidate with an associated score.
///
/// Scores are on a relative scale; higher is better. A candidate is only
/// meaningful until the next buffer mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub score: f32,
}

impl Candidate {
    pub fn new<T: Into<String>>(text: T, score: f32) -> Self {
        Candidate {
            text: text.into(),
            score,
        }
    }
}

/// Page navigation over a candidate list.
///
/// The pager does not own the candidates; callers pass the current count,
/// since the conversion engine recomputes the list after every mutation.
/// Navigation is page-granular only: there is no per-row cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePager {
    page_size: usize,
    current_page: usize,
}

impl CandidatePager {
    /// Create a pager. A page size of zero is clamped to one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current_page: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current page index (0-based).
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of pages needed for `count` candidates.
    pub fn num_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size)
    }

    /// Move to the previous page. Returns true if the page changed.
    pub fn page_up(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.current_page -= 1;
        true
    }

    /// Move to the next page. Returns true if the page changed.
    pub fn page_down(&mut self, count: usize) -> bool {
        if self.current_page + 1 >= self.num_pages(count) {
            return false;
        }
        self.current_page += 1;
        true
    }

    /// Alias for [`page_up`](Self::page_up).
    pub fn cursor_up(&mut self) -> bool {
        self.page_up()
    }

    /// Alias for [`page_down`](Self::page_down).
    pub fn cursor_down(&mut self, count: usize) -> bool {
        self.page_down(count)
    }

    /// Go back to the first page.
    pub fn reset(&mut self) {
        self.current_page = 0;
    }

    /// Absolute candidate index of `slot` on the current page.
    pub fn absolute_index(&self, slot: usize) -> usize {
        self.current_page * self.page_size + slot
    }

    /// Range of candidate indices visible on the current page.
    pub fn page_range(&self, count: usize) -> Range<usize> {
        let start = (self.current_page * self.page_size).min(count);
        let end = (start + self.page_size).min(count);
        start..end
    }

    /// Slice of `candidates` visible on the current page.
    pub fn visible<'a>(&self, candidates: &'a [Candidate]) -> &'a [Candidate] {
        &candidates[self.page_range(candidates.len())]
    }
}

impl Default for CandidatePager {
    fn default() -> Self {
        Self::new(9)
    }
}
