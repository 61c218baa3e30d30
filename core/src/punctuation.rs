//! ASCII to full-width Chinese punctuation.
//!
//! The table is a compile-time perfect hash map; it is consulted only when the
//! composition buffer is empty, so punctuation typed mid-composition reaches
//! the host untouched.

use phf::phf_map;

static PUNCTUATION: phf::Map<char, &'static str> = phf_map! {
    ',' => "，",
    '.' => "。",
    '?' => "？",
    '!' => "！",
    ';' => "；",
    ':' => "：",
    '(' => "（",
    ')' => "）",
    '[' => "【",
    ']' => "】",
    '<' => "《",
    '>' => "》",
    '"' => "\"",
    '\'' => "'",
    '~' => "～",
    '\\' => "、",
    '$' => "￥",
    '^' => "……",
    '_' => "——",
};

/// Lookup into the process-wide punctuation table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationMap;

impl PunctuationMap {
    /// Native punctuation for an ASCII key, if one is defined.
    pub fn lookup(ch: char) -> Option<&'static str> {
        PUNCTUATION.get(&ch).copied()
    }
}
