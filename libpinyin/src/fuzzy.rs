//! Fuzzy spelling alternatives for pinyin syllables.
//!
//! Rules come from the engine's [`FuzzyFlags`]. Initial rules swap the
//! leading consonant (`z` and `zh`, `l` and `n`, ...), final rules swap the
//! nasal ending (`an` and `ang`, ...). Both directions apply, and an initial
//! swap may combine with a final swap. The caller filters out spellings that
//! are not real syllables.

use imsession_core::FuzzyFlags;

/// Score penalty applied to a candidate found through a fuzzy spelling.
pub const FUZZY_PENALTY: f32 = 1.0;

const INITIAL_RULES: &[(FuzzyFlags, &str, &str)] = &[
    (FuzzyFlags::C_CH, "c", "ch"),
    (FuzzyFlags::S_SH, "s", "sh"),
    (FuzzyFlags::Z_ZH, "z", "zh"),
    (FuzzyFlags::L_N, "l", "n"),
    (FuzzyFlags::F_H, "f", "h"),
    (FuzzyFlags::L_R, "l", "r"),
];

const FINAL_RULES: &[(FuzzyFlags, &str, &str)] = &[
    (FuzzyFlags::AN_ANG, "an", "ang"),
    (FuzzyFlags::EN_ENG, "en", "eng"),
    (FuzzyFlags::IN_ING, "in", "ing"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuzzyMap {
    flags: Option<FuzzyFlags>,
}

impl FuzzyMap {
    pub fn new(flags: FuzzyFlags) -> Self {
        Self {
            flags: (!flags.is_empty()).then_some(flags),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.is_some()
    }

    /// Alternate spellings of `syllable`, excluding the syllable itself.
    pub fn alternatives(&self, syllable: &str) -> Vec<String> {
        let Some(flags) = self.flags else {
            return Vec::new();
        };

        let mut initials = vec![syllable.to_string()];
        for &(flag, a, b) in INITIAL_RULES {
            if flags.contains(flag) {
                swap_prefix(syllable, a, b, &mut initials);
            }
        }

        let mut out = initials.clone();
        for spelling in &initials {
            for &(flag, a, b) in FINAL_RULES {
                if flags.contains(flag) {
                    swap_suffix(spelling, a, b, &mut out);
                }
            }
        }

        out.retain(|s| s != syllable);
        out
    }
}

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}

fn swap_prefix(syllable: &str, a: &str, b: &str, out: &mut Vec<String>) {
    // the longer spelling first so "zh" is not read as "z" + "h"
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if let Some(rest) = syllable.strip_prefix(long) {
        push_unique(out, format!("{short}{rest}"));
    } else if let Some(rest) = syllable.strip_prefix(short) {
        push_unique(out, format!("{long}{rest}"));
    }
}

fn swap_suffix(syllable: &str, a: &str, b: &str, out: &mut Vec<String>) {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if let Some(stem) = syllable.strip_suffix(long) {
        push_unique(out, format!("{stem}{short}"));
    } else if let Some(stem) = syllable.strip_suffix(short) {
        push_unique(out, format!("{stem}{long}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_map_has_no_alternatives() {
        let map = FuzzyMap::new(FuzzyFlags::empty());
        assert!(!map.is_enabled());
        assert!(map.alternatives("zhong").is_empty());
    }

    #[test]
    fn test_initial_swaps_both_ways() {
        let map = FuzzyMap::new(FuzzyFlags::Z_ZH);
        assert_eq!(map.alternatives("zhong"), vec!["zong"]);
        assert_eq!(map.alternatives("zong"), vec!["zhong"]);
        assert!(map.alternatives("cong").is_empty());
    }

    #[test]
    fn test_final_swaps() {
        let map = FuzzyMap::new(FuzzyFlags::AN_ANG | FuzzyFlags::IN_ING);
        assert_eq!(map.alternatives("xian"), vec!["xiang"]);
        assert_eq!(map.alternatives("ping"), vec!["pin"]);
    }

    #[test]
    fn test_combined_rules() {
        let map = FuzzyMap::new(FuzzyFlags::S_SH | FuzzyFlags::EN_ENG);
        let alts = map.alternatives("shen");
        assert!(alts.contains(&"sen".to_string()));
        assert!(alts.contains(&"sheng".to_string()));
        assert!(alts.contains(&"seng".to_string()));
        assert!(!alts.contains(&"shen".to_string()));
    }

    #[test]
    fn test_l_shared_by_two_rules() {
        let map = FuzzyMap::new(FuzzyFlags::L_N | FuzzyFlags::L_R);
        let alts = map.alternatives("lu");
        assert_eq!(alts, vec!["nu", "ru"]);
    }
}
