//! Plain-text phrase dictionary.
//!
//! One entry per line: `key phrase [freq]`, where `key` is the phrase's
//! syllables joined with apostrophes (`ni'hao`). Blank lines and lines
//! starting with `#` are ignored. Malformed lines are logged and skipped.

use std::path::Path;

use ahash::AHashMap;
use anyhow::Context;
use unicode_normalization::UnicodeNormalization;

const DEFAULT_FREQ: u32 = 1;

/// Small built-in table so the engine is usable without data files.
const DEMO_TABLE: &str = "\
# key phrase freq
ni 你 900
ni 泥 200
ni 拟 120
hao 好 900
hao 号 300
ni'hao 你好 800
ni'hao 拟好 50
wo 我 950
men 们 400
wo'men 我们 700
shi 是 990
shi 十 400
shi 事 380
de 的 999
de 得 500
shi'jie 世界 600
jie 界 200
jie 接 300
xie 谢 400
xie 写 350
xie'xie 谢谢 650
zhong 中 800
zhong 种 300
guo 国 700
guo 过 650
zhong'guo 中国 850
ren 人 900
zhong'guo'ren 中国人 500
pin 拼 200
yin 音 400
yin 因 380
pin'yin 拼音 500
shu 书 500
shu 输 300
ru 如 400
ru 入 380
shu'ru 输入 450
fa 法 500
fa 发 480
shu'ru'fa 输入法 400
zai 在 900
zai 再 500
jian 见 450
jian 间 400
zai'jian 再见 500
da 大 800
da 打 500
jia 家 700
jia 加 450
da'jia 大家 550
xi 西 400
xi 系 380
an 安 350
xi'an 西安 300
xian 先 450
xian 现 430
zhi 只 500
zhi 知 450
dao 到 700
dao 道 650
zhi'dao 知道 600
bu 不 950
ke 可 600
yi 一 950
yi 以 700
ke'yi 可以 650
";

/// A phrase and its corpus frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub phrase: String,
    pub freq: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: AHashMap<String, Vec<Entry>>,
    phrases: usize,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in demo table.
    pub fn demo() -> Self {
        Self::parse(DEMO_TABLE)
    }

    /// Load a dictionary file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dictionary {}", path.display()))?;
        let dict = Self::parse(&text);
        if dict.is_empty() {
            anyhow::bail!("dictionary {} has no entries", path.display());
        }
        tracing::debug!(path = %path.display(), phrases = dict.len(), "parsed dictionary");
        Ok(dict)
    }

    pub fn parse(text: &str) -> Self {
        let mut dict = Self::new();
        let mut skipped = 0usize;

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Some((key, phrase, freq)) => dict.insert(&key, &phrase, freq),
                None => {
                    skipped += 1;
                    tracing::warn!(line = lineno + 1, text = line, "skipping malformed dictionary line");
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "dictionary had malformed lines");
        }
        dict
    }

    /// Add a phrase. A phrase already present under `key` keeps the higher
    /// frequency.
    pub fn insert(&mut self, key: &str, phrase: &str, freq: u32) {
        let phrase: String = phrase.nfc().collect();
        let list = self.entries.entry(key.to_string()).or_default();
        match list.iter_mut().find(|e| e.phrase == phrase) {
            Some(existing) => existing.freq = existing.freq.max(freq),
            None => {
                list.push(Entry { phrase, freq });
                self.phrases += 1;
            }
        }
    }

    /// Merge another dictionary into this one.
    pub fn extend(&mut self, other: Dictionary) {
        for (key, list) in other.entries {
            for entry in list {
                self.insert(&key, &entry.phrase, entry.freq);
            }
        }
    }

    pub fn get(&self, key: &str) -> &[Entry] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of phrases.
    pub fn len(&self) -> usize {
        self.phrases
    }

    pub fn is_empty(&self) -> bool {
        self.phrases == 0
    }
}

/// Canonical form of a dictionary key: lowercase syllables joined by single
/// apostrophes.
pub fn normalize_key(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    let parts: Vec<&str> = key.split('\'').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() || !parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_lowercase())) {
        return None;
    }
    Some(parts.join("'"))
}

fn parse_line(line: &str) -> Option<(String, String, u32)> {
    let mut fields = line.split_whitespace();
    let key = normalize_key(fields.next()?)?;
    let phrase = fields.next()?.to_string();
    let freq = match fields.next() {
        Some(f) => f.parse().ok()?,
        None => DEFAULT_FREQ,
    };
    if fields.next().is_some() {
        return None;
    }
    Some((key, phrase, freq))
}
