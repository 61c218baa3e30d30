// libpinyin/src/parser.rs
//
// Pinyin syllable segmentation.
// - Greedy longest match over the standard syllable list
// - Explicit apostrophes always split
// - A trailing fragment that starts some syllable is kept as incomplete

use ahash::AHashSet;

/// All standard pinyin syllables (without tone markers).
pub const PINYIN_SYLLABLES: &[&str] = &[
    "a", "ai", "an", "ang", "ao", "ba", "bai", "ban", "bang", "bao", "bei", "ben", "beng", "bi",
    "bian", "biao", "bie", "bin", "bing", "bo", "bu", "ca", "cai", "can", "cang", "cao", "ce",
    "cen", "ceng", "cha", "chai", "chan", "chang", "chao", "che", "chen", "cheng", "chi", "chong",
    "chou", "chu", "chuai", "chuan", "chuang", "chui", "chun", "chuo", "ci", "cong", "cou", "cu",
    "cuan", "cui", "cun", "cuo", "da", "dai", "dan", "dang", "dao", "de", "dei", "deng", "di",
    "dia", "dian", "diao", "die", "ding", "diu", "dong", "dou", "du", "duan", "dui", "dun", "duo",
    "e", "ei", "en", "er", "fa", "fan", "fang", "fei", "fen", "feng", "fo", "fou", "fu", "ga",
    "gai", "gan", "gang", "gao", "ge", "gei", "gen", "geng", "gong", "gou", "gu", "gua", "guai",
    "guan", "guang", "gui", "gun", "guo", "ha", "hai", "han", "hang", "hao", "he", "hei", "hen",
    "heng", "hong", "hou", "hu", "hua", "huai", "huan", "huang", "hui", "hun", "huo", "ji", "jia",
    "jian", "jiang", "jiao", "jie", "jin", "jing", "jiong", "jiu", "ju", "juan", "jue", "jun",
    "ka", "kai", "kan", "kang", "kao", "ke", "ken", "keng", "kong", "kou", "ku", "kua", "kuai",
    "kuan", "kuang", "kui", "kun", "kuo", "la", "lai", "lan", "lang", "lao", "le", "lei", "leng",
    "li", "lia", "lian", "liang", "liao", "lie", "lin", "ling", "liu", "lo", "long", "lou", "lu",
    "luan", "lun", "luo", "lv", "lve", "ma", "mai", "man", "mang", "mao", "me", "mei", "men",
    "meng", "mi", "mian", "miao", "mie", "min", "ming", "miu", "mo", "mou", "mu", "na", "nai",
    "nan", "nang", "nao", "ne", "nei", "nen", "neng", "ng", "ni", "nian", "niang", "niao", "nie",
    "nin", "ning", "niu", "nong", "nou", "nu", "nuan", "nuo", "nv", "nve", "o", "ou", "pa", "pai",
    "pan", "pang", "pao", "pei", "pen", "peng", "pi", "pian", "piao", "pie", "pin", "ping", "po",
    "pou", "pu", "qi", "qia", "qian", "qiang", "qiao", "qie", "qin", "qing", "qiong", "qiu", "qu",
    "quan", "que", "qun", "ran", "rang", "rao", "re", "ren", "reng", "ri", "rong", "rou", "ru",
    "ruan", "rui", "run", "ruo", "sa", "sai", "san", "sang", "sao", "se", "sen", "seng", "sha",
    "shai", "shan", "shang", "shao", "she", "shei", "shen", "sheng", "shi", "shou", "shu", "shua",
    "shuai", "shuan", "shuang", "shui", "shun", "shuo", "si", "song", "sou", "su", "suan", "sui",
    "sun", "suo", "ta", "tai", "tan", "tang", "tao", "te", "teng", "ti", "tian", "tiao", "tie",
    "ting", "tong", "tou", "tu", "tuan", "tui", "tun", "tuo", "wa", "wai", "wan", "wang", "wei",
    "wen", "weng", "wo", "wu", "xi", "xia", "xian", "xiang", "xiao", "xie", "xin", "xing", "xiong",
    "xiu", "xu", "xuan", "xue", "xun", "ya", "yan", "yang", "yao", "ye", "yi", "yin", "ying", "yo",
    "yong", "you", "yu", "yuan", "yue", "yun", "za", "zai", "zan", "zang", "zao", "ze", "zei",
    "zen", "zeng", "zha", "zhai", "zhan", "zhang", "zhao", "zhe", "zhen", "zheng", "zhi", "zhong",
    "zhou", "zhu", "zhua", "zhuai", "zhuan", "zhuang", "zhui", "zhun", "zhuo", "zi", "zong", "zou",
    "zu", "zuan", "zui", "zun", "zuo",
];

/// A segmented chunk of the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syllable {
    pub text: String,
    /// Byte offset of the first letter in the raw input.
    pub start: usize,
    /// Byte offset just past the last letter.
    pub end: usize,
    /// True for a fragment that is not (yet) a full syllable.
    pub incomplete: bool,
}

/// Splits raw pinyin into syllables.
#[derive(Debug, Clone)]
pub struct Parser {
    syllables: AHashSet<&'static str>,
    prefixes: AHashSet<&'static str>,
    max_len: usize,
}

impl Parser {
    pub fn new() -> Self {
        let mut syllables = AHashSet::with_capacity(PINYIN_SYLLABLES.len());
        let mut prefixes = AHashSet::new();
        let mut max_len = 0;
        for &s in PINYIN_SYLLABLES {
            syllables.insert(s);
            max_len = max_len.max(s.len());
            for end in 1..=s.len() {
                prefixes.insert(&s[..end]);
            }
        }
        Self {
            syllables,
            prefixes,
            max_len,
        }
    }

    pub fn is_syllable(&self, text: &str) -> bool {
        self.syllables.contains(text)
    }

    /// Whether some syllable starts with `fragment`.
    pub fn is_prefix(&self, fragment: &str) -> bool {
        self.prefixes.contains(fragment)
    }

    /// Syllables that complete `fragment`, in table order.
    pub fn completions<'a>(&self, fragment: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        PINYIN_SYLLABLES
            .iter()
            .copied()
            .filter(move |s| s.starts_with(fragment))
    }

    pub fn segment(&self, input: &str) -> Vec<Syllable> {
        let bytes = input.as_bytes();
        let mut out = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            if !bytes[pos].is_ascii_lowercase() {
                // apostrophes (and anything else) only separate
                pos += 1;
                continue;
            }

            let (len, incomplete) = match self.longest_match(&input[pos..]) {
                Some(len) => (len, false),
                None => (self.fragment_len(&input[pos..]), true),
            };
            out.push(Syllable {
                text: input[pos..pos + len].to_string(),
                start: pos,
                end: pos + len,
                incomplete,
            });
            pos += len;
        }

        out
    }

    fn letters(&self, rest: &str) -> usize {
        rest.bytes()
            .take_while(u8::is_ascii_lowercase)
            .count()
            .min(self.max_len)
    }

    /// Longest syllable at the start of `rest`, avoiding matches that strand a
    /// letter no syllable can begin with.
    fn longest_match(&self, rest: &str) -> Option<usize> {
        let mut stranding = None;
        for len in (1..=self.letters(rest)).rev() {
            if !self.is_syllable(&rest[..len]) {
                continue;
            }
            match rest.as_bytes().get(len) {
                Some(&next) if next.is_ascii_lowercase() && !starts_syllable(next) => {
                    stranding.get_or_insert(len);
                }
                _ => return Some(len),
            }
        }
        stranding
    }

    fn fragment_len(&self, rest: &str) -> usize {
        (1..=self.letters(rest))
            .rev()
            .find(|&len| self.is_prefix(&rest[..len]))
            .unwrap_or(1)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn starts_syllable(letter: u8) -> bool {
    !matches!(letter, b'i' | b'u' | b'v')
}
