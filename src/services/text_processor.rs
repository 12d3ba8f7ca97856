// Text Processing Service
// Handle normalization, word tokenization and fuzzy similarity

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::models::Candidate;

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]|_").expect("non-word regex"))
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\W_]+").expect("word regex"))
}

// ============================================================================
// Character tables
// ============================================================================

/// Fold a lower-cased confusable character to its Latin look-alike.
/// ASCII input is always returned unchanged.
fn fold_homoglyph(c: char) -> char {
    if c.is_ascii() {
        return c;
    }
    match c {
        // Cyrillic
        'а' => 'a',
        'в' | 'ь' => 'b',
        'е' | 'ё' | 'є' => 'e',
        'к' => 'k',
        'м' => 'm',
        'н' => 'h',
        'о' => 'o',
        'р' => 'p',
        'с' => 'c',
        'т' => 't',
        'у' | 'ў' => 'y',
        'х' => 'x',
        'ѕ' => 's',
        'і' | 'ї' | 'ӏ' => 'i',
        'ј' => 'j',
        'ԁ' => 'd',
        'ԛ' => 'q',
        'ԝ' => 'w',
        // Greek
        'α' | 'ά' => 'a',
        'β' => 'b',
        'γ' => 'y',
        'ε' | 'έ' => 'e',
        'η' | 'ή' => 'n',
        'ι' | 'ί' | 'ϊ' => 'i',
        'κ' => 'k',
        'ν' => 'v',
        'ο' | 'ό' => 'o',
        'ρ' => 'p',
        'τ' => 't',
        'υ' | 'ύ' | 'ϋ' => 'u',
        'χ' => 'x',
        'ω' | 'ώ' => 'w',
        // Latin with diacritics
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'æ' => 'a',
        'ć' | 'ĉ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ɡ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'į' | 'ı' => 'i',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ł' => 'l',
        'ń' | 'ň' | 'ņ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ŕ' | 'ř' => 'r',
        'ś' | 'š' | 'ş' => 's',
        'ť' | 'ţ' => 't',
        'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        // Full-width forms
        '\u{FF41}'..='\u{FF5A}' => char::from(b'a' + (c as u32 - 0xFF41) as u8),
        '\u{FF10}'..='\u{FF19}' => char::from(b'0' + (c as u32 - 0xFF10) as u8),
        _ => c,
    }
}

/// Leetspeak table, applied after non-word characters are stripped.
fn substitute_leet(c: char) -> char {
    match c {
        '0' => 'o',
        '1' | '!' | '|' => 'i',
        '3' => 'e',
        '4' | '@' | '^' => 'a',
        '5' | '$' => 's',
        '7' | '+' => 't',
        '8' => 'b',
        '9' => 'g',
        '(' | '[' => 'c',
        ')' | ']' => 'd',
        '¥' => 'y',
        '2' => 'z',
        'ü' | 'ù' | 'ú' | 'û' | 'ũ' | 'ū' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        _ => c,
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Collapse each maximal run of an identical letter to a single occurrence.
fn collapse_letter_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c.is_alphabetic() && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Lower-case, fold homoglyphs, collapse letter runs and strip non-word
/// characters. Leetspeak digits are still present in the result.
pub fn fold_handle(text: &str) -> String {
    let folded: String = text.to_lowercase().chars().map(fold_homoglyph).collect();
    let collapsed = collapse_letter_runs(&folded);
    non_word_re().replace_all(&collapsed, "").into_owned()
}

/// Canonical comparable form of a handle.
///
/// Substitution can produce new letter runs (`b00` becomes `boo`), so runs are
/// collapsed a second time to keep the function idempotent.
pub fn normalize_handle(text: &str) -> String {
    normalize_folded(&fold_handle(text))
}

fn normalize_folded(folded: &str) -> String {
    let substituted: String = folded.chars().map(substitute_leet).collect();
    collapse_letter_runs(&substituted)
}

impl Candidate {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let folded = fold_handle(&raw);
        let normalized = normalize_folded(&folded);
        Self {
            raw,
            folded,
            normalized,
        }
    }
}

// ============================================================================
// Tokenization & similarity
// ============================================================================

/// Split text into word-like tokens.
pub fn tokenize_words(text: &str) -> Vec<&str> {
    word_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// Sørensen-Dice coefficient over character bigrams, whitespace ignored.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in a.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for pair in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2.0 * intersection as f64) / ((a.len() - 1) + (b.len() - 1)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_handle(""), "");
        assert_eq!(fold_handle(""), "");
    }

    #[test]
    fn test_repeated_letters_collapse() {
        assert_eq!(normalize_handle("coooool"), normalize_handle("col"));
        assert_eq!(normalize_handle("coooool"), "col");
    }

    #[test]
    fn test_leetspeak_substitution() {
        assert_eq!(normalize_handle("b4dw0rd"), "badword");
        assert_eq!(normalize_handle("B4D_W0RD!!"), "badword");
        assert_eq!(normalize_handle("h3ll0"), "helo");
    }

    #[test]
    fn test_homoglyphs_fold_to_latin() {
        // Cyrillic а and о
        assert_eq!(normalize_handle("b\u{0430}dw\u{043E}rd"), "badword");
        assert_eq!(normalize_handle("ÇAFÉ"), "cafe");
        assert_eq!(normalize_handle("\u{FF42}\u{FF41}\u{FF44}"), "bad");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "coooool",
            "b00",
            "a.a",
            "XxX_Sl4y3r_XxX",
            "coolguy69xx",
            "john_doe",
            "ÑÜÇ¥",
            "  spaced   out  ",
            "６９ｌｉｆｅ",
            "",
        ];
        for s in samples {
            let once = normalize_handle(s);
            assert_eq!(normalize_handle(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_fold_keeps_digits() {
        let candidate = Candidate::new("coolguy69xx");
        assert_eq!(candidate.folded, "colguy69x");
        assert_eq!(candidate.normalized, "colguygx");
    }

    #[test]
    fn test_underscore_stripped() {
        assert_eq!(normalize_handle("john_doe"), "johndoe");
    }

    #[test]
    fn test_tokenize_words() {
        assert_eq!(tokenize_words("bad word  here"), vec!["bad", "word", "here"]);
        assert!(tokenize_words("").is_empty());
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("bad", "bad"), 1.0);
        assert_eq!(similarity("a", "b"), 0.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        let s = similarity("badword", "badwords");
        assert!(s > 0.9 && s < 1.0);
        // "night" vs "nacht": only "ht" is shared
        assert!((similarity("night", "nacht") - 0.25).abs() < 1e-9);
    }
}
