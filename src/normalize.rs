//! Title normalization and language classification.
//!
//! Every dedup decision in the pipeline keys off the normalized title, so the
//! rules here are deliberately small and stable: lowercase, fold ё to е,
//! reduce everything outside [a-zа-я0-9 -] to a space, collapse whitespace.

use once_cell::sync::Lazy;
use regex::Regex;

// Disallowed characters become spaces, not nothing, so that punctuation
// keeps acting as a word boundary ("rock'n'roll" -> "rock n roll").
static NON_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zа-я0-9\s\-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static CYRILLIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[а-яё]").unwrap());

/// Reduce a raw title to its canonical comparison key.
///
/// Always returns a string; an empty result means the title carried no
/// usable characters and the record should be rejected by the caller.
pub fn normalize_title(raw: &str) -> String {
    let lowered = raw.to_lowercase().replace('ё', "е");
    let keyed = NON_KEY_CHARS.replace_all(&lowered, " ");
    WHITESPACE.replace_all(keyed.trim(), " ").into_owned()
}

/// Language tag attached to every holiday. Classification is binary:
/// a single Cyrillic letter anywhere makes the title Russian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Ru,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Ru => "ru",
            Lang::En => "en",
        }
    }

    /// Map a stored tag back to a language. Anything that is not "ru" is
    /// English, mirroring the presence test used at classification time.
    pub fn from_tag(tag: &str) -> Lang {
        if tag == "ru" {
            Lang::Ru
        } else {
            Lang::En
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a title by character content: `ru` if it contains at least one
/// Cyrillic letter, `en` otherwise.
pub fn detect_lang(text: &str) -> Lang {
    if CYRILLIC.is_match(&text.to_lowercase()) {
        Lang::Ru
    } else {
        Lang::En
    }
}
