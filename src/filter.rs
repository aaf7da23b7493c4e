//! Noise rejection for scraped titles.
//!
//! Listing pages leak page furniture into the raw records: category headers,
//! "N день" counters, subscription prompts, breadcrumbs. Everything here is a
//! fixed rule table applied before identity resolution; the filter decides
//! keep-or-drop and never errors.

use once_cell::sync::Lazy;
use regex::Regex;

/// Titles that are category/menu labels rather than holidays.
const CATEGORY_TITLES: &[&str] = &[
    "праздники",
    "международные праздники",
    "католические праздники",
    "православные праздники",
];

/// Section headers that precede non-holiday page blocks.
const SECTION_PREFIXES: &[&str] = &[
    "именины",
    "народный календарь",
    "хроника",
    "персоны",
    "ближайшие дни",
];

/// Substrings that only ever appear in site navigation and signup chrome.
const MENU_FRAGMENTS: &[&str] = &[
    "журнал",
    "подпишитесь",
    "введите корректный email",
    "политикой конфиденциальности",
    "получить код",
    "информер",
    "праздники именины",
    "производственные календари",
    "смотреть другие информеры",
    "главная страница / календарь",
];

/// Normalized titles shorter than this carry no identity.
pub const MIN_NORM_CHARS: usize = 3;

static FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\s*\d+\s*\]").unwrap());
static TRAILING_LANG_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\((?:ru|en)\)\s*$").unwrap());
static DAY_COUNTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*день$").unwrap());

/// Strip wiki-style footnote markers (`[12]`) and a trailing `(ru)`/`(en)`
/// language tag. The stripped form is what gets stored downstream.
pub fn strip_markers(raw: &str) -> String {
    let no_footnotes = FOOTNOTE.replace_all(raw, "");
    TRAILING_LANG_TAG.replace(&no_footnotes, "").trim().to_string()
}

/// True if a marker-stripped title is page furniture rather than a holiday.
pub fn is_noise(title: &str) -> bool {
    let lowered = title.to_lowercase();
    let lowered = lowered.trim();

    if CATEGORY_TITLES.contains(&lowered) {
        return true;
    }
    if DAY_COUNTER.is_match(lowered) {
        return true;
    }
    if SECTION_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return true;
    }
    if MENU_FRAGMENTS.iter().any(|f| lowered.contains(f)) {
        return true;
    }
    false
}

/// True if a normalized title is too short to serve as an identity key.
pub fn norm_too_short(norm: &str) -> bool {
    norm.chars().count() < MIN_NORM_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_footnote_markers() {
        assert_eq!(strip_markers("праздники[1]"), "праздники");
        assert_eq!(strip_markers("Новый год[ 12 ]"), "Новый год");
        assert_eq!(strip_markers("Новый год"), "Новый год");
    }

    #[test]
    fn test_strip_trailing_lang_tag() {
        assert_eq!(strip_markers("День труда (ru)"), "День труда");
        assert_eq!(strip_markers("May Day (en) "), "May Day");
        // Only a trailing tag is stripped, not one mid-title.
        assert_eq!(strip_markers("День (ru) труда"), "День (ru) труда");
    }

    #[test]
    fn test_rejects_category_titles() {
        assert!(is_noise("праздники"));
        assert!(is_noise("Международные праздники"));
        assert!(is_noise("ПРАВОСЛАВНЫЕ ПРАЗДНИКИ"));
        assert!(is_noise(&strip_markers("праздники[1]")));
    }

    #[test]
    fn test_rejects_day_counters() {
        assert!(is_noise("3 день"));
        assert!(is_noise("12 день"));
        assert!(is_noise("12  день"));
        // A real title containing "день" elsewhere survives.
        assert!(!is_noise("День программиста"));
    }

    #[test]
    fn test_rejects_section_prefixes() {
        assert!(is_noise("Именины у Ивана"));
        assert!(is_noise("народный календарь на март"));
        assert!(is_noise("Персоны дня"));
    }

    #[test]
    fn test_rejects_menu_chrome() {
        assert!(is_noise("Подпишитесь на рассылку"));
        assert!(is_noise("Смотреть другие информеры"));
        assert!(is_noise("Главная страница / Календарь на 2025 год"));
    }

    #[test]
    fn test_accepts_real_holidays() {
        assert!(!is_noise("Новый год"));
        assert!(!is_noise("День смеха"));
        assert!(!is_noise("International Workers' Day"));
    }

    #[test]
    fn test_short_norms_rejected() {
        assert!(norm_too_short(""));
        assert!(norm_too_short("ян"));
        assert!(!norm_too_short("май"));
    }
}
