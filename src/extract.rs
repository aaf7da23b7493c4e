//! Description extraction and cleaning for fetched holiday pages.
//!
//! Pages arrive as raw HTML; this module pulls out the first paragraph that
//! looks like article prose (length gate against captions and nav text),
//! then strips the boilerplate the calendar sites wrap around it. No DOM is
//! built: script/style/nav blocks are cut out, `<p>` bodies are scanned in
//! document order, entities are decoded, whitespace is collapsed.

use once_cell::sync::Lazy;
use regex::Regex;

/// Paragraphs in a full article body must reach this length.
pub const ARTICLE_MIN_CHARS: usize = 80;
/// Shorter template pages get a relaxed paragraph gate.
pub const TEMPLATE_MIN_CHARS: usize = 60;
/// Cleaned descriptions below this length are discarded as unusable.
pub const MIN_DESCRIPTION_CHARS: usize = 60;

/// Markup whose entire content is never prose.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "header", "footer", "nav", "aside",
];

/// Trailing boilerplate the calendar sites append to article bodies.
const BOILERPLATE_PHRASES: &[&str] = &[
    "Календарь праздников",
    "Календарь народных праздников",
    "Даты международных знаменательных событий",
    "Краткая история и традиции праздника",
    "Краткая история и значение события",
];

/// Characters trimmed between a leading title echo and the prose proper.
const ECHO_SEPARATORS: &[char] = &[' ', '.', ':', '-', '–', '—'];

static DROP_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    DROPPED_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect()
});
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").unwrap());
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d{1,2}\s+[а-яё]+\s+\d{4}\s*[-–—]\s*").unwrap());
static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    BOILERPLATE_PHRASES
        .iter()
        .map(|phrase| Regex::new(&format!(r"(?i)\b{}\b\.?", regex::escape(phrase))).unwrap())
        .collect()
});

/// Pull a cleaned description out of a fetched page, or an empty string if
/// the page has no usable prose.
pub fn extract_description(html: &str, title: &str) -> String {
    let body = strip_noise_blocks(html);

    // First article-length paragraph wins; its cleaned form is final even
    // if cleaning gates it down to empty.
    if let Some(text) = first_paragraph(&body, ARTICLE_MIN_CHARS) {
        return clean_description(&text, title);
    }
    if let Some(line) = first_text_line(&body, ARTICLE_MIN_CHARS) {
        return clean_description(&line, title);
    }
    // Template pages keep descriptions in one short paragraph.
    if let Some(text) = first_paragraph(&body, TEMPLATE_MIN_CHARS) {
        return clean_description(&text, title);
    }
    String::new()
}

/// Strip site chrome from extracted prose: a leading "<day> <month> <year> -"
/// stamp, a leading repetition of the holiday title, and known trailing
/// boilerplate phrases. Results shorter than [`MIN_DESCRIPTION_CHARS`]
/// degrade to an empty string.
pub fn clean_description(text: &str, title: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ").into_owned();
    let dated = DATE_PREFIX.replace(&collapsed, "").into_owned();
    let mut d = strip_title_echo(&dated, title);
    for re in BOILERPLATE.iter() {
        d = re.replace_all(&d, "").into_owned();
    }
    let d = WHITESPACE.replace_all(d.trim(), " ");
    let d = d.trim();
    if d.chars().count() < MIN_DESCRIPTION_CHARS {
        String::new()
    } else {
        d.to_string()
    }
}

/// Word-boundary truncation for display of secondary descriptions.
pub fn short(text: &str, max_chars: usize) -> String {
    let s = text.trim();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let prefix: String = s.chars().take(max_chars).collect();
    let cut = match prefix.rfind(' ') {
        Some(i) => &prefix[..i],
        None => prefix.as_str(),
    };
    format!("{}…", cut)
}

fn strip_noise_blocks(html: &str) -> String {
    let mut out = COMMENT.replace_all(html, " ").into_owned();
    for re in DROP_BLOCKS.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    out
}

fn first_paragraph(html: &str, min_chars: usize) -> Option<String> {
    for cap in PARAGRAPH.captures_iter(html) {
        let text = html_to_text(cap.get(1).map(|m| m.as_str()).unwrap_or(""));
        if text.chars().count() >= min_chars {
            return Some(text);
        }
    }
    None
}

fn first_text_line(html: &str, min_chars: usize) -> Option<String> {
    let text = TAGS.replace_all(html, "\n");
    let decoded = html_escape::decode_html_entities(&text);
    for line in decoded.lines() {
        let line = WHITESPACE.replace_all(line.trim(), " ");
        if line.chars().count() >= min_chars {
            return Some(line.into_owned());
        }
    }
    None
}

fn html_to_text(fragment: &str) -> String {
    let stripped = TAGS.replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Remove a leading repetition of the title. Pages routinely open the body
/// with the holiday name followed by a separator.
fn strip_title_echo(text: &str, title: &str) -> String {
    let t = WHITESPACE.replace_all(title.trim(), " ");
    if t.is_empty() {
        return text.to_string();
    }

    let wanted = t.chars().count();
    let mut seen = 0;
    let mut end = 0;
    for (i, c) in text.char_indices() {
        if seen == wanted {
            end = i;
            break;
        }
        seen += 1;
        end = i + c.len_utf8();
    }
    if seen < wanted {
        return text.to_string();
    }

    if text[..end].to_lowercase() == t.to_lowercase() {
        text[end..].trim_start_matches(ECHO_SEPARATORS).to_string()
    } else {
        text.to_string()
    }
}
