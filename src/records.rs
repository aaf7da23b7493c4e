//! Raw JSONL records and their preparation for the pipeline.
//!
//! Scrapers hand over one JSON object per line. Fields are all optional at
//! the wire level; `prepare` applies the defaulting rules (absent norm is
//! recomputed, `holiday_url` beats `url`) and runs the noise filter, turning
//! each line into either a `CleanRecord` or a counted `DropReason`.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::filter;
use crate::normalize::{detect_lang, normalize_title, Lang};

/// One line of a source file, exactly as the scraper wrote it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub date: Option<String>,
    pub title_raw: Option<String>,
    pub title_norm: Option<String>,
    pub description: Option<String>,
    /// Source name as claimed by the scraper. Informational only; the
    /// configured per-file name is authoritative.
    pub source: Option<String>,
    pub url: Option<String>,
    /// Some scrapers link both the day page and the holiday's own page.
    /// The holiday page wins when both are present.
    pub holiday_url: Option<String>,
}

/// A record that survived preparation and is ready for identity resolution.
#[derive(Debug, Clone)]
pub struct CleanRecord {
    pub date: NaiveDate,
    /// Marker-stripped raw title; becomes the canonical title on first sight.
    pub title_raw: String,
    pub title_norm: String,
    pub lang: Lang,
    pub description: String,
    /// May be empty; such records still resolve identity but produce no
    /// mention.
    pub url: String,
}

/// Why a record was dropped before identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingDate,
    BadDate,
    MissingTitle,
    ShortNorm,
    Noise,
}

impl DropReason {
    /// Noise drops are counted separately from malformed drops.
    pub fn is_noise(&self) -> bool {
        matches!(self, DropReason::Noise)
    }
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DropReason::MissingDate => "missing date",
            DropReason::BadDate => "unparseable date",
            DropReason::MissingTitle => "missing title",
            DropReason::ShortNorm => "degenerate normalized title",
            DropReason::Noise => "noise title",
        };
        f.write_str(s)
    }
}

/// Validate and default a raw record.
pub fn prepare(raw: RawRecord) -> Result<CleanRecord, DropReason> {
    let date_str = raw
        .date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(DropReason::MissingDate)?;
    let date =
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| DropReason::BadDate)?;

    let title_raw = match raw.title_raw.as_deref() {
        Some(t) => filter::strip_markers(t),
        None => return Err(DropReason::MissingTitle),
    };
    if title_raw.is_empty() {
        return Err(DropReason::MissingTitle);
    }
    if filter::is_noise(&title_raw) {
        return Err(DropReason::Noise);
    }

    let title_norm = match raw.title_norm.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => normalize_title(&title_raw),
    };
    if filter::norm_too_short(&title_norm) {
        return Err(DropReason::ShortNorm);
    }

    let url = raw
        .holiday_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| raw.url.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or("")
        .to_string();

    Ok(CleanRecord {
        date,
        lang: detect_lang(&title_raw),
        title_raw,
        title_norm,
        description: raw.description.unwrap_or_default(),
        url,
    })
}
