//! Core data models shared by the query surface.
//!
//! These are the read-side shapes: what a date lookup, an occurrence view,
//! or a title search hands back to the CLI. Write-side record types live in
//! [`crate::records`].

use chrono::NaiveDate;

use crate::normalize::Lang;

/// One source's statement about an occurrence, as read back for display
/// and description selection.
#[derive(Debug, Clone)]
pub struct Mention {
    pub source: String,
    pub title_raw: String,
    pub description: String,
    pub url: String,
}

/// One row of the by-date listing.
#[derive(Debug, Clone)]
pub struct DayEntry {
    pub occurrence_id: i64,
    pub title: String,
    pub lang: Lang,
    /// True if any mention of this occurrence carries a non-empty
    /// description (after trimming).
    pub has_description: bool,
}

/// Full view of one occurrence: the holiday identity plus every mention,
/// ordered by source priority.
#[derive(Debug, Clone)]
pub struct OccurrenceDetail {
    pub occurrence_id: i64,
    pub date: NaiveDate,
    pub title: String,
    pub lang: Lang,
    pub mentions: Vec<Mention>,
}

/// A canonical title matched by substring search.
#[derive(Debug, Clone)]
pub struct HolidayHit {
    pub holiday_id: i64,
    pub title: String,
    pub lang: Lang,
}
