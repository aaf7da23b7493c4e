//! Read side: day listings, occurrence detail, title search.
//!
//! Display rules live here rather than in SQL views. Russian entries sort
//! before English ones, described entries before bare ones, and the "best"
//! description for an occurrence is the first non-empty one in source
//! priority order (smallest configured `priority` wins). Occurrences no
//! source currently mentions are invisible to lookups.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::extract;
use crate::models::{DayEntry, HolidayHit, Mention, OccurrenceDetail};
use crate::normalize::Lang;

/// Hard cap on one day's listing. Real calendars top out in the low
/// hundreds; anything past this is ingestion gone wrong.
const DAY_LIMIT: i64 = 700;
/// Default cap on search hits.
pub const SEARCH_LIMIT: usize = 200;
/// Preview length for descriptions in CLI output.
const PREVIEW_CHARS: usize = 260;

/// Pick the mention whose description should represent an occurrence:
/// the first non-empty description walking sources from highest display
/// priority down. Mentions from unconfigured sources rank after every
/// configured one. Ties keep the caller's order.
pub fn best_description<'a>(mentions: &'a [Mention], priority: &[String]) -> Option<&'a Mention> {
    mentions
        .iter()
        .filter(|m| !m.description.trim().is_empty())
        .min_by_key(|m| source_rank(&m.source, priority))
}

fn source_rank(source: &str, priority: &[String]) -> usize {
    priority
        .iter()
        .position(|name| name == source)
        .unwrap_or(priority.len())
}

/// All occurrences on a date that at least one source mentions, Russian
/// first, described entries before undescribed ones, then by title.
pub async fn occurrences_on(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<DayEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT o.id AS occurrence_id,
               h.canonical_title AS title,
               h.lang AS lang,
               MAX(CASE WHEN trim(coalesce(m.description, '')) != '' THEN 1 ELSE 0 END) AS has_desc
        FROM occurrences o
        JOIN holidays h ON h.id = o.holiday_id
        JOIN mentions m ON m.occurrence_id = o.id
        WHERE o.date = ?
        GROUP BY o.id
        ORDER BY CASE WHEN h.lang = 'ru' THEN 0 ELSE 1 END,
                 has_desc DESC,
                 h.canonical_title
        LIMIT ?
        "#,
    )
    .bind(date.format("%Y-%m-%d").to_string())
    .bind(DAY_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DayEntry {
            occurrence_id: row.get("occurrence_id"),
            title: row.get("title"),
            lang: Lang::from_tag(row.get::<String, _>("lang").as_str()),
            has_description: row.get::<i64, _>("has_desc") != 0,
        })
        .collect())
}

/// One occurrence with every mention of it, mentions sorted by source
/// priority. `None` when the id does not exist.
pub async fn occurrence_detail(
    pool: &SqlitePool,
    occurrence_id: i64,
    priority: &[String],
) -> Result<Option<OccurrenceDetail>> {
    let head = sqlx::query(
        r#"
        SELECT o.date AS date, h.canonical_title AS title, h.lang AS lang
        FROM occurrences o
        JOIN holidays h ON h.id = o.holiday_id
        WHERE o.id = ?
        "#,
    )
    .bind(occurrence_id)
    .fetch_optional(pool)
    .await?;

    let head = match head {
        Some(row) => row,
        None => return Ok(None),
    };

    let date_str: String = head.get("date");
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")?;

    let rows = sqlx::query(
        r#"
        SELECT s.name AS source, m.title_raw AS title_raw,
               m.description AS description, m.url AS url
        FROM mentions m
        JOIN sources s ON s.id = m.source_id
        WHERE m.occurrence_id = ?
        ORDER BY m.id
        "#,
    )
    .bind(occurrence_id)
    .fetch_all(pool)
    .await?;

    let mut mentions: Vec<Mention> = rows
        .iter()
        .map(|row| Mention {
            source: row.get("source"),
            title_raw: row.get("title_raw"),
            description: row.get("description"),
            url: row.get("url"),
        })
        .collect();
    // Stable sort: mentions from the same source keep insertion order.
    mentions.sort_by_key(|m| source_rank(&m.source, priority));

    Ok(Some(OccurrenceDetail {
        occurrence_id,
        date,
        title: head.get("title"),
        lang: Lang::from_tag(head.get::<String, _>("lang").as_str()),
        mentions,
    }))
}

/// Case-blind (ASCII) substring search over canonical titles, Russian
/// entries first.
pub async fn search_titles(pool: &SqlitePool, query: &str, limit: usize) -> Result<Vec<HolidayHit>> {
    let pattern = format!("%{}%", query.trim());
    let rows = sqlx::query(
        r#"
        SELECT id, canonical_title AS title, lang
        FROM holidays
        WHERE canonical_title LIKE ?
        ORDER BY CASE WHEN lang = 'ru' THEN 0 ELSE 1 END,
                 canonical_title
        LIMIT ?
        "#,
    )
    .bind(pattern)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| HolidayHit {
            holiday_id: row.get("id"),
            title: row.get("title"),
            lang: Lang::from_tag(row.get::<String, _>("lang").as_str()),
        })
        .collect())
}

pub async fn run_date(config: &Config, date: &str) -> Result<()> {
    let date = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => bail!("Invalid date '{}'. Expected YYYY-MM-DD.", date),
    };

    let pool = db::connect(config).await?;
    let entries = occurrences_on(&pool, date).await?;

    if entries.is_empty() {
        println!("No holidays recorded on {}.", date);
        pool.close().await;
        return Ok(());
    }

    println!("Holidays on {} ({}):", date, entries.len());
    println!();
    for (i, entry) in entries.iter().enumerate() {
        let badge = if entry.has_description {
            " [described]"
        } else {
            ""
        };
        println!("{:>3}. [{}] {}{}", i + 1, entry.lang, entry.title, badge);
        println!("     occurrence: {}", entry.occurrence_id);
    }

    pool.close().await;
    Ok(())
}

pub async fn run_show(config: &Config, occurrence_id: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let priority = config.priority_order();
    let detail = occurrence_detail(&pool, occurrence_id, &priority).await?;
    pool.close().await;

    let detail = match detail {
        Some(d) => d,
        None => bail!("occurrence {} not found", occurrence_id),
    };

    println!("--- Occurrence ---");
    println!("ID:     {}", detail.occurrence_id);
    println!("Date:   {}", detail.date);
    println!("Title:  {}", detail.title);
    println!("Lang:   {}", detail.lang);

    if let Some(best) = best_description(&detail.mentions, &priority) {
        println!();
        println!("--- Description ({}) ---", best.source);
        println!("{}", extract::short(best.description.trim(), PREVIEW_CHARS));
    }

    println!();
    println!("--- Mentions ({}) ---", detail.mentions.len());
    for mention in &detail.mentions {
        let badge = if mention.description.trim().is_empty() {
            ""
        } else {
            " [described]"
        };
        println!("{}: {}{}", mention.source, mention.title_raw, badge);
        if !mention.url.is_empty() {
            println!("  url: {}", mention.url);
        }
    }

    Ok(())
}

pub async fn run_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    // An empty pattern would match every title; treat it as no query.
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let hits = search_titles(&pool, query, limit).await?;
    pool.close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("Results for '{}' ({}):", query, hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{:>3}. [{}] {} (holiday {})",
            i + 1,
            hit.lang,
            hit.title,
            hit.holiday_id
        );
    }

    Ok(())
}
