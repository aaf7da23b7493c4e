//! Database statistics and health overview.
//!
//! Provides a quick summary of what's loaded: holiday and occurrence counts,
//! description coverage, and per-source breakdowns. Used by `hdx stats` to
//! give confidence that ingestion and enrichment are working as expected.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Per-source breakdown of mention counts and description coverage.
struct SourceStats {
    source: String,
    mention_count: i64,
    described_count: i64,
    last_ingest_ts: Option<i64>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_holidays: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM holidays")
        .fetch_one(&pool)
        .await?;

    let total_occurrences: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM occurrences")
        .fetch_one(&pool)
        .await?;

    let total_mentions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mentions")
        .fetch_one(&pool)
        .await?;

    let described_mentions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM mentions WHERE trim(description) != ''")
            .fetch_one(&pool)
            .await?;

    let dict_entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM descriptions_dict")
        .fetch_one(&pool)
        .await?;

    let span_row = sqlx::query("SELECT MIN(date) AS first, MAX(date) AS last FROM occurrences")
        .fetch_one(&pool)
        .await?;
    let first_date: Option<String> = span_row.get("first");
    let last_date: Option<String> = span_row.get("last");

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Holidex — Database Stats");
    println!("========================");
    println!();
    println!("  Database:     {}", config.db.path.display());
    println!("  Size:         {}", format_bytes(db_size));
    println!();
    println!("  Holidays:     {}", total_holidays);
    println!("  Occurrences:  {}", total_occurrences);
    println!("  Mentions:     {}", total_mentions);
    println!(
        "  Described:    {} / {} ({}%)",
        described_mentions,
        total_mentions,
        if total_mentions > 0 {
            (described_mentions * 100) / total_mentions
        } else {
            0
        }
    );
    println!("  Dictionary:   {} entries", dict_entries);
    if let (Some(first), Some(last)) = (first_date, last_date) {
        println!("  Date span:    {} .. {}", first, last);
    }

    // Per-source breakdown
    let source_rows = sqlx::query(
        r#"
        SELECT
            s.name AS source,
            COUNT(m.id) AS mention_count,
            coalesce(SUM(CASE WHEN trim(m.description) != '' THEN 1 ELSE 0 END), 0) AS described_count,
            MAX(m.ingested_at) AS last_ingest
        FROM sources s
        LEFT JOIN mentions m ON m.source_id = s.id
        GROUP BY s.name
        ORDER BY mention_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let source_stats: Vec<SourceStats> = source_rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            mention_count: row.get("mention_count"),
            described_count: row.get("described_count"),
            last_ingest_ts: row.get("last_ingest"),
        })
        .collect();

    if !source_stats.is_empty() {
        println!();
        println!("  By source:");
        println!(
            "  {:<24} {:>8} {:>9} {:>8}   {}",
            "SOURCE", "MENTIONS", "DESCRIBED", "COVERAGE", "LAST INGEST"
        );
        println!("  {}", "-".repeat(76));

        for s in &source_stats {
            let coverage = if s.mention_count > 0 {
                format!("{}%", (s.described_count * 100) / s.mention_count)
            } else {
                "-".to_string()
            };
            let ingest_display = match s.last_ingest_ts {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<24} {:>8} {:>9} {:>8}   {}",
                s.source, s.mention_count, s.described_count, coverage, ingest_display
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
