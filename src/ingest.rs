//! Ingestion pipeline orchestration.
//!
//! Coordinates the full load flow per source file: JSONL decode → prepare
//! (defaulting + noise filter) → identity resolution → mention append →
//! dictionary seeding. Writes are batched into periodic transactions so a
//! large file is not one giant commit; re-running over the same input is
//! idempotent for holidays and occurrences.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use std::io::BufRead;

use crate::config::{Config, SourceConfig};
use crate::db;
use crate::records::{self, RawRecord};
use crate::resolve::IdentityResolver;

/// Records per transaction before an intermediate commit.
const COMMIT_EVERY: usize = 500;
/// Heartbeat interval for long files.
const PROGRESS_EVERY: u64 = 2000;

#[derive(Debug, Default)]
struct SourceSummary {
    records_read: u64,
    malformed: u64,
    filtered: u64,
    missing_url: u64,
    holidays_created: u64,
    occurrences_created: u64,
    mentions_written: u64,
    dict_entries: u64,
}

pub async fn run_ingest(
    config: &Config,
    source: Option<&str>,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    if config.sources.is_empty() {
        bail!("No sources configured. Add [[sources]] entries to the config file.");
    }

    // Config order is processing order; a named source narrows to one file.
    let selected: Vec<&SourceConfig> = match source {
        Some(name) => match config.source(name) {
            Some(s) => vec![s],
            None => {
                let known: Vec<&str> = config.sources.iter().map(|s| s.name.as_str()).collect();
                bail!("Unknown source: '{}'. Configured: {}", name, known.join(", "));
            }
        },
        None => config.sources.iter().collect(),
    };

    if dry_run {
        for src in &selected {
            let summary = scan_source(src, limit)?;
            println!("ingest {} (dry-run)", src.name);
            println!("  records read: {}", summary.records_read);
            println!(
                "  would keep: {}",
                summary.records_read - summary.malformed - summary.filtered
            );
            println!("  malformed: {}", summary.malformed);
            println!("  filtered: {}", summary.filtered);
            println!("  missing url: {}", summary.missing_url);
        }
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let mut resolver = IdentityResolver::new();
    // One timestamp per run; every mention written below carries it.
    let ingested_at = chrono::Utc::now().timestamp();

    let mut totals = SourceSummary::default();
    for src in &selected {
        let summary = ingest_source(&pool, &mut resolver, src, limit, ingested_at).await?;

        println!("ingest {}", src.name);
        println!("  records read: {}", summary.records_read);
        println!("  malformed: {}", summary.malformed);
        println!("  filtered: {}", summary.filtered);
        println!("  missing url: {}", summary.missing_url);
        println!("  holidays created: {}", summary.holidays_created);
        println!("  occurrences created: {}", summary.occurrences_created);
        println!("  mentions written: {}", summary.mentions_written);
        println!("  dictionary entries: {}", summary.dict_entries);

        totals.records_read += summary.records_read;
        totals.holidays_created += summary.holidays_created;
        totals.occurrences_created += summary.occurrences_created;
        totals.mentions_written += summary.mentions_written;
    }

    if selected.len() > 1 {
        println!("totals");
        println!("  records read: {}", totals.records_read);
        println!("  holidays created: {}", totals.holidays_created);
        println!("  occurrences created: {}", totals.occurrences_created);
        println!("  mentions written: {}", totals.mentions_written);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

async fn ingest_source(
    pool: &SqlitePool,
    resolver: &mut IdentityResolver,
    source: &SourceConfig,
    limit: Option<usize>,
    ingested_at: i64,
) -> Result<SourceSummary> {
    let file = std::fs::File::open(&source.file)
        .with_context(|| format!("Failed to open source file: {}", source.file.display()))?;
    let reader = std::io::BufReader::new(file);

    let mut summary = SourceSummary::default();
    let mut tx = pool.begin().await?;
    let source_id = resolver.source_id(&mut tx, &source.name).await?;
    let mut since_commit = 0usize;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(lim) = limit {
            if summary.records_read as usize >= lim {
                break;
            }
        }
        summary.records_read += 1;

        let raw: RawRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                summary.malformed += 1;
                tracing::debug!(source = %source.name, error = %e, "skipping unparseable line");
                continue;
            }
        };

        // The configured name keys the source row; a scraper claiming
        // something else is only worth a debug line.
        if let Some(claimed) = raw.source.as_deref() {
            if claimed != source.name {
                tracing::debug!(
                    configured = %source.name,
                    claimed = %claimed,
                    "record claims a different source"
                );
            }
        }

        let record = match records::prepare(raw) {
            Ok(r) => r,
            Err(reason) => {
                if reason.is_noise() {
                    summary.filtered += 1;
                } else {
                    summary.malformed += 1;
                }
                continue;
            }
        };

        // Identity is resolved even for url-less records; they just leave
        // no mention behind.
        let resolved = resolver.resolve(&mut tx, &record).await?;
        if resolved.holiday_created {
            summary.holidays_created += 1;
        }
        if resolved.occurrence_created {
            summary.occurrences_created += 1;
        }

        if record.url.is_empty() {
            summary.missing_url += 1;
        } else {
            sqlx::query(
                r#"
                INSERT INTO mentions (occurrence_id, source_id, title_raw, title_norm, description, url, ingested_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(resolved.occurrence_id)
            .bind(source_id)
            .bind(&record.title_raw)
            .bind(&record.title_norm)
            .bind(&record.description)
            .bind(&record.url)
            .bind(ingested_at)
            .execute(&mut *tx)
            .await?;
            summary.mentions_written += 1;

            // Records arriving pre-enriched seed the dictionary, so later
            // enrichment runs can skip re-fetching these titles.
            let desc = record.description.trim();
            if !desc.is_empty() {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO descriptions_dict (title_norm, title_raw, description, url)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(&record.title_norm)
                .bind(&record.title_raw)
                .bind(desc)
                .bind(&record.url)
                .execute(&mut *tx)
                .await?;
                summary.dict_entries += 1;
            }
        }

        since_commit += 1;
        if since_commit >= COMMIT_EVERY {
            tx.commit().await?;
            tx = pool.begin().await?;
            since_commit = 0;
        }
        if summary.records_read % PROGRESS_EVERY == 0 {
            tracing::debug!(source = %source.name, records = summary.records_read, "ingest progress");
        }
    }

    tx.commit().await?;
    Ok(summary)
}

/// Dry-run scan: decode and filter without touching the database.
fn scan_source(source: &SourceConfig, limit: Option<usize>) -> Result<SourceSummary> {
    let file = std::fs::File::open(&source.file)
        .with_context(|| format!("Failed to open source file: {}", source.file.display()))?;
    let reader = std::io::BufReader::new(file);

    let mut summary = SourceSummary::default();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(lim) = limit {
            if summary.records_read as usize >= lim {
                break;
            }
        }
        summary.records_read += 1;

        let raw: RawRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(_) => {
                summary.malformed += 1;
                continue;
            }
        };
        match records::prepare(raw) {
            Ok(record) => {
                if record.url.is_empty() {
                    summary.missing_url += 1;
                } else {
                    summary.mentions_written += 1;
                }
            }
            Err(reason) => {
                if reason.is_noise() {
                    summary.filtered += 1;
                } else {
                    summary.malformed += 1;
                }
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use std::io::Write;
    use std::path::Path;

    fn write_jsonl(dir: &Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        path
    }

    fn source_config(name: &str, file: std::path::PathBuf) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            file,
            priority: 1,
            enrich: false,
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = db::connect_memory().await.unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_ingest_source_counts_and_rows() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = write_jsonl(
            tmp.path(),
            "calend.jsonl",
            &[
                r#"{"date":"2025-01-01","title_raw":"Новый год","source":"calend.ru","url":"https://calend.example/1"}"#,
                r#"{"date":"2025-01-01","title_raw":"Новый год!","source":"calend.ru","url":"https://calend.example/1b"}"#,
                r#"{"date":"2025-01-07","title_raw":"Рождество Христово","source":"calend.ru","url":"https://calend.example/2"}"#,
                r#"{"date":"2025-01-07","title_raw":"праздники","source":"calend.ru","url":"https://calend.example/3"}"#,
                r#"{"date":"2025-01-07","title_raw":"Коляда"}"#,
                "not json at all",
            ],
        );
        let src = source_config("calend.ru", file);

        let pool = test_pool().await;
        let mut resolver = IdentityResolver::new();
        let summary = ingest_source(&pool, &mut resolver, &src, None, 1_700_000_000)
            .await
            .unwrap();

        assert_eq!(summary.records_read, 6);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.missing_url, 1);
        assert_eq!(summary.holidays_created, 3);
        assert_eq!(summary.occurrences_created, 3);
        assert_eq!(summary.mentions_written, 3);
        assert_eq!(summary.dict_entries, 0);

        let mentions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mentions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mentions, 3);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent_for_identities() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = write_jsonl(
            tmp.path(),
            "wiki.jsonl",
            &[r#"{"date":"2025-01-01","title_raw":"New Year","url":"https://wiki.example/ny"}"#],
        );
        let src = source_config("wikipedia.org", file);
        let pool = test_pool().await;

        let mut first = IdentityResolver::new();
        ingest_source(&pool, &mut first, &src, None, 1).await.unwrap();
        let mut second = IdentityResolver::new();
        let summary = ingest_source(&pool, &mut second, &src, None, 2).await.unwrap();

        assert_eq!(summary.holidays_created, 0);
        assert_eq!(summary.occurrences_created, 0);
        // Mentions are append-only by design, so the re-run doubles them.
        let mentions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mentions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mentions, 2);
        let holidays: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM holidays")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(holidays, 1);
    }

    #[tokio::test]
    async fn test_described_records_seed_dictionary() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = write_jsonl(
            tmp.path(),
            "my_calend.jsonl",
            &[
                r#"{"date":"2025-06-01","title_raw":"День защиты детей","description":"Международный день, учрежденный в 1949 году и отмечаемый в первый день лета.","url":"https://my.example/deti","holiday_url":"https://my.example/holidays/deti"}"#,
            ],
        );
        let src = source_config("my-calend.ru", file);
        let pool = test_pool().await;
        let mut resolver = IdentityResolver::new();

        let summary = ingest_source(&pool, &mut resolver, &src, None, 1).await.unwrap();
        assert_eq!(summary.dict_entries, 1);

        let (url, desc): (String, String) =
            sqlx::query_as("SELECT url, description FROM descriptions_dict WHERE title_norm = ?")
                .bind("день защиты детей")
                .fetch_one(&pool)
                .await
                .unwrap();
        // holiday_url wins over url.
        assert_eq!(url, "https://my.example/holidays/deti");
        assert!(desc.starts_with("Международный день"));
    }

    #[tokio::test]
    async fn test_limit_truncates_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = write_jsonl(
            tmp.path(),
            "calend.jsonl",
            &[
                r#"{"date":"2025-01-01","title_raw":"Новый год","url":"https://a.example/1"}"#,
                r#"{"date":"2025-01-02","title_raw":"День наступления","url":"https://a.example/2"}"#,
                r#"{"date":"2025-01-03","title_raw":"День третий особый","url":"https://a.example/3"}"#,
            ],
        );
        let src = source_config("calend.ru", file);
        let pool = test_pool().await;
        let mut resolver = IdentityResolver::new();

        let summary = ingest_source(&pool, &mut resolver, &src, Some(2), 1)
            .await
            .unwrap();
        assert_eq!(summary.records_read, 2);
        assert_eq!(summary.mentions_written, 2);
    }

    #[test]
    fn test_scan_source_counts_without_db() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = write_jsonl(
            tmp.path(),
            "wiki.jsonl",
            &[
                r#"{"date":"2025-01-01","title_raw":"New Year","url":"https://wiki.example/ny"}"#,
                r#"{"date":"2025-01-01","title_raw":"3 день","url":"https://wiki.example/x"}"#,
                "{broken",
            ],
        );
        let src = source_config("wikipedia.org", file);
        let summary = scan_source(&src, None).unwrap();
        assert_eq!(summary.records_read, 3);
        assert_eq!(summary.mentions_written, 1);
        assert_eq!(summary.filtered, 1);
        assert_eq!(summary.malformed, 1);
    }
}
