//! Description backfill for link-only mentions.
//!
//! Some sources hand over nothing but a title and a link; this pass fills in
//! the missing prose. Pending mentions are resolved against the description
//! dictionary first (no network), the rest go through a bounded fetch pool.
//! Every fetch-extract-clean unit is independent and owns one result slot,
//! so workers never contend; writeback to the database is sequential after
//! the pool drains. One bad page is one empty description, never a failed
//! run.

use anyhow::{bail, Result};
use futures::stream::{self, StreamExt};
use sqlx::{Row, SqlitePool};
use std::time::Duration;

use crate::config::Config;
use crate::db;
use crate::extract;
use crate::fetch::{HttpFetcher, PageFetcher};

/// A mention waiting for a description: empty description, usable URL,
/// source flagged for enrichment.
struct PendingMention {
    mention_id: i64,
    url: String,
    title_raw: String,
    title_norm: String,
}

/// What one unit of work produced. Failure is data here, not an error —
/// the mention just stays undescribed.
enum Outcome {
    Described(String),
    NoProse,
    FetchFailed,
}

#[derive(Debug, Default)]
struct EnrichSummary {
    pending: u64,
    dict_hits: u64,
    fetched: u64,
    described: u64,
    no_prose: u64,
    fetch_failed: u64,
}

pub async fn run_enrich(config: &Config, limit: Option<usize>, dry_run: bool) -> Result<()> {
    let sources = config.enrich_sources();
    if sources.is_empty() {
        bail!("No sources are marked for enrichment. Set enrich = true on a [[sources]] entry.");
    }

    let pool = db::connect(config).await?;

    if dry_run {
        let pending = scan_pending(&pool, &sources, limit).await?;
        let mut from_dict = 0usize;
        for mention in &pending {
            if dictionary_description(&pool, &mention.title_norm)
                .await?
                .is_some()
            {
                from_dict += 1;
            }
        }
        println!("enrich (dry-run)");
        println!("  pending mentions: {}", pending.len());
        println!("  resolvable from dictionary: {}", from_dict);
        println!("  would fetch: {}", pending.len() - from_dict);
        pool.close().await;
        return Ok(());
    }

    let fetcher = HttpFetcher::new(&config.enrich)?;
    let summary = enrich_pending(&pool, config, &fetcher, limit).await?;

    println!("enrich");
    println!("  pending mentions: {}", summary.pending);
    println!("  dictionary hits: {}", summary.dict_hits);
    println!("  pages fetched: {}", summary.fetched);
    println!("  described: {}", summary.described);
    println!("  no usable prose: {}", summary.no_prose);
    println!("  fetch failures: {}", summary.fetch_failed);
    println!("ok");

    pool.close().await;
    Ok(())
}

async fn enrich_pending(
    pool: &SqlitePool,
    config: &Config,
    fetcher: &dyn PageFetcher,
    limit: Option<usize>,
) -> Result<EnrichSummary> {
    let sources = config.enrich_sources();
    let pending = scan_pending(pool, &sources, limit).await?;

    let mut summary = EnrichSummary {
        pending: pending.len() as u64,
        ..Default::default()
    };

    // Dictionary pass: titles described on an earlier run (or seeded during
    // ingestion) are backfilled without touching the network.
    let mut jobs: Vec<PendingMention> = Vec::new();
    for mention in pending {
        match dictionary_description(pool, &mention.title_norm).await? {
            Some(desc) => {
                update_mention_description(pool, mention.mention_id, &desc).await?;
                summary.dict_hits += 1;
            }
            None => jobs.push(mention),
        }
    }

    if jobs.is_empty() {
        return Ok(summary);
    }

    // Bounded fetch pool. Each worker writes exactly one slot, identified by
    // the job index, so completion order is free to vary.
    let delay = Duration::from_millis(config.enrich.delay_ms);
    let outcomes: Vec<(usize, Outcome)> = stream::iter(jobs.iter().enumerate())
        .map(|(idx, job)| async move { (idx, fetch_one(fetcher, job, delay).await) })
        .buffer_unordered(config.enrich.workers)
        .collect()
        .await;

    let mut slots: Vec<Option<Outcome>> = Vec::with_capacity(jobs.len());
    slots.resize_with(jobs.len(), || None);
    for (idx, outcome) in outcomes {
        slots[idx] = Some(outcome);
    }

    summary.fetched = jobs.len() as u64;
    for (job, slot) in jobs.iter().zip(slots) {
        match slot {
            Some(Outcome::Described(desc)) => {
                update_mention_description(pool, job.mention_id, &desc).await?;
                upsert_dictionary(pool, job, &desc).await?;
                summary.described += 1;
            }
            Some(Outcome::NoProse) => summary.no_prose += 1,
            Some(Outcome::FetchFailed) | None => summary.fetch_failed += 1,
        }
    }

    Ok(summary)
}

async fn fetch_one(fetcher: &dyn PageFetcher, job: &PendingMention, delay: Duration) -> Outcome {
    let result = fetcher.fetch(&job.url).await;

    // Politeness: bound the per-worker request rate regardless of outcome.
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    match result {
        Ok(html) => {
            let desc = extract::extract_description(&html, &job.title_raw);
            if desc.is_empty() {
                Outcome::NoProse
            } else {
                Outcome::Described(desc)
            }
        }
        Err(e) => {
            tracing::warn!(url = %job.url, error = %e, "fetch failed");
            Outcome::FetchFailed
        }
    }
}

async fn scan_pending(
    pool: &SqlitePool,
    sources: &[String],
    limit: Option<usize>,
) -> Result<Vec<PendingMention>> {
    let placeholders = vec!["?"; sources.len()].join(", ");
    let sql = format!(
        r#"
        SELECT m.id, m.url, m.title_raw, m.title_norm
        FROM mentions m
        JOIN sources s ON s.id = m.source_id
        WHERE trim(m.description) = ''
          AND m.url != ''
          AND s.name IN ({})
        ORDER BY m.id
        LIMIT ?
        "#,
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for name in sources {
        query = query.bind(name);
    }
    // SQLite reads a negative LIMIT as "no limit".
    query = query.bind(limit.map(|l| l as i64).unwrap_or(-1));

    let rows = query.fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| PendingMention {
            mention_id: row.get("id"),
            url: row.get("url"),
            title_raw: row.get("title_raw"),
            title_norm: row.get("title_norm"),
        })
        .collect())
}

async fn dictionary_description(pool: &SqlitePool, title_norm: &str) -> Result<Option<String>> {
    let desc: Option<String> =
        sqlx::query_scalar("SELECT description FROM descriptions_dict WHERE title_norm = ?")
            .bind(title_norm)
            .fetch_optional(pool)
            .await?;
    Ok(desc
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty()))
}

async fn update_mention_description(pool: &SqlitePool, mention_id: i64, desc: &str) -> Result<()> {
    sqlx::query("UPDATE mentions SET description = ? WHERE id = ?")
        .bind(desc)
        .bind(mention_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn upsert_dictionary(pool: &SqlitePool, job: &PendingMention, desc: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO descriptions_dict (title_norm, title_raw, description, url)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&job.title_norm)
    .bind(&job.title_raw)
    .bind(desc)
    .bind(&job.url)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, EnrichConfig, SourceConfig};
    use crate::migrate;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        pages: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(url) {
                Some(body) => Ok(body.clone()),
                None => bail!("connection refused: {}", url),
            }
        }
    }

    fn test_config(enrich_names: &[&str]) -> Config {
        Config {
            db: DbConfig {
                path: "unused.sqlite".into(),
            },
            sources: enrich_names
                .iter()
                .enumerate()
                .map(|(i, name)| SourceConfig {
                    name: name.to_string(),
                    file: format!("{}.jsonl", name).into(),
                    priority: i as u32 + 1,
                    enrich: true,
                })
                .collect(),
            enrich: EnrichConfig {
                workers: 4,
                delay_ms: 0,
                timeout_secs: 5,
                user_agent: "test".to_string(),
            },
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = db::connect_memory().await.unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        pool
    }

    /// Two sources, three link-only mentions on the first one.
    async fn seed(pool: &SqlitePool) {
        sqlx::query("INSERT INTO sources (id, name) VALUES (1, 'calend.ru'), (2, 'wikipedia.org')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO holidays (id, canonical_title, canonical_title_norm, lang) VALUES
             (1, 'Новый год', 'новый год', 'ru'),
             (2, 'День смеха', 'день смеха', 'ru'),
             (3, 'День радио', 'день радио', 'ru')",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO occurrences (id, holiday_id, date) VALUES
             (1, 1, '2025-01-01'), (2, 2, '2025-04-01'), (3, 3, '2025-05-07')",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO mentions (id, occurrence_id, source_id, title_raw, title_norm, description, url, ingested_at) VALUES
             (1, 1, 1, 'Новый год', 'новый год', '', 'https://calend.example/ny', 1),
             (2, 2, 1, 'День смеха', 'день смеха', '', 'https://calend.example/fools', 1),
             (3, 3, 1, 'День радио', 'день радио', '', 'https://calend.example/radio', 1),
             (4, 1, 2, 'New Year', 'new year', '', 'https://wiki.example/ny', 1)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn mention_description(pool: &SqlitePool, id: i64) -> String {
        sqlx::query_scalar("SELECT description FROM mentions WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn page_with(text: &str) -> String {
        format!("<html><body><nav>меню</nav><p>{}</p></body></html>", text)
    }

    // Comfortably over both the paragraph gate and the final length gate.
    const PROSE: &str = "Праздник отмечается ежегодно во многих странах мира и \
                         сопровождается народными гуляниями, подарками и застольем.";

    #[tokio::test]
    async fn test_only_flagged_sources_are_scanned() {
        let pool = test_pool().await;
        seed(&pool).await;

        // wikipedia.org is configured but not flagged for enrichment.
        let pending = scan_pending(&pool, &["calend.ru".to_string()], None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 3);
        assert!(pending.iter().all(|p| p.url.starts_with("https://calend.")));
    }

    #[tokio::test]
    async fn test_described_mentions_are_not_pending() {
        let pool = test_pool().await;
        seed(&pool).await;
        update_mention_description(&pool, 1, "уже описан").await.unwrap();

        let pending = scan_pending(&pool, &["calend.ru".to_string()], None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn test_limit_bounds_the_scan() {
        let pool = test_pool().await;
        seed(&pool).await;

        let pending = scan_pending(&pool, &["calend.ru".to_string()], Some(1))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].mention_id, 1);
    }

    #[tokio::test]
    async fn test_dictionary_hit_skips_the_network() {
        let pool = test_pool().await;
        seed(&pool).await;
        sqlx::query(
            "INSERT INTO descriptions_dict (title_norm, title_raw, description, url)
             VALUES ('новый год', 'Новый год', ?, 'https://my.example/ny')",
        )
        .bind(PROSE)
        .execute(&pool)
        .await
        .unwrap();

        let cfg = test_config(&["calend.ru"]);
        let fetcher = StubFetcher::new(&[]);
        let summary = enrich_pending(&pool, &cfg, &fetcher, Some(1)).await.unwrap();

        assert_eq!(summary.dict_hits, 1);
        assert_eq!(summary.fetched, 0);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(mention_description(&pool, 1).await, PROSE);
    }

    #[tokio::test]
    async fn test_fetch_success_updates_mention_and_dictionary() {
        let pool = test_pool().await;
        seed(&pool).await;

        let cfg = test_config(&["calend.ru"]);
        let fetcher = StubFetcher::new(&[("https://calend.example/ny", &page_with(PROSE))]);
        let summary = enrich_pending(&pool, &cfg, &fetcher, Some(1)).await.unwrap();

        assert_eq!(summary.described, 1);
        assert_eq!(summary.fetched, 1);
        assert_eq!(mention_description(&pool, 1).await, PROSE);

        // The extraction also lands in the dictionary for future runs.
        let dict: String =
            sqlx::query_scalar("SELECT description FROM descriptions_dict WHERE title_norm = ?")
                .bind("новый год")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(dict, PROSE);
    }

    #[tokio::test]
    async fn test_failures_degrade_per_mention_not_per_batch() {
        let pool = test_pool().await;
        seed(&pool).await;

        // Mention 1 has no page (network failure), mention 2 yields a real
        // paragraph, mention 3 yields only a caption-length fragment.
        let cfg = test_config(&["calend.ru"]);
        let fetcher = StubFetcher::new(&[
            ("https://calend.example/fools", &page_with(PROSE)),
            ("https://calend.example/radio", &page_with("Коротко.")),
        ]);
        let summary = enrich_pending(&pool, &cfg, &fetcher, None).await.unwrap();

        assert_eq!(summary.pending, 3);
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.described, 1);
        assert_eq!(summary.no_prose, 1);
        assert_eq!(summary.fetch_failed, 1);

        // Results land on the right mentions even with unordered completion.
        assert_eq!(mention_description(&pool, 1).await, "");
        assert_eq!(mention_description(&pool, 2).await, PROSE);
        assert_eq!(mention_description(&pool, 3).await, "");
    }

    #[tokio::test]
    async fn test_second_mention_of_same_title_reuses_first_extraction() {
        let pool = test_pool().await;
        seed(&pool).await;
        // A second link-only mention of the same holiday title.
        sqlx::query(
            "INSERT INTO mentions (id, occurrence_id, source_id, title_raw, title_norm, description, url, ingested_at)
             VALUES (5, 1, 1, 'Новый Год', 'новый год', '', 'https://calend.example/ny-alt', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let cfg = test_config(&["calend.ru"]);
        let fetcher = StubFetcher::new(&[("https://calend.example/ny", &page_with(PROSE))]);
        let first = enrich_pending(&pool, &cfg, &fetcher, Some(1)).await.unwrap();
        assert_eq!(first.described, 1);

        // The next run finds the dictionary entry written by the first and
        // never fetches the alternate URL.
        let fetcher = StubFetcher::new(&[]);
        let second = enrich_pending(&pool, &cfg, &fetcher, Some(1)).await.unwrap();
        assert_eq!(second.dict_hits, 1);
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(mention_description(&pool, 5).await, PROSE);
    }
}
