use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index. All statements are idempotent, so `init`
/// can run against an existing database.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Create sources table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create holidays table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS holidays (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            canonical_title TEXT NOT NULL,
            canonical_title_norm TEXT NOT NULL,
            lang TEXT NOT NULL,
            UNIQUE(canonical_title_norm, lang)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create occurrences table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS occurrences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            holiday_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            UNIQUE(holiday_id, date),
            FOREIGN KEY (holiday_id) REFERENCES holidays(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create mentions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mentions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            occurrence_id INTEGER NOT NULL,
            source_id INTEGER NOT NULL,
            title_raw TEXT NOT NULL,
            title_norm TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL,
            ingested_at INTEGER NOT NULL,
            FOREIGN KEY (occurrence_id) REFERENCES occurrences(id),
            FOREIGN KEY (source_id) REFERENCES sources(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create descriptions dictionary (title-keyed, replace on write)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS descriptions_dict (
            title_norm TEXT PRIMARY KEY,
            title_raw TEXT NOT NULL,
            description TEXT NOT NULL,
            url TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_occurrences_date ON occurrences(date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mentions_occurrence ON mentions(occurrence_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mentions_source ON mentions(source_id)")
        .execute(pool)
        .await?;

    Ok(())
}
