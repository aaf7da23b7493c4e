//! Canonical identity resolution.
//!
//! Maps each surviving record to a Holiday row (keyed by language plus
//! normalized title) and an Occurrence row (holiday plus date), creating
//! rows on first sight. The caches live on the resolver instance and are
//! scoped to one ingestion run; resolution must be called sequentially so
//! that first-seen-wins canonical titles stay deterministic.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqliteConnection;
use std::collections::HashMap;

use crate::normalize::Lang;
use crate::records::CleanRecord;

/// Outcome of resolving one record.
pub struct Resolved {
    pub occurrence_id: i64,
    pub holiday_created: bool,
    pub occurrence_created: bool,
}

pub struct IdentityResolver {
    sources: HashMap<String, i64>,
    holidays: HashMap<(Lang, String), i64>,
    occurrences: HashMap<(i64, NaiveDate), i64>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            holidays: HashMap::new(),
            occurrences: HashMap::new(),
        }
    }

    /// Id of a provenance source, created on first reference.
    pub async fn source_id(&mut self, conn: &mut SqliteConnection, name: &str) -> Result<i64> {
        if let Some(&id) = self.sources.get(name) {
            return Ok(id);
        }

        sqlx::query("INSERT OR IGNORE INTO sources (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        let id: i64 = sqlx::query_scalar("SELECT id FROM sources WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

        self.sources.insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolve a record to its occurrence, creating holiday and occurrence
    /// rows as needed.
    pub async fn resolve(
        &mut self,
        conn: &mut SqliteConnection,
        record: &CleanRecord,
    ) -> Result<Resolved> {
        let (holiday_id, holiday_created) = self.holiday_id(conn, record).await?;
        let (occurrence_id, occurrence_created) =
            self.occurrence_id(conn, holiday_id, record.date).await?;

        Ok(Resolved {
            occurrence_id,
            holiday_created,
            occurrence_created,
        })
    }

    async fn holiday_id(
        &mut self,
        conn: &mut SqliteConnection,
        record: &CleanRecord,
    ) -> Result<(i64, bool)> {
        let key = (record.lang, record.title_norm.clone());
        if let Some(&id) = self.holidays.get(&key) {
            return Ok((id, false));
        }

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM holidays WHERE canonical_title_norm = ? AND lang = ?",
        )
        .bind(&record.title_norm)
        .bind(record.lang.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        let (id, created) = match existing {
            Some(id) => (id, false),
            None => {
                // First sighting: this record's raw title becomes canonical.
                let id = sqlx::query(
                    "INSERT INTO holidays (canonical_title, canonical_title_norm, lang) VALUES (?, ?, ?)",
                )
                .bind(&record.title_raw)
                .bind(&record.title_norm)
                .bind(record.lang.as_str())
                .execute(&mut *conn)
                .await?
                .last_insert_rowid();
                (id, true)
            }
        };

        self.holidays.insert(key, id);
        Ok((id, created))
    }

    async fn occurrence_id(
        &mut self,
        conn: &mut SqliteConnection,
        holiday_id: i64,
        date: NaiveDate,
    ) -> Result<(i64, bool)> {
        let key = (holiday_id, date);
        if let Some(&id) = self.occurrences.get(&key) {
            return Ok((id, false));
        }

        let date_str = date.format("%Y-%m-%d").to_string();
        let result = sqlx::query("INSERT OR IGNORE INTO occurrences (holiday_id, date) VALUES (?, ?)")
            .bind(holiday_id)
            .bind(&date_str)
            .execute(&mut *conn)
            .await?;

        let created = result.rows_affected() > 0;
        let id: i64 = if created {
            result.last_insert_rowid()
        } else {
            sqlx::query_scalar("SELECT id FROM occurrences WHERE holiday_id = ? AND date = ?")
                .bind(holiday_id)
                .bind(&date_str)
                .fetch_one(&mut *conn)
                .await?
        };

        self.occurrences.insert(key, id);
        Ok((id, created))
    }
}
