//! ManifestStore implementation for SQLite
//!
//! Every write is its own committed transaction. Fingerprint uniqueness is
//! enforced by the `fingerprints` primary key, so two workers racing on the
//! same content see exactly one successful insert.

use crate::config::SqliteConfig;
use crate::connection::{DbStats, SqlitePool};
use crate::error::{SqliteError, SqliteResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use ug40_core::fingerprint::Fingerprint;
use ug40_core::manifest::{
    FileRecord, FingerprintRecord, LabelCount, ManifestError, ManifestResult, ManifestStats,
    ManifestStore,
};
use ug40_core::signature::ContentSignature;

/// SQLite implementation of [`ManifestStore`]
#[derive(Clone)]
pub struct SqliteManifestStore {
    pool: SqlitePool,
}

impl SqliteManifestStore {
    /// Create a store over an existing connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) the manifest database described by `config`
    pub fn open(config: SqliteConfig) -> SqliteResult<Self> {
        Ok(Self::new(SqlitePool::new(config)?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Page-level size information for the database file
    pub async fn db_stats(&self) -> ManifestResult<DbStats> {
        self.run(|pool| pool.stats()).await
    }

    /// Run a blocking database operation off the async runtime
    async fn run<F, T>(&self, f: F) -> ManifestResult<T>
    where
        F: FnOnce(&SqlitePool) -> SqliteResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || f(&pool))
            .await
            .map_err(|e| ManifestError::from(SqliteError::Task(e.to_string())))?
            .map_err(Into::into)
    }
}

#[async_trait]
impl ManifestStore for SqliteManifestStore {
    async fn has_unchanged_file(
        &self,
        file_id: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<bool> {
        let file_id = file_id.to_string();
        let signature = content_signature.as_str().to_string();

        self.run(move |pool| {
            pool.with_connection(|conn| {
                let stored: Option<String> = conn
                    .query_row(
                        "SELECT content_signature FROM files WHERE file_id = ?1",
                        [&file_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(stored.as_deref() == Some(signature.as_str()))
            })
        })
        .await
    }

    async fn upsert_file(
        &self,
        file_id: &str,
        language: &str,
        category: &str,
        content_signature: &ContentSignature,
    ) -> ManifestResult<()> {
        let file_id = file_id.to_string();
        let language = language.to_string();
        let category = category.to_string();
        let signature = content_signature.as_str().to_string();

        self.run(move |pool| {
            pool.with_connection(|conn| {
                conn.execute(
                    r#"
                    INSERT INTO files (file_id, language, category, content_signature, last_processed_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(file_id) DO UPDATE SET
                        language = excluded.language,
                        category = excluded.category,
                        content_signature = excluded.content_signature,
                        last_processed_at = excluded.last_processed_at
                    "#,
                    params![
                        file_id,
                        language,
                        category,
                        signature,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
                debug!(%file_id, "Upserted file record");
                Ok(())
            })
        })
        .await
    }

    async fn is_duplicate_fingerprint(&self, fingerprint: Fingerprint) -> ManifestResult<bool> {
        let key = fingerprint.to_hex();

        self.run(move |pool| {
            pool.with_connection(|conn| {
                let found = conn
                    .query_row(
                        "SELECT 1 FROM fingerprints WHERE fingerprint = ?1",
                        [&key],
                        |_| Ok(()),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
        })
        .await
    }

    async fn record_fingerprints(&self, records: &[FingerprintRecord]) -> ManifestResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let records = records.to_vec();

        let outcome = self
            .run(move |pool| {
                pool.with_connection_mut(|conn| {
                    let tx = conn.transaction()?;
                    {
                        let mut stmt = tx.prepare(
                            "INSERT INTO fingerprints (fingerprint, language, category) VALUES (?1, ?2, ?3)",
                        )?;
                        for record in &records {
                            let inserted = stmt
                                .execute(params![
                                    record.fingerprint.to_hex(),
                                    record.language,
                                    record.category,
                                ])
                                .map_err(SqliteError::from);
                            match inserted {
                                Ok(_) => {}
                                // Dropping the transaction rolls back the whole batch
                                Err(e) if e.is_constraint_violation() => {
                                    return Ok(Err(record.fingerprint))
                                }
                                Err(e) => return Err(e),
                            }
                        }
                    }
                    tx.commit()?;
                    Ok(Ok(()))
                })
            })
            .await?;

        outcome.map_err(ManifestError::DuplicateFingerprint)
    }

    async fn get_file(&self, file_id: &str) -> ManifestResult<Option<FileRecord>> {
        let file_id = file_id.to_string();

        self.run(move |pool| {
            pool.with_connection(|conn| {
                let record = conn
                    .query_row(
                        r#"
                        SELECT file_id, language, category, content_signature, last_processed_at
                        FROM files
                        WHERE file_id = ?1
                        "#,
                        [&file_id],
                        RawFileRow::from_row,
                    )
                    .optional()?;
                record.map(RawFileRow::into_record).transpose()
            })
        })
        .await
    }

    async fn stats(&self) -> ManifestResult<ManifestStats> {
        self.run(|pool| {
            pool.with_connection(|conn| {
                let files: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
                let fingerprints: i64 =
                    conn.query_row("SELECT COUNT(*) FROM fingerprints", [], |row| row.get(0))?;

                let mut stmt = conn.prepare(
                    r#"
                    SELECT language, category, COUNT(*)
                    FROM fingerprints
                    GROUP BY language, category
                    ORDER BY language, category
                    "#,
                )?;
                let by_label = stmt
                    .query_map([], |row| {
                        Ok(LabelCount {
                            language: row.get(0)?,
                            category: row.get(1)?,
                            fingerprints: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(ManifestStats {
                    files: files as u64,
                    fingerprints: fingerprints as u64,
                    by_label,
                })
            })
        })
        .await
    }
}

/// File row as stored, before timestamp decoding
struct RawFileRow {
    file_id: String,
    language: String,
    category: String,
    content_signature: String,
    last_processed_at: String,
}

impl RawFileRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            file_id: row.get(0)?,
            language: row.get(1)?,
            category: row.get(2)?,
            content_signature: row.get(3)?,
            last_processed_at: row.get(4)?,
        })
    }

    fn into_record(self) -> SqliteResult<FileRecord> {
        let last_processed_at = DateTime::parse_from_rfc3339(&self.last_processed_at)
            .map_err(|e| {
                SqliteError::Corrupted(format!(
                    "file '{}' has invalid timestamp '{}': {}",
                    self.file_id, self.last_processed_at, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(FileRecord {
            file_id: self.file_id,
            language: self.language,
            category: self.category,
            content_signature: ContentSignature::new(self.content_signature),
            last_processed_at,
        })
    }
}
