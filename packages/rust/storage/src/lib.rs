//! libSQL storage layer (local file).
//!
//! The [`Storage`] struct wraps a libSQL database holding the latest scraped
//! catalog per (kind, origin), the user's overrides and exclusions, and the
//! history of comparison runs.
//!
//! **Access rules:**
//! - Commands that change state open read-write via [`Storage::open`]
//! - `history` / `show` open read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};

use plugsync_shared::{
    ArtifactKind, ArtifactRecord, ComparisonEntry, ComparisonId, ExclusionSet, Origin,
    OverrideTable, PlugsyncError, Result, normalize_name,
};

// ---------------------------------------------------------------------------
// Stored comparison types
// ---------------------------------------------------------------------------

/// One row of the comparison history.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonHeader {
    pub id: ComparisonId,
    pub kind: ArtifactKind,
    pub threshold: f64,
    pub created_at: DateTime<Utc>,
    /// Number of entries (one per subject).
    pub total: usize,
    /// Entries classified exact, similar or manual.
    pub matched: usize,
}

/// A comparison run with its entries in subject order.
#[derive(Debug, Clone)]
pub struct StoredComparison {
    pub header: ComparisonHeader,
    pub entries: Vec<ComparisonEntry>,
    pub unmatched_candidates: Vec<ArtifactRecord>,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PlugsyncError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` without writing to it.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlugsyncError::Storage(format!(
                "database {} does not exist; run a scrape first",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        PlugsyncError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(PlugsyncError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Artifact snapshots
    // -----------------------------------------------------------------------

    /// Replace the stored snapshot for `(kind, origin)` with `records`.
    pub async fn replace_artifacts(
        &self,
        kind: ArtifactKind,
        origin: Origin,
        records: &[ArtifactRecord],
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        tx.execute(
            "DELETE FROM artifacts WHERE kind = ?1 AND origin = ?2",
            params![kind.as_str(), origin.as_str()],
        )
        .await
        .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        for (position, record) in records.iter().enumerate() {
            tx.execute(
                "INSERT INTO artifacts (kind, origin, position, name, version, source_url, raw_title, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    kind.as_str(),
                    origin.as_str(),
                    position as i64,
                    record.name.as_str(),
                    record.version.as_str(),
                    record.source_url.as_str(),
                    record.raw_title.as_deref(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        debug!(%kind, %origin, count = records.len(), "artifact snapshot replaced");
        Ok(())
    }

    /// The stored snapshot for `(kind, origin)`, in scrape order.
    pub async fn list_artifacts(
        &self,
        kind: ArtifactKind,
        origin: Origin,
    ) -> Result<Vec<ArtifactRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, version, source_url, raw_title FROM artifacts
                 WHERE kind = ?1 AND origin = ?2 ORDER BY position",
                params![kind.as_str(), origin.as_str()],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?
        {
            results.push(ArtifactRecord {
                name: get_string(&row, 0)?,
                version: get_string(&row, 1)?,
                source_url: get_string(&row, 2)?,
                origin,
                raw_title: row.get::<String>(3).ok(),
            });
        }
        Ok(results)
    }

    /// When the snapshot for `(kind, origin)` was taken, if any.
    pub async fn artifacts_scraped_at(
        &self,
        kind: ArtifactKind,
        origin: Origin,
    ) -> Result<Option<DateTime<Utc>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT MAX(scraped_at) FROM artifacts WHERE kind = ?1 AND origin = ?2",
                params![kind.as_str(), origin.as_str()],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        match rows
            .next()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?
        {
            Some(row) => match row.get::<String>(0).ok() {
                Some(raw) => Ok(Some(parse_timestamp(&raw)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Overrides
    // -----------------------------------------------------------------------

    /// Force `subject` to match `target` (replaces any existing override).
    pub async fn upsert_override(
        &self,
        kind: ArtifactKind,
        subject: &str,
        target: &ArtifactRecord,
    ) -> Result<()> {
        self.check_writable()?;
        let subject = normalize_name(subject);
        if subject.is_empty() || target.name.trim().is_empty() {
            return Err(PlugsyncError::malformed(
                "override subject and target names must not be empty",
            ));
        }

        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO overrides (kind, subject_name, match_name, match_version, match_url, match_origin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(kind, subject_name) DO UPDATE SET
                   match_name = excluded.match_name,
                   match_version = excluded.match_version,
                   match_url = excluded.match_url,
                   match_origin = excluded.match_origin,
                   created_at = excluded.created_at",
                params![
                    kind.as_str(),
                    subject.as_str(),
                    target.name.as_str(),
                    target.version.as_str(),
                    target.source_url.as_str(),
                    target.origin.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Remove the override for `subject`. Returns whether one existed.
    pub async fn remove_override(&self, kind: ArtifactKind, subject: &str) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "DELETE FROM overrides WHERE kind = ?1 AND subject_name = ?2",
                params![kind.as_str(), normalize_name(subject)],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// All overrides for `kind` as `(subject, target)`, ordered by subject.
    pub async fn list_overrides(&self, kind: ArtifactKind) -> Result<Vec<(String, ArtifactRecord)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT subject_name, match_name, match_version, match_url, match_origin
                 FROM overrides WHERE kind = ?1 ORDER BY subject_name",
                params![kind.as_str()],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?
        {
            let subject = get_string(&row, 0)?;
            let origin: Origin = get_string(&row, 4)?.parse()?;
            let target = ArtifactRecord::new(
                get_string(&row, 1)?,
                get_string(&row, 2)?,
                get_string(&row, 3)?,
                origin,
            );
            results.push((subject, target));
        }
        Ok(results)
    }

    /// Overrides for `kind` as a lookup table.
    pub async fn load_overrides(&self, kind: ArtifactKind) -> Result<OverrideTable> {
        Ok(self.list_overrides(kind).await?.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // Exclusions
    // -----------------------------------------------------------------------

    /// Exclude `name` from matching. Returns `false` if it was already excluded.
    pub async fn add_exclusion(&self, kind: ArtifactKind, name: &str) -> Result<bool> {
        self.check_writable()?;
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(PlugsyncError::malformed("exclusion name must not be empty"));
        }

        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "INSERT INTO exclusions (kind, name, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(kind, name) DO NOTHING",
                params![kind.as_str(), name.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Remove an exclusion. Returns whether one existed.
    pub async fn remove_exclusion(&self, kind: ArtifactKind, name: &str) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "DELETE FROM exclusions WHERE kind = ?1 AND name = ?2",
                params![kind.as_str(), normalize_name(name)],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    /// Excluded names for `kind`, sorted.
    pub async fn list_exclusions(&self, kind: ArtifactKind) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name FROM exclusions WHERE kind = ?1 ORDER BY name",
                params![kind.as_str()],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?
        {
            results.push(get_string(&row, 0)?);
        }
        Ok(results)
    }

    pub async fn load_exclusions(&self, kind: ArtifactKind) -> Result<ExclusionSet> {
        Ok(self.list_exclusions(kind).await?.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // Comparison history
    // -----------------------------------------------------------------------

    /// Store a comparison run. Returns its generated ID.
    pub async fn insert_comparison(
        &self,
        kind: ArtifactKind,
        threshold: f64,
        entries: &[ComparisonEntry],
        unmatched_candidates: &[ArtifactRecord],
    ) -> Result<ComparisonId> {
        self.check_writable()?;
        let id = ComparisonId::new();
        let now = Utc::now().to_rfc3339();
        let matched = entries
            .iter()
            .filter(|e| e.classification.is_matched())
            .count();
        let unmatched_json = serde_json::to_string(unmatched_candidates)
            .map_err(|e| PlugsyncError::Storage(format!("encode unmatched candidates: {e}")))?;

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        tx.execute(
            "INSERT INTO comparisons (id, kind, threshold, created_at, total, matched, unmatched_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                kind.as_str(),
                threshold,
                now.as_str(),
                entries.len() as i64,
                matched as i64,
                unmatched_json,
            ],
        )
        .await
        .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        for (position, entry) in entries.iter().enumerate() {
            let entry_json = serde_json::to_string(entry)
                .map_err(|e| PlugsyncError::Storage(format!("encode entry: {e}")))?;
            tx.execute(
                "INSERT INTO comparison_entries
                   (comparison_id, position, subject_name, classification, version_relation, similarity, entry_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    position as i64,
                    entry.subject.name.as_str(),
                    entry.classification.as_str(),
                    entry.version_relation.as_str(),
                    entry.similarity,
                    entry_json,
                ],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        info!(%id, %kind, total = entries.len(), matched, "comparison stored");
        Ok(id)
    }

    /// The most recent `limit` comparison runs, newest first.
    pub async fn list_comparisons(&self, limit: usize) -> Result<Vec<ComparisonHeader>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, threshold, created_at, total, matched FROM comparisons
                 ORDER BY created_at DESC, id DESC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?
        {
            results.push(row_to_header(&row)?);
        }
        Ok(results)
    }

    /// A stored comparison run with its entries, or `None` if unknown.
    pub async fn get_comparison(&self, id: &ComparisonId) -> Result<Option<StoredComparison>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, threshold, created_at, total, matched, unmatched_json
                 FROM comparisons WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?
        else {
            return Ok(None);
        };

        let header = row_to_header(&row)?;
        let unmatched_candidates: Vec<ArtifactRecord> =
            serde_json::from_str(&get_string(&row, 6)?)
                .map_err(|e| PlugsyncError::Storage(format!("decode unmatched candidates: {e}")))?;

        let mut rows = self
            .conn
            .query(
                "SELECT entry_json FROM comparison_entries
                 WHERE comparison_id = ?1 ORDER BY position",
                params![id.to_string()],
            )
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?
        {
            let entry: ComparisonEntry = serde_json::from_str(&get_string(&row, 0)?)
                .map_err(|e| PlugsyncError::Storage(format!("decode entry: {e}")))?;
            entries.push(entry);
        }

        Ok(Some(StoredComparison {
            header,
            entries,
            unmatched_candidates,
        }))
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn get_string(row: &libsql::Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| PlugsyncError::Storage(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PlugsyncError::Storage(format!("invalid date: {e}")))
}

/// Convert `id, kind, threshold, created_at, total, matched` columns.
fn row_to_header(row: &libsql::Row) -> Result<ComparisonHeader> {
    let id = get_string(row, 0)?
        .parse::<ComparisonId>()
        .map_err(|e| PlugsyncError::Storage(format!("invalid comparison id: {e}")))?;

    Ok(ComparisonHeader {
        id,
        kind: get_string(row, 1)?.parse()?,
        threshold: row
            .get::<f64>(2)
            .map_err(|e| PlugsyncError::Storage(e.to_string()))?,
        created_at: parse_timestamp(&get_string(row, 3)?)?,
        total: row
            .get::<i64>(4)
            .map_err(|e| PlugsyncError::Storage(e.to_string()))? as usize,
        matched: row
            .get::<i64>(5)
            .map_err(|e| PlugsyncError::Storage(e.to_string()))? as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugsync_shared::{MatchClassification, VersionRelation};
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("plugsync_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn rec(name: &str, version: &str, origin: Origin) -> ArtifactRecord {
        ArtifactRecord::new(name, version, format!("https://example.com/{name}/"), origin)
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("plugsync_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn artifact_snapshot_is_replaced() {
        let storage = test_storage().await;
        let first = vec![
            rec("elementor", "3.18.1", Origin::SiteA).with_raw_title("Elementor Pro v3.18.1"),
            rec("akismet", "5.3", Origin::SiteA),
        ];
        storage
            .replace_artifacts(ArtifactKind::Plugin, Origin::SiteA, &first)
            .await
            .unwrap();

        let loaded = storage
            .list_artifacts(ArtifactKind::Plugin, Origin::SiteA)
            .await
            .unwrap();
        assert_eq!(loaded, first);
        assert!(
            storage
                .artifacts_scraped_at(ArtifactKind::Plugin, Origin::SiteA)
                .await
                .unwrap()
                .is_some()
        );

        let second = vec![rec("jetpack", "13.1", Origin::SiteA)];
        storage
            .replace_artifacts(ArtifactKind::Plugin, Origin::SiteA, &second)
            .await
            .unwrap();
        let loaded = storage
            .list_artifacts(ArtifactKind::Plugin, Origin::SiteA)
            .await
            .unwrap();
        assert_eq!(loaded, second);

        // Other snapshots are untouched.
        assert!(
            storage
                .list_artifacts(ArtifactKind::Theme, Origin::SiteA)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            storage
                .artifacts_scraped_at(ArtifactKind::Plugin, Origin::SiteB)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn override_lifecycle() {
        let storage = test_storage().await;
        let target = rec("Elementor", "3.18.3", Origin::SiteB);

        storage
            .upsert_override(ArtifactKind::Plugin, "  Elementor PRO ", &target)
            .await
            .unwrap();
        let updated = rec("Elementor Premium", "3.19", Origin::SiteB);
        storage
            .upsert_override(ArtifactKind::Plugin, "elementor pro", &updated)
            .await
            .unwrap();

        let listed = storage.list_overrides(ArtifactKind::Plugin).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "elementor pro");
        assert_eq!(listed[0].1.name, "Elementor Premium");

        let table = storage.load_overrides(ArtifactKind::Plugin).await.unwrap();
        assert_eq!(
            table.get("Elementor Pro").map(|r| r.version.as_str()),
            Some("3.19")
        );
        assert!(storage.load_overrides(ArtifactKind::Theme).await.unwrap().is_empty());

        assert!(storage.remove_override(ArtifactKind::Plugin, "ELEMENTOR PRO").await.unwrap());
        assert!(!storage.remove_override(ArtifactKind::Plugin, "elementor pro").await.unwrap());
    }

    #[tokio::test]
    async fn override_rejects_empty_names() {
        let storage = test_storage().await;
        let err = storage
            .upsert_override(ArtifactKind::Plugin, "akismet", &rec(" ", "", Origin::SiteB))
            .await
            .unwrap_err();
        assert!(matches!(err, PlugsyncError::MalformedInput { .. }));
    }

    #[tokio::test]
    async fn exclusion_lifecycle() {
        let storage = test_storage().await;

        assert!(storage.add_exclusion(ArtifactKind::Theme, "Hello Elementor").await.unwrap());
        assert!(!storage.add_exclusion(ArtifactKind::Theme, "hello elementor ").await.unwrap());
        assert!(storage.add_exclusion(ArtifactKind::Theme, "Astra").await.unwrap());

        assert_eq!(
            storage.list_exclusions(ArtifactKind::Theme).await.unwrap(),
            ["astra", "hello elementor"]
        );
        let set = storage.load_exclusions(ArtifactKind::Theme).await.unwrap();
        assert!(set.contains("HELLO ELEMENTOR"));
        assert!(storage.load_exclusions(ArtifactKind::Plugin).await.unwrap().is_empty());

        assert!(storage.remove_exclusion(ArtifactKind::Theme, "astra").await.unwrap());
        assert!(!storage.remove_exclusion(ArtifactKind::Theme, "astra").await.unwrap());
        assert!(storage.add_exclusion(ArtifactKind::Theme, "   ").await.is_err());
    }

    #[tokio::test]
    async fn comparison_history() {
        let storage = test_storage().await;
        let entries = vec![
            ComparisonEntry {
                subject: rec("Elementor Pro", "3.18.1", Origin::SiteA),
                matched: Some(rec("Elementor", "3.18.3", Origin::SiteB)),
                classification: MatchClassification::Similar,
                similarity: Some(18.0 / 22.0),
                version_relation: VersionRelation::Older,
            },
            ComparisonEntry {
                subject: rec("Hello Dolly", "1.7", Origin::SiteA),
                matched: None,
                classification: MatchClassification::Blacklisted,
                similarity: None,
                version_relation: VersionRelation::Unknown,
            },
        ];
        let leftovers = vec![rec("Wordfence", "7.11", Origin::SiteB)];

        let first = storage
            .insert_comparison(ArtifactKind::Plugin, 0.8, &entries, &leftovers)
            .await
            .unwrap();
        let second = storage
            .insert_comparison(ArtifactKind::Theme, 0.9, &[], &[])
            .await
            .unwrap();

        let history = storage.list_comparisons(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second);
        assert_eq!(history[1].id, first);
        assert_eq!(history[1].total, 2);
        assert_eq!(history[1].matched, 1);
        assert_eq!(storage.list_comparisons(1).await.unwrap().len(), 1);

        let stored = storage.get_comparison(&first).await.unwrap().unwrap();
        assert_eq!(stored.header.kind, ArtifactKind::Plugin);
        assert_eq!(stored.header.threshold, 0.8);
        assert_eq!(stored.entries, entries);
        assert_eq!(stored.unmatched_candidates, leftovers);

        assert!(
            storage
                .get_comparison(&ComparisonId::new())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("plugsync_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.add_exclusion(ArtifactKind::Plugin, "akismet").await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_exclusions(ArtifactKind::Plugin).await.unwrap(), ["akismet"]);
        let result = ro.add_exclusion(ArtifactKind::Plugin, "jetpack").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("plugsync_missing_{}.db", Uuid::now_v7()));
        assert!(Storage::open_readonly(&tmp).await.is_err());
    }
}
