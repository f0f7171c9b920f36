//! SQL migration definitions for the plugsync database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: artifacts, overrides, exclusions",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Latest scraped snapshot per (kind, origin)
CREATE TABLE IF NOT EXISTS artifacts (
    kind       TEXT NOT NULL,
    origin     TEXT NOT NULL,
    position   INTEGER NOT NULL,
    name       TEXT NOT NULL,
    version    TEXT NOT NULL,
    source_url TEXT NOT NULL,
    raw_title  TEXT,
    scraped_at TEXT NOT NULL,
    PRIMARY KEY (kind, origin, position)
);

-- Forced matches, keyed by normalized subject name
CREATE TABLE IF NOT EXISTS overrides (
    kind          TEXT NOT NULL,
    subject_name  TEXT NOT NULL,
    match_name    TEXT NOT NULL,
    match_version TEXT NOT NULL,
    match_url     TEXT NOT NULL,
    match_origin  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    PRIMARY KEY (kind, subject_name)
);

-- Subjects never reported as matches
CREATE TABLE IF NOT EXISTS exclusions (
    kind       TEXT NOT NULL,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (kind, name)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Comparison history",
            sql: r#"
CREATE TABLE IF NOT EXISTS comparisons (
    id             TEXT PRIMARY KEY,
    kind           TEXT NOT NULL,
    threshold      REAL NOT NULL,
    created_at     TEXT NOT NULL,
    total          INTEGER NOT NULL,
    matched        INTEGER NOT NULL,
    unmatched_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comparisons_created ON comparisons(created_at);

CREATE TABLE IF NOT EXISTS comparison_entries (
    comparison_id    TEXT NOT NULL REFERENCES comparisons(id) ON DELETE CASCADE,
    position         INTEGER NOT NULL,
    subject_name     TEXT NOT NULL,
    classification   TEXT NOT NULL,
    version_relation TEXT NOT NULL,
    similarity       REAL,
    entry_json       TEXT NOT NULL,
    PRIMARY KEY (comparison_id, position)
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
