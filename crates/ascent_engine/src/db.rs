//! SQLite connection management and schema.
//!
//! One connection per engine. WAL mode gives concurrent readers while the
//! single-writer transaction discipline serializes mutations per database;
//! the busy timeout plus the coordinator's bounded retry absorb contention
//! from other processes sharing the file.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tracing::info;

use ascent_core::CoachError;

/// Map a rusqlite failure into the caller-facing taxonomy. Busy/locked
/// becomes a retryable conflict; everything else is a storage fault.
pub(crate) fn sql_err(e: rusqlite::Error) -> CoachError {
    if let rusqlite::Error::SqliteFailure(inner, _) = &e {
        if matches!(
            inner.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return CoachError::Conflict { attempts: 0 };
        }
    }
    CoachError::Storage(e.to_string())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS learner_state (
    learner_id TEXT PRIMARY KEY,
    doc        TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS org_members (
    learner_id TEXT NOT NULL,
    org_id     TEXT NOT NULL,
    PRIMARY KEY (learner_id, org_id)
);

CREATE INDEX IF NOT EXISTS idx_org_members_learner ON org_members(learner_id);

CREATE TABLE IF NOT EXISTS org_features (
    org_id  TEXT NOT NULL,
    feature TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (org_id, feature)
);

CREATE TABLE IF NOT EXISTS badge_grants (
    learner_id TEXT NOT NULL,
    badge_id   TEXT NOT NULL,
    granted_at TEXT NOT NULL,
    PRIMARY KEY (learner_id, badge_id)
);

CREATE TABLE IF NOT EXISTS xp_ledger (
    id         TEXT PRIMARY KEY,
    learner_id TEXT NOT NULL,
    delta      INTEGER NOT NULL,
    severity   TEXT NOT NULL,
    reason     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_xp_ledger_learner ON xp_ledger(learner_id);
"#;

/// SQLite-backed coach database
pub struct CoachDb {
    pub(crate) conn: Connection,
}

impl CoachDb {
    /// Open or create the database at a path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, CoachError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(sql_err)?;
        info!("opened coach database at {}", path.display());
        Self::init(conn)
    }

    /// In-memory database for tests
    pub fn open_in_memory() -> Result<Self, CoachError> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, CoachError> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(sql_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(sql_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(sql_err)?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let db = CoachDb::open_in_memory().unwrap();
        let count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(count >= 5);
    }

    #[test]
    fn test_open_at_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("coach.db");
        let _db = CoachDb::open_at(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coach.db");
        drop(CoachDb::open_at(&path).unwrap());
        let _again = CoachDb::open_at(&path).unwrap();
    }
}
