//! Row-level persistence for the learner aggregate and its side tables.
//!
//! The aggregate is one JSON document per learner, read and written whole
//! inside the coordinator's transaction. Side tables carry the append-only
//! XP audit ledger and at-most-once badge grants.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use ascent_core::{CoachError, LearnerState, Severity};

use crate::db::sql_err;

/// One XP audit ledger row
#[derive(Debug, Clone)]
pub struct XpLedgerEntry {
    pub id: String,
    pub delta: i64,
    pub severity: Severity,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// One badge grant row
#[derive(Debug, Clone)]
pub struct BadgeGrant {
    pub badge_id: String,
    pub granted_at: DateTime<Utc>,
}

pub(crate) fn load_state(
    conn: &Connection,
    learner_id: &str,
) -> Result<Option<LearnerState>, CoachError> {
    let doc: Option<String> = conn
        .query_row(
            "SELECT doc FROM learner_state WHERE learner_id = ?1",
            params![learner_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)?;
    match doc {
        Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        None => Ok(None),
    }
}

pub(crate) fn save_state(
    conn: &Connection,
    learner_id: &str,
    state: &LearnerState,
    now: DateTime<Utc>,
) -> Result<(), CoachError> {
    let doc = serde_json::to_string(state)?;
    conn.execute(
        "INSERT INTO learner_state (learner_id, doc, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(learner_id) DO UPDATE SET doc = ?2, updated_at = ?3",
        params![learner_id, doc, now],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub(crate) fn org_ids(conn: &Connection, learner_id: &str) -> Result<Vec<String>, CoachError> {
    let mut stmt = conn
        .prepare("SELECT org_id FROM org_members WHERE learner_id = ?1 ORDER BY org_id")
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![learner_id], |row| row.get(0))
        .map_err(sql_err)?;
    let mut orgs = Vec::new();
    for row in rows {
        orgs.push(row.map_err(sql_err)?);
    }
    Ok(orgs)
}

pub(crate) fn feature_enabled(
    conn: &Connection,
    org_id: &str,
    feature: &str,
) -> Result<bool, CoachError> {
    let enabled: Option<i64> = conn
        .query_row(
            "SELECT enabled FROM org_features WHERE org_id = ?1 AND feature = ?2",
            params![org_id, feature],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)?;
    Ok(enabled.unwrap_or(0) != 0)
}

pub(crate) fn badge_granted(
    conn: &Connection,
    learner_id: &str,
    badge_id: &str,
) -> Result<bool, CoachError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM badge_grants WHERE learner_id = ?1 AND badge_id = ?2",
            params![learner_id, badge_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_err)?;
    Ok(found.is_some())
}

/// Grant a badge unless it is already held. Returns whether a new grant was
/// written; the re-check runs under the caller's transaction, keeping grants
/// at-most-once.
pub(crate) fn grant_badge(
    conn: &Connection,
    learner_id: &str,
    badge_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, CoachError> {
    if badge_granted(conn, learner_id, badge_id)? {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO badge_grants (learner_id, badge_id, granted_at) VALUES (?1, ?2, ?3)",
        params![learner_id, badge_id, now],
    )
    .map_err(sql_err)?;
    Ok(true)
}

pub(crate) fn append_ledger(
    conn: &Connection,
    learner_id: &str,
    delta: i64,
    severity: Severity,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), CoachError> {
    conn.execute(
        "INSERT INTO xp_ledger (id, learner_id, delta, severity, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            Uuid::new_v4().to_string(),
            learner_id,
            delta,
            severity.as_str(),
            reason,
            now
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

pub(crate) fn ledger_entries(
    conn: &Connection,
    learner_id: &str,
) -> Result<Vec<XpLedgerEntry>, CoachError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, delta, severity, reason, created_at
             FROM xp_ledger WHERE learner_id = ?1 ORDER BY created_at, id",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![learner_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, DateTime<Utc>>(4)?,
            ))
        })
        .map_err(sql_err)?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, delta, severity, reason, created_at) = row.map_err(sql_err)?;
        let severity = severity
            .parse::<Severity>()
            .map_err(CoachError::Storage)?;
        entries.push(XpLedgerEntry {
            id,
            delta,
            severity,
            reason,
            created_at,
        });
    }
    Ok(entries)
}

pub(crate) fn badge_list(
    conn: &Connection,
    learner_id: &str,
) -> Result<Vec<BadgeGrant>, CoachError> {
    let mut stmt = conn
        .prepare(
            "SELECT badge_id, granted_at FROM badge_grants
             WHERE learner_id = ?1 ORDER BY granted_at, badge_id",
        )
        .map_err(sql_err)?;
    let rows = stmt
        .query_map(params![learner_id], |row| {
            Ok(BadgeGrant {
                badge_id: row.get(0)?,
                granted_at: row.get(1)?,
            })
        })
        .map_err(sql_err)?;
    let mut grants = Vec::new();
    for row in rows {
        grants.push(row.map_err(sql_err)?);
    }
    Ok(grants)
}
