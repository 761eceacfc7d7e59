//! Transactional mutation coordinator.
//!
//! Every mutating entry point opens one transaction, re-reads the learner
//! aggregate and the access flags inside it, computes the new state through
//! the pure core, writes everything, and commits. Validation happens before
//! any write, so a rejected operation leaves no trace; a dropped transaction
//! rolls back. SQLite busy/locked failures retry with a small backoff before
//! surfacing as a conflict.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use ascent_core::{
    xp, Channel, ChannelSelectionOutcome, CoachError, ExerciseOutcome, ExerciseSubmission,
    Feature, LearnerSnapshot, PassSummary, Severity, SkillDelta, SkillRating,
};

use crate::access;
use crate::config::Tuning;
use crate::db::{sql_err, CoachDb};
use crate::store::{self, BadgeGrant, XpLedgerEntry};

/// The externally-callable engine
pub struct CoachEngine {
    db: CoachDb,
    tuning: Tuning,
}

impl CoachEngine {
    /// Open or create an engine at a database path with default tuning
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, CoachError> {
        Ok(Self::with_tuning(CoachDb::open_at(path)?, Tuning::default()))
    }

    /// In-memory engine for tests
    pub fn open_in_memory() -> Result<Self, CoachError> {
        Ok(Self::with_tuning(
            CoachDb::open_in_memory()?,
            Tuning::default(),
        ))
    }

    pub fn with_tuning(db: CoachDb, tuning: Tuning) -> Self {
        Self { db, tuning }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    // ------------------------------------------------------------------
    // Stand-ins for the out-of-scope org/identity collaborator
    // ------------------------------------------------------------------

    /// Record a learner's membership in an organization
    pub fn add_member(&self, learner_id: &str, org_id: &str) -> Result<(), CoachError> {
        self.db
            .conn
            .execute(
                "INSERT OR IGNORE INTO org_members (learner_id, org_id) VALUES (?1, ?2)",
                params![learner_id, org_id],
            )
            .map_err(sql_err)?;
        Ok(())
    }

    /// Enable or disable a feature for an organization
    pub fn set_feature(
        &self,
        org_id: &str,
        feature: Feature,
        enabled: bool,
    ) -> Result<(), CoachError> {
        self.db
            .conn
            .execute(
                "INSERT OR REPLACE INTO org_features (org_id, feature, enabled)
                 VALUES (?1, ?2, ?3)",
                params![org_id, feature.as_str(), enabled as i64],
            )
            .map_err(sql_err)?;
        info!(org = org_id, %feature, enabled, "feature flag updated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current rating/XP/progress snapshot for display
    pub fn snapshot(&self, learner_id: &str) -> Result<LearnerSnapshot, CoachError> {
        access::resolve_orgs(&self.db.conn, learner_id)?;
        let state = store::load_state(&self.db.conn, learner_id)?.unwrap_or_default();
        Ok(state.snapshot(learner_id))
    }

    /// XP audit history, oldest first
    pub fn xp_history(&self, learner_id: &str) -> Result<Vec<XpLedgerEntry>, CoachError> {
        store::ledger_entries(&self.db.conn, learner_id)
    }

    /// Badges granted so far, oldest first
    pub fn badges(&self, learner_id: &str) -> Result<Vec<BadgeGrant>, CoachError> {
        store::badge_list(&self.db.conn, learner_id)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Fold an exercise result into ratings and XP
    pub fn complete_exercise(
        &self,
        submission: &ExerciseSubmission,
    ) -> Result<ExerciseOutcome, CoachError> {
        self.complete_exercise_at(submission, Utc::now())
    }

    pub fn complete_exercise_at(
        &self,
        submission: &ExerciseSubmission,
        now: DateTime<Utc>,
    ) -> Result<ExerciseOutcome, CoachError> {
        for (skill, observed) in &submission.ratings {
            if !(0.0..=100.0).contains(observed) {
                return Err(CoachError::Validation(format!(
                    "rating for {} out of range: {}",
                    skill, observed
                )));
            }
        }
        self.with_retry(|conn| tx_complete_exercise(conn, &self.tuning, submission, now))
    }

    /// Record a base-ladder lesson pass
    pub fn pass_lesson(
        &self,
        learner_id: &str,
        level: u8,
        lesson_id: &str,
    ) -> Result<PassSummary, CoachError> {
        self.pass_lesson_at(learner_id, level, lesson_id, Utc::now())
    }

    pub fn pass_lesson_at(
        &self,
        learner_id: &str,
        level: u8,
        lesson_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PassSummary, CoachError> {
        self.with_retry(|conn| tx_pass_lesson(conn, &self.tuning, learner_id, level, lesson_id, now))
    }

    /// Record a channel-ladder lesson pass
    pub fn pass_channel_lesson(
        &self,
        learner_id: &str,
        level: u8,
        lesson_id: &str,
    ) -> Result<PassSummary, CoachError> {
        self.pass_channel_lesson_at(learner_id, level, lesson_id, Utc::now())
    }

    pub fn pass_channel_lesson_at(
        &self,
        learner_id: &str,
        level: u8,
        lesson_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PassSummary, CoachError> {
        self.with_retry(|conn| tx_pass_channel_lesson(conn, learner_id, level, lesson_id, now))
    }

    /// Select the channel for the level-2 primary phase
    pub fn set_primary_channel(
        &self,
        learner_id: &str,
        channel: Channel,
    ) -> Result<ChannelSelectionOutcome, CoachError> {
        self.set_primary_channel_at(learner_id, channel, Utc::now())
    }

    pub fn set_primary_channel_at(
        &self,
        learner_id: &str,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<ChannelSelectionOutcome, CoachError> {
        self.with_retry(|conn| tx_set_channel(conn, learner_id, channel, true, now))
    }

    /// Select the channel for the level-2 secondary phase
    pub fn set_secondary_channel(
        &self,
        learner_id: &str,
        channel: Channel,
    ) -> Result<ChannelSelectionOutcome, CoachError> {
        self.set_secondary_channel_at(learner_id, channel, Utc::now())
    }

    pub fn set_secondary_channel_at(
        &self,
        learner_id: &str,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<ChannelSelectionOutcome, CoachError> {
        self.with_retry(|conn| tx_set_channel(conn, learner_id, channel, false, now))
    }

    /// Count an exercise session that ended without a submission
    pub fn record_abandonment(&self, learner_id: &str) -> Result<u32, CoachError> {
        self.record_abandonment_at(learner_id, Utc::now())
    }

    pub fn record_abandonment_at(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u32, CoachError> {
        self.with_retry(|conn| {
            let tx = conn.unchecked_transaction().map_err(sql_err)?;
            access::require(&tx, learner_id, Feature::Exercises)?;
            let mut state = store::load_state(&tx, learner_id)?.unwrap_or_default();
            state.ladder.record_abandonment();
            store::save_state(&tx, learner_id, &state, now)?;
            tx.commit().map_err(sql_err)?;
            Ok(state.ladder.abandonment_count)
        })
    }

    /// Run one transactional attempt, retrying while the store reports a
    /// busy/locked conflict
    fn with_retry<T>(
        &self,
        op: impl Fn(&Connection) -> Result<T, CoachError>,
    ) -> Result<T, CoachError> {
        let budget = self.tuning.max_tx_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(&self.db.conn) {
                Err(CoachError::Conflict { .. }) if attempt < budget => {
                    debug!(attempt, "write conflict, retrying");
                    std::thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
                }
                Err(CoachError::Conflict { .. }) => {
                    return Err(CoachError::Conflict { attempts: attempt })
                }
                other => return other,
            }
        }
    }
}

fn tx_complete_exercise(
    conn: &Connection,
    tuning: &Tuning,
    submission: &ExerciseSubmission,
    now: DateTime<Utc>,
) -> Result<ExerciseOutcome, CoachError> {
    let tx = conn.unchecked_transaction().map_err(sql_err)?;
    access::require(&tx, &submission.learner_id, Feature::Exercises)?;

    let mut state = store::load_state(&tx, &submission.learner_id)?.unwrap_or_default();

    let mut skills = BTreeMap::new();
    for (skill, observed) in &submission.ratings {
        let old = state
            .ratings
            .get(skill)
            .cloned()
            .unwrap_or_else(|| SkillRating::baseline(now));
        let updated = tuning.rating.observe(&old, *observed, submission.kind, now);
        skills.insert(
            *skill,
            SkillDelta {
                before: old.score,
                after: updated.score,
            },
        );
        state.ratings.insert(*skill, updated);
    }

    let delta = xp::sanitize(submission.xp_hint, submission.severity);
    state.xp_total = xp::apply(state.xp_total, delta, submission.severity);
    if delta != 0 {
        store::append_ledger(
            &tx,
            &submission.learner_id,
            delta,
            submission.severity,
            &format!("exercise {}", submission.exercise_id),
            now,
        )?;
    }

    store::save_state(&tx, &submission.learner_id, &state, now)?;
    tx.commit().map_err(sql_err)?;

    debug!(
        learner = %submission.learner_id,
        xp = delta,
        skills = skills.len(),
        "exercise recorded"
    );
    Ok(ExerciseOutcome {
        skills,
        xp_awarded: delta,
        xp_total: state.xp_total,
        snapshot: state.snapshot(&submission.learner_id),
    })
}

fn tx_pass_lesson(
    conn: &Connection,
    tuning: &Tuning,
    learner_id: &str,
    level: u8,
    lesson_id: &str,
    now: DateTime<Utc>,
) -> Result<PassSummary, CoachError> {
    let tx = conn.unchecked_transaction().map_err(sql_err)?;
    access::require(&tx, learner_id, Feature::BaseLadder)?;

    let mut state = store::load_state(&tx, learner_id)?.unwrap_or_default();
    let result = state
        .ladder
        .pass_lesson(level, lesson_id, now, tuning.daily_pass_cap)?;

    let mut xp_awarded = 0;
    if !result.already_passed {
        xp_awarded = xp::sanitize(result.xp_award as f64, Severity::Normal);
        state.xp_total = xp::apply(state.xp_total, xp_awarded, Severity::Normal);
        if xp_awarded != 0 {
            store::append_ledger(
                &tx,
                learner_id,
                xp_awarded,
                Severity::Normal,
                &format!("lesson {}", lesson_id),
                now,
            )?;
        }
        if let Some(badge) = &result.badge {
            if store::grant_badge(&tx, learner_id, badge, now)? {
                info!(learner = learner_id, badge = %badge, "badge granted");
            }
        }
        store::save_state(&tx, learner_id, &state, now)?;
    }
    tx.commit().map_err(sql_err)?;

    if result.level_advanced {
        info!(
            learner = learner_id,
            level = state.ladder.current_level,
            "ladder level advanced"
        );
    }
    Ok(PassSummary {
        already_passed: result.already_passed,
        level_advanced: result.level_advanced,
        certified: result.certified,
        xp_awarded,
        badge: result.badge,
        snapshot: state.snapshot(learner_id),
    })
}

fn tx_pass_channel_lesson(
    conn: &Connection,
    learner_id: &str,
    level: u8,
    lesson_id: &str,
    now: DateTime<Utc>,
) -> Result<PassSummary, CoachError> {
    let tx = conn.unchecked_transaction().map_err(sql_err)?;
    access::require(&tx, learner_id, Feature::ChannelLadder)?;

    let mut state = store::load_state(&tx, learner_id)?.unwrap_or_default();
    let result = state.channel.pass_lesson(level, lesson_id, now)?;

    let mut xp_awarded = 0;
    if !result.already_passed {
        xp_awarded = xp::sanitize(result.xp_award as f64, Severity::Normal);
        state.xp_total = xp::apply(state.xp_total, xp_awarded, Severity::Normal);
        if xp_awarded != 0 {
            store::append_ledger(
                &tx,
                learner_id,
                xp_awarded,
                Severity::Normal,
                &format!("channel lesson {}", lesson_id),
                now,
            )?;
        }
        if let Some(badge) = &result.badge {
            if store::grant_badge(&tx, learner_id, badge, now)? {
                info!(learner = learner_id, badge = %badge, "badge granted");
            }
        }
        store::save_state(&tx, learner_id, &state, now)?;
    }
    tx.commit().map_err(sql_err)?;

    Ok(PassSummary {
        already_passed: result.already_passed,
        level_advanced: result.level_advanced,
        certified: result.certified,
        xp_awarded,
        badge: result.badge,
        snapshot: state.snapshot(learner_id),
    })
}

fn tx_set_channel(
    conn: &Connection,
    learner_id: &str,
    channel: Channel,
    primary: bool,
    now: DateTime<Utc>,
) -> Result<ChannelSelectionOutcome, CoachError> {
    let tx = conn.unchecked_transaction().map_err(sql_err)?;
    access::require(&tx, learner_id, Feature::ChannelLadder)?;

    let mut state = store::load_state(&tx, learner_id)?.unwrap_or_default();
    let changed = if primary {
        state.channel.set_primary_channel(channel)?
    } else {
        state.channel.set_secondary_channel(channel)?
    };
    if changed {
        store::save_state(&tx, learner_id, &state, now)?;
    }
    tx.commit().map_err(sql_err)?;

    Ok(ChannelSelectionOutcome {
        channel,
        changed,
        snapshot: state.snapshot(learner_id),
    })
}
