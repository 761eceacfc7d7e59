//! Shared gated-ladder mechanics.
//!
//! Both ladders (base and channel-branching) run the same pass discipline:
//! the requested level must be the learner's current level, the lesson must
//! belong to the unlocked position, re-passing is an idempotent no-op, and
//! completion is recomputed from the recorded set. Catalogs plug in through
//! [`LadderSpec`]; what advancement means stays in each state machine.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoachError;

/// Sub-position within a level. Base-ladder levels and non-branching channel
/// levels have a single `Core` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Core,
    Primary,
    Secondary,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position a lesson pass is recorded against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseKey {
    pub level: u8,
    pub phase: Phase,
}

impl PhaseKey {
    pub fn core(level: u8) -> Self {
        Self {
            level,
            phase: Phase::Core,
        }
    }

    /// Key used in the lessons-passed map. History is append-only per key, so
    /// prior levels keep their record after advancement.
    pub fn storage_key(&self) -> String {
        format!("l{}:{}", self.level, self.phase)
    }
}

/// Catalog strategy a ladder provides to the shared mechanics
pub trait LadderSpec {
    /// Highest level in this ladder
    fn max_level(&self) -> u8;

    /// Ordered lesson ids unlocked at a position
    fn lesson_ids(&self, key: PhaseKey) -> Vec<String>;

    /// XP for one fresh pass at a position
    fn xp_per_pass(&self, key: PhaseKey) -> i64;
}

/// What a single pass would do to the position it lands on
#[derive(Debug, Clone)]
pub struct PassEvaluation {
    pub already_passed: bool,
    /// Whether this pass completes every lesson at the position
    pub phase_complete: bool,
    pub xp: i64,
    pub passed_count: usize,
    pub total_count: usize,
}

impl PassEvaluation {
    /// Completion percentage for the position after this pass
    pub fn percent(&self) -> u8 {
        if self.total_count == 0 {
            return 100;
        }
        ((self.passed_count * 100) / self.total_count) as u8
    }
}

/// Validate a pass against the recorded set. Pure; mutates nothing.
///
/// Rejections here are all caller faults: wrong level (no skipping, no
/// retroactive credit for past levels) or a lesson that does not belong to
/// the position.
pub fn evaluate_pass(
    spec: &impl LadderSpec,
    key: PhaseKey,
    current_level: u8,
    requested_level: u8,
    lesson_id: &str,
    passed: &BTreeSet<String>,
) -> Result<PassEvaluation, CoachError> {
    if requested_level == 0 || requested_level > spec.max_level() {
        return Err(CoachError::Validation(format!(
            "level {} is outside this ladder (1-{})",
            requested_level,
            spec.max_level()
        )));
    }
    if requested_level != current_level {
        return Err(CoachError::Validation(format!(
            "lesson belongs to level {} but the learner is at level {}",
            requested_level, current_level
        )));
    }

    let ids = spec.lesson_ids(key);
    if !ids.iter().any(|id| id == lesson_id) {
        return Err(CoachError::Validation(format!(
            "lesson {} is not part of level {} ({})",
            lesson_id, key.level, key.phase
        )));
    }

    if passed.contains(lesson_id) {
        return Ok(PassEvaluation {
            already_passed: true,
            phase_complete: passed.len() == ids.len(),
            xp: 0,
            passed_count: passed.len(),
            total_count: ids.len(),
        });
    }

    let passed_count = passed.len() + 1;
    Ok(PassEvaluation {
        already_passed: false,
        phase_complete: passed_count == ids.len(),
        xp: spec.xp_per_pass(key),
        passed_count,
        total_count: ids.len(),
    })
}

/// Daily pass window, keyed by UTC calendar date.
///
/// The comparison is by date key, not elapsed hours: the first pass after UTC
/// midnight succeeds even if the prior day finished at cap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyPassWindow {
    /// UTC date key (`YYYY-MM-DD`) the count belongs to
    pub date_key: String,
    pub count: u32,
}

impl DailyPassWindow {
    /// Count one pass, resetting when the date key rolls over. Returns the
    /// reset time when the cap is already met.
    pub fn record(&mut self, now: DateTime<Utc>, cap: u32) -> Result<(), DateTime<Utc>> {
        let today = date_key(now);
        if self.date_key != today {
            self.date_key = today;
            self.count = 0;
        }
        if self.count >= cap {
            return Err(next_utc_midnight(now));
        }
        self.count += 1;
        Ok(())
    }
}

/// UTC date key for the daily window
pub fn date_key(now: DateTime<Utc>) -> String {
    now.date_naive().format("%Y-%m-%d").to_string()
}

/// Start of the next UTC calendar day
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let next = today.succ_opt().unwrap_or(today);
    next.and_time(NaiveTime::MIN).and_utc()
}
