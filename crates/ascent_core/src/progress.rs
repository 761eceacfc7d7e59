//! Base ladder progression state machine.
//!
//! Levels 1-10, each either in progress or complete. Completing a level
//! advances the learner exactly one level; completing level 10 certifies and
//! freezes progress at 100. A daily pass cap bounds how fast the ladder can
//! be farmed. All rejections happen before any field is touched, so a failed
//! transition leaves the record exactly as it was.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::CoachError;
use crate::ladder::{evaluate_pass, DailyPassWindow, LadderSpec, PhaseKey};

/// Default base-ladder passes allowed per UTC day
pub const DEFAULT_DAILY_PASS_CAP: u32 = 5;

struct BaseSpec;

impl LadderSpec for BaseSpec {
    fn max_level(&self) -> u8 {
        catalog::BASE_LEVELS
    }

    fn lesson_ids(&self, key: PhaseKey) -> Vec<String> {
        catalog::lesson_ids_for_level(key.level)
    }

    fn xp_per_pass(&self, key: PhaseKey) -> i64 {
        catalog::xp_reward_for_level(key.level)
    }
}

/// Per-learner base ladder state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderProgress {
    /// The one level the learner is currently at (1-10)
    pub current_level: u8,
    /// Passed lesson ids keyed by position; append-only per key, so prior
    /// levels keep their history after advancement
    pub lessons_passed: BTreeMap<String, BTreeSet<String>>,
    /// Completion percentage within the current level
    pub progress_percent: u8,
    /// True only once level 10 is complete
    pub certified: bool,
    #[serde(default)]
    pub daily: DailyPassWindow,
    /// Exercise sessions ended without a submission
    #[serde(default)]
    pub abandonment_count: u32,
}

impl Default for LadderProgress {
    fn default() -> Self {
        Self {
            current_level: 1,
            lessons_passed: BTreeMap::new(),
            progress_percent: 0,
            certified: false,
            daily: DailyPassWindow::default(),
            abandonment_count: 0,
        }
    }
}

/// What one pass did
#[derive(Debug, Clone)]
pub struct LessonPassResult {
    pub already_passed: bool,
    pub level_advanced: bool,
    pub certified: bool,
    /// Raw XP award for the pass, zero when idempotent
    pub xp_award: i64,
    /// Badge earned by completing a level, if any
    pub badge: Option<String>,
}

impl LadderProgress {
    /// Record a lesson pass at `level`.
    ///
    /// Transition order: level ownership, lesson membership, idempotency,
    /// daily cap, then mutation. The cap only counts fresh passes.
    pub fn pass_lesson(
        &mut self,
        level: u8,
        lesson_id: &str,
        now: DateTime<Utc>,
        cap: u32,
    ) -> Result<LessonPassResult, CoachError> {
        let key = PhaseKey::core(level);
        let passed = self
            .lessons_passed
            .get(&key.storage_key())
            .cloned()
            .unwrap_or_default();

        let eval = evaluate_pass(&BaseSpec, key, self.current_level, level, lesson_id, &passed)?;
        if eval.already_passed {
            return Ok(LessonPassResult {
                already_passed: true,
                level_advanced: false,
                certified: self.certified,
                xp_award: 0,
                badge: None,
            });
        }

        self.daily
            .record(now, cap)
            .map_err(|resets_at| CoachError::RateLimited { resets_at })?;

        self.lessons_passed
            .entry(key.storage_key())
            .or_default()
            .insert(lesson_id.to_string());

        let mut level_advanced = false;
        let mut badge = None;
        if eval.phase_complete {
            let terminal = level == catalog::BASE_LEVELS;
            badge = Some(catalog::badge_for_level(level, terminal));
            if terminal {
                self.certified = true;
                self.progress_percent = 100;
            } else {
                self.current_level = level + 1;
                self.progress_percent = 0;
                level_advanced = true;
            }
        } else {
            self.progress_percent = eval.percent();
        }

        Ok(LessonPassResult {
            already_passed: false,
            level_advanced,
            certified: self.certified,
            xp_award: eval.xp,
            badge,
        })
    }

    /// Called when an exercise session ends without a submission
    pub fn record_abandonment(&mut self) {
        self.abandonment_count += 1;
    }

    /// Passed-lesson count for a level
    pub fn passed_count(&self, level: u8) -> usize {
        self.lessons_passed
            .get(&PhaseKey::core(level).storage_key())
            .map_or(0, |s| s.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    // Cap high enough to never interfere unless the test is about the cap.
    const NO_CAP: u32 = 1_000;

    fn complete_level(progress: &mut LadderProgress, level: u8, now: DateTime<Utc>) {
        for id in catalog::lesson_ids_for_level(level) {
            progress.pass_lesson(level, &id, now, NO_CAP).unwrap();
        }
    }

    #[test]
    fn test_pass_updates_progress_percent() {
        let mut progress = LadderProgress::default();
        let ids = catalog::lesson_ids_for_level(1);
        let result = progress.pass_lesson(1, &ids[0], at(0), NO_CAP).unwrap();
        assert!(!result.already_passed);
        assert_eq!(result.xp_award, catalog::xp_reward_for_level(1));
        assert_eq!(progress.progress_percent, 10);
        assert_eq!(progress.current_level, 1);
    }

    #[test]
    fn test_repass_is_idempotent() {
        let mut progress = LadderProgress::default();
        let ids = catalog::lesson_ids_for_level(1);
        progress.pass_lesson(1, &ids[0], at(0), NO_CAP).unwrap();
        let before = progress.clone();

        let result = progress.pass_lesson(1, &ids[0], at(10), NO_CAP).unwrap();
        assert!(result.already_passed);
        assert_eq!(result.xp_award, 0);
        assert_eq!(progress, before, "idempotent repass must not mutate state");
    }

    #[test]
    fn test_completing_level_advances_exactly_one() {
        let mut progress = LadderProgress::default();
        complete_level(&mut progress, 1, at(0));
        assert_eq!(progress.current_level, 2);
        assert_eq!(progress.progress_percent, 0);
        assert!(!progress.certified);
        // Prior level's history is retained.
        assert_eq!(progress.passed_count(1), 10);
    }

    #[test]
    fn test_wrong_level_rejected_without_mutation() {
        let mut progress = LadderProgress::default();
        let before = progress.clone();
        let ids = catalog::lesson_ids_for_level(2);
        let err = progress.pass_lesson(2, &ids[0], at(0), NO_CAP);
        assert!(matches!(err, Err(CoachError::Validation(_))));
        assert_eq!(progress, before);
    }

    #[test]
    fn test_daily_cap_rejects_sixth_pass() {
        let mut progress = LadderProgress::default();
        let ids = catalog::lesson_ids_for_level(1);
        for id in ids.iter().take(5) {
            progress
                .pass_lesson(1, id, at(0), DEFAULT_DAILY_PASS_CAP)
                .unwrap();
        }
        let before = progress.clone();
        let err = progress.pass_lesson(1, &ids[5], at(60), DEFAULT_DAILY_PASS_CAP);
        match err {
            Err(CoachError::RateLimited { resets_at }) => assert!(resets_at > at(60)),
            other => panic!("expected RateLimited, got {:?}", other.map(|_| ())),
        }
        assert_eq!(progress.lessons_passed, before.lessons_passed);

        // First attempt after UTC midnight succeeds even though yesterday
        // finished at cap.
        let tomorrow = at(0) + chrono::Duration::days(1);
        progress
            .pass_lesson(1, &ids[5], tomorrow, DEFAULT_DAILY_PASS_CAP)
            .unwrap();
    }

    #[test]
    fn test_cap_ignores_idempotent_repasses() {
        let mut progress = LadderProgress::default();
        let ids = catalog::lesson_ids_for_level(1);
        for id in ids.iter().take(5) {
            progress
                .pass_lesson(1, id, at(0), DEFAULT_DAILY_PASS_CAP)
                .unwrap();
        }
        // Re-passing an already-passed lesson is a no-op, not a cap hit.
        let result = progress
            .pass_lesson(1, &ids[0], at(0), DEFAULT_DAILY_PASS_CAP)
            .unwrap();
        assert!(result.already_passed);
        assert_eq!(progress.daily.count, 5);
    }

    #[test]
    fn test_full_ladder_certification() {
        let mut progress = LadderProgress::default();
        for level in 1..catalog::BASE_LEVELS {
            complete_level(&mut progress, level, at(i64::from(level) * 60));
            assert_eq!(progress.current_level, level + 1);
        }

        // Last lesson of level 10 flips certification.
        let ids = catalog::lesson_ids_for_level(10);
        for id in ids.iter().take(ids.len() - 1) {
            progress.pass_lesson(10, id, at(0), NO_CAP).unwrap();
        }
        assert!(!progress.certified);
        let result = progress
            .pass_lesson(10, &ids[ids.len() - 1], at(0), NO_CAP)
            .unwrap();
        assert!(result.certified);
        assert_eq!(result.badge.as_deref(), Some("ladder-certified"));
        assert!(!result.level_advanced);
        assert_eq!(progress.current_level, 10);
        assert_eq!(progress.progress_percent, 100);
    }

    #[test]
    fn test_level_completion_badge() {
        let mut progress = LadderProgress::default();
        let ids = catalog::lesson_ids_for_level(1);
        let mut badge = None;
        for id in &ids {
            badge = progress.pass_lesson(1, id, at(0), NO_CAP).unwrap().badge;
        }
        assert_eq!(badge.as_deref(), Some("ladder-level-01"));
    }
}
