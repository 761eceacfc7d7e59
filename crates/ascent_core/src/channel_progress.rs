//! Channel-branching ladder state machine (5 levels).
//!
//! Level 2 runs two sequential phases, each gated by a learner-selected
//! contact channel: primary first, then a distinct secondary. A channel
//! selection is locked the moment any lesson of its phase has been passed.
//! Completing level 5 records a certification timestamp; the timestamp's
//! presence, not a boolean, is the certified flag.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::{self, Channel, L2Phase};
use crate::error::CoachError;
use crate::ladder::{evaluate_pass, LadderSpec, Phase, PhaseKey};
use crate::progress::LessonPassResult;

struct ChannelSpec;

impl LadderSpec for ChannelSpec {
    fn max_level(&self) -> u8 {
        channel::CHANNEL_LEVELS
    }

    fn lesson_ids(&self, key: PhaseKey) -> Vec<String> {
        channel::lesson_ids_for(key)
    }

    fn xp_per_pass(&self, key: PhaseKey) -> i64 {
        channel::xp_per_lesson(key)
    }
}

/// Per-learner channel ladder state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelProgress {
    /// The one level the learner is currently at (1-5)
    pub current_level: u8,
    /// Highest fully-completed level
    pub level_completed: u8,
    /// Completion percentage within the current level/phase
    pub current_level_progress: u8,
    /// Locked once any level-2 primary lesson has been passed
    pub primary_channel: Option<Channel>,
    /// Must differ from the primary; locked once any secondary lesson passed
    pub secondary_channel: Option<Channel>,
    /// Which branch of level 2 is active
    pub l2_phase: L2Phase,
    /// Set on level-5 completion; presence implies certified
    pub certified_at: Option<DateTime<Utc>>,
    /// Passed lesson ids keyed by (level, phase) position
    pub lessons_passed: BTreeMap<String, BTreeSet<String>>,
}

impl Default for ChannelProgress {
    fn default() -> Self {
        Self {
            current_level: 1,
            level_completed: 0,
            current_level_progress: 0,
            primary_channel: None,
            secondary_channel: None,
            l2_phase: L2Phase::Primary,
            certified_at: None,
            lessons_passed: BTreeMap::new(),
        }
    }
}

impl ChannelProgress {
    pub fn certified(&self) -> bool {
        self.certified_at.is_some()
    }

    /// The phase a pass at `level` lands on
    fn active_phase(&self, level: u8) -> Phase {
        if level == 2 {
            self.l2_phase.phase()
        } else {
            Phase::Core
        }
    }

    fn phase_has_passes(&self, key: PhaseKey) -> bool {
        self.lessons_passed
            .get(&key.storage_key())
            .map_or(false, |s| !s.is_empty())
    }

    /// Select the primary channel for level 2.
    ///
    /// Re-selecting the current value is a no-op; changing it is rejected
    /// once any primary-phase lesson has been passed. Returns whether the
    /// stored value changed.
    pub fn set_primary_channel(&mut self, channel: Channel) -> Result<bool, CoachError> {
        if self.primary_channel == Some(channel) {
            return Ok(false);
        }
        let locked = self.phase_has_passes(PhaseKey {
            level: 2,
            phase: Phase::Primary,
        });
        if locked {
            return Err(CoachError::Validation(
                "primary channel is locked once a primary-phase lesson has been passed"
                    .to_string(),
            ));
        }
        if self.secondary_channel == Some(channel) {
            return Err(CoachError::Validation(format!(
                "{} is already the secondary channel",
                channel
            )));
        }
        self.primary_channel = Some(channel);
        Ok(true)
    }

    /// Select the secondary channel for level 2. Must differ from the
    /// primary; same lock rule as the primary selection.
    pub fn set_secondary_channel(&mut self, channel: Channel) -> Result<bool, CoachError> {
        if self.secondary_channel == Some(channel) {
            return Ok(false);
        }
        let locked = self.phase_has_passes(PhaseKey {
            level: 2,
            phase: Phase::Secondary,
        });
        if locked {
            return Err(CoachError::Validation(
                "secondary channel is locked once a secondary-phase lesson has been passed"
                    .to_string(),
            ));
        }
        match self.primary_channel {
            None => {
                return Err(CoachError::Validation(
                    "select a primary channel before the secondary".to_string(),
                ))
            }
            Some(primary) if primary == channel => {
                return Err(CoachError::Validation(format!(
                    "secondary channel must differ from the primary ({})",
                    primary
                )))
            }
            Some(_) => {}
        }
        self.secondary_channel = Some(channel);
        Ok(true)
    }

    /// Record a lesson pass at `level`.
    ///
    /// Same ownership and idempotency discipline as the base ladder; level-2
    /// lessons additionally require the phase's channel to be selected
    /// before any lesson is visible.
    pub fn pass_lesson(
        &mut self,
        level: u8,
        lesson_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LessonPassResult, CoachError> {
        let phase = self.active_phase(level);
        if level == 2 {
            let gate = match phase {
                Phase::Primary => self.primary_channel,
                Phase::Secondary => self.secondary_channel,
                Phase::Core => None,
            };
            if gate.is_none() {
                return Err(CoachError::Validation(format!(
                    "no {} channel selected, lessons are locked",
                    phase
                )));
            }
        }

        let key = PhaseKey { level, phase };
        let passed = self
            .lessons_passed
            .get(&key.storage_key())
            .cloned()
            .unwrap_or_default();

        let eval =
            evaluate_pass(&ChannelSpec, key, self.current_level, level, lesson_id, &passed)?;
        if eval.already_passed {
            return Ok(LessonPassResult {
                already_passed: true,
                level_advanced: false,
                certified: self.certified(),
                xp_award: 0,
                badge: None,
            });
        }

        self.lessons_passed
            .entry(key.storage_key())
            .or_default()
            .insert(lesson_id.to_string());

        let mut level_advanced = false;
        let mut badge = None;
        if eval.phase_complete {
            match (level, phase) {
                // Primary branch done: swing to the secondary phase, still
                // inside level 2.
                (2, Phase::Primary) => {
                    self.l2_phase = L2Phase::Secondary;
                    self.current_level_progress = 0;
                }
                (level, _) if level < channel::CHANNEL_LEVELS => {
                    self.level_completed = self.level_completed.max(level);
                    self.current_level = level + 1;
                    self.current_level_progress = 0;
                    level_advanced = true;
                    badge = Some(channel::badge_for_level(level, false));
                }
                _ => {
                    self.level_completed = channel::CHANNEL_LEVELS;
                    self.certified_at = Some(now);
                    self.current_level_progress = 100;
                    badge = Some(channel::badge_for_level(channel::CHANNEL_LEVELS, true));
                }
            }
        } else {
            self.current_level_progress = eval.percent();
        }

        Ok(LessonPassResult {
            already_passed: false,
            level_advanced,
            certified: self.certified(),
            xp_award: eval.xp,
            badge,
        })
    }
}
