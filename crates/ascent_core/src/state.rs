//! The per-learner aggregate and caller-facing result types.
//!
//! `LearnerState` is the single transactionally-guarded document the engine
//! reads and writes as a whole; rating, XP, and ladder fields are never
//! persisted through separate writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::channel_progress::ChannelProgress;
use crate::progress::LadderProgress;
use crate::rating::{ObservationKind, SkillRating};
use crate::skills::Skill;
use crate::xp::Severity;

/// Everything the platform tracks for one learner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerState {
    #[serde(default)]
    pub xp_total: i64,
    #[serde(default)]
    pub ratings: BTreeMap<Skill, SkillRating>,
    #[serde(default)]
    pub ladder: LadderProgress,
    #[serde(default)]
    pub channel: ChannelProgress,
}

impl LearnerState {
    /// Display snapshot handed back with every mutation result
    pub fn snapshot(&self, learner_id: &str) -> LearnerSnapshot {
        LearnerSnapshot {
            learner_id: learner_id.to_string(),
            xp_total: self.xp_total,
            ratings: self.ratings.clone(),
            ladder: self.ladder.clone(),
            channel: self.channel.clone(),
        }
    }
}

/// Full rating/progress state for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub learner_id: String,
    pub xp_total: i64,
    pub ratings: BTreeMap<Skill, SkillRating>,
    pub ladder: LadderProgress,
    pub channel: ChannelProgress,
}

/// An exercise result handed in by the conversational flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSubmission {
    pub learner_id: String,
    pub exercise_id: String,
    /// Observed score per skill, 0-100
    pub ratings: BTreeMap<Skill, f64>,
    pub severity: Severity,
    /// Raw XP suggestion from the exercise flow; sanitized before applying
    pub xp_hint: f64,
    pub kind: ObservationKind,
}

/// Before/after pair for one skill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillDelta {
    pub before: f64,
    pub after: f64,
}

impl SkillDelta {
    pub fn delta(&self) -> f64 {
        self.after - self.before
    }
}

/// Result of a completed exercise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseOutcome {
    pub skills: BTreeMap<Skill, SkillDelta>,
    pub xp_awarded: i64,
    pub xp_total: i64,
    pub snapshot: LearnerSnapshot,
}

/// Result of a ladder lesson pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSummary {
    pub already_passed: bool,
    pub level_advanced: bool,
    pub certified: bool,
    pub xp_awarded: i64,
    pub badge: Option<String>,
    pub snapshot: LearnerSnapshot,
}

/// Result of a channel selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSelectionOutcome {
    pub channel: Channel,
    /// False when the selection was already the stored value (no-op)
    pub changed: bool,
    pub snapshot: LearnerSnapshot,
}
