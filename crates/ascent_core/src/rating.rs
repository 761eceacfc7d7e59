//! Decay-blend rating updates.
//!
//! Skills that go unpracticed drift back toward a neutral baseline instead of
//! staying frozen; a new observation is then blended in with a fixed weight so
//! a single exercise never overwhelms history.
//!
//! All functions here are pure. `now` is always injected, never read from a
//! global clock, so decay curves are deterministic under test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Neutral score an unpracticed skill reverts toward
pub const BASELINE_SCORE: f64 = 60.0;

/// Per-skill rating record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRating {
    /// Current score, always within [0, 100]
    pub score: f64,
    /// When the score was last updated
    pub last_updated: DateTime<Utc>,
}

impl SkillRating {
    /// Record created lazily on a learner's first observation of a skill
    pub fn baseline(now: DateTime<Utc>) -> Self {
        Self {
            score: BASELINE_SCORE,
            last_updated: now,
        }
    }
}

/// How an observed score folds into the existing rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    /// Normal exercise completion: decay toward baseline, then blend
    Standard,
    /// One-time calibration that sets the rating to the observed score
    /// directly, bypassing decay-blend entirely
    BaselineAssessment,
}

/// Decay-blend tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayBlend {
    /// Score the rating reverts toward over time
    pub baseline: f64,
    /// Exponential reversion rate per elapsed day
    pub lambda_per_day: f64,
    /// Weight of the new observation in the blend (< 1)
    pub alpha: f64,
}

impl Default for DecayBlend {
    fn default() -> Self {
        Self {
            baseline: BASELINE_SCORE,
            lambda_per_day: 0.05,
            alpha: 0.3,
        }
    }
}

impl DecayBlend {
    /// Drift the old score toward baseline for the elapsed time, then blend
    /// the new observation. Result is clamped to [0, 100].
    pub fn update(&self, old: &SkillRating, observed: f64, now: DateTime<Utc>) -> f64 {
        // Clock skew can make the record look newer than `now`; treat that as
        // zero elapsed time rather than amplifying the score.
        let delta_days =
            ((now - old.last_updated).num_seconds() as f64 / 86_400.0).max(0.0);
        let drifted = self.baseline
            + (old.score - self.baseline) * (-self.lambda_per_day * delta_days).exp();
        let after = (1.0 - self.alpha) * drifted + self.alpha * observed;
        after.clamp(0.0, 100.0)
    }

    /// Apply one observation, producing the updated record
    pub fn observe(
        &self,
        old: &SkillRating,
        observed: f64,
        kind: ObservationKind,
        now: DateTime<Utc>,
    ) -> SkillRating {
        let score = match kind {
            ObservationKind::BaselineAssessment => observed.clamp(0.0, 100.0),
            ObservationKind::Standard => self.update(old, observed, now),
        };
        SkillRating {
            score,
            last_updated: now,
        }
    }
}
