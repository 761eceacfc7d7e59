//! Channel-branching ladder catalog (5 levels).
//!
//! Level 2 splits into a primary and a secondary communication-channel phase.
//! The secondary phase pays out of a flat bonus pool rather than the
//! level-scaled formula: secondary-channel mastery is worth a fixed bonus,
//! not a level-scaled one. Do not fold the two formulas together.

use serde::{Deserialize, Serialize};

use crate::ladder::{Phase, PhaseKey};
use crate::skills::{Skill, ALL_SKILLS};

/// Number of levels in the channel ladder
pub const CHANNEL_LEVELS: u8 = 5;

/// Level-1 total XP reward
pub const CHANNEL_LEVEL_XP: i64 = 30;

/// Additional XP per level tier
pub const CHANNEL_TIER_XP: i64 = 10;

/// Flat pool split across the level-2 secondary phase lessons
pub const SECONDARY_BONUS_POOL: i64 = 80;

/// Lessons in the level-2 primary phase
pub const PRIMARY_PHASE_LESSONS: usize = 6;

/// Lessons in the level-2 secondary phase
pub const SECONDARY_PHASE_LESSONS: usize = 4;

/// Lessons in every non-branching level
pub const CORE_LEVEL_LESSONS: usize = 6;

/// A customer-contact channel a learner can specialize in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Phone,
    Email,
    Sms,
    Video,
    Chat,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Video => "video",
            Self::Chat => "chat",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which branch of level 2 the learner is working through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum L2Phase {
    Primary,
    Secondary,
}

impl L2Phase {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Primary => Phase::Primary,
            Self::Secondary => Phase::Secondary,
        }
    }
}

/// A derived channel-ladder lesson slot. Never stored, so only serialized
/// outward.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelLesson {
    pub id: String,
    pub level: u8,
    pub phase: Phase,
    pub skill: Skill,
}

fn lesson_count(key: PhaseKey) -> usize {
    match (key.level, key.phase) {
        (2, Phase::Primary) => PRIMARY_PHASE_LESSONS,
        (2, Phase::Secondary) => SECONDARY_PHASE_LESSONS,
        _ => CORE_LEVEL_LESSONS,
    }
}

/// Deterministic lesson id from (level, phase, skill index)
pub fn lesson_id(level: u8, phase: Phase, skill_idx: usize) -> String {
    format!("c{:02}-{}-s{}", level, phase, skill_idx)
}

/// Ordered lessons unlocked at a position
pub fn lessons_for(key: PhaseKey) -> Vec<ChannelLesson> {
    (0..lesson_count(key))
        .map(|i| {
            let skill_idx = i % ALL_SKILLS.len();
            ChannelLesson {
                id: lesson_id(key.level, key.phase, skill_idx),
                level: key.level,
                phase: key.phase,
                skill: ALL_SKILLS[skill_idx],
            }
        })
        .collect()
}

/// Ordered lesson ids unlocked at a position
pub fn lesson_ids_for(key: PhaseKey) -> Vec<String> {
    lessons_for(key).into_iter().map(|l| l.id).collect()
}

/// Total XP reward for a level, before division across its lessons
pub fn level_reward(level: u8) -> i64 {
    CHANNEL_LEVEL_XP + i64::from(level.saturating_sub(1)) * CHANNEL_TIER_XP
}

/// XP for one lesson pass at a position: the level reward divided evenly by
/// lesson count, except the level-2 secondary phase which draws from the
/// flat bonus pool divided by its own lesson count.
pub fn xp_per_lesson(key: PhaseKey) -> i64 {
    match (key.level, key.phase) {
        (2, Phase::Secondary) => SECONDARY_BONUS_POOL / SECONDARY_PHASE_LESSONS as i64,
        _ => level_reward(key.level) / lesson_count(key) as i64,
    }
}

/// Badge id for finishing a channel-ladder level
pub fn badge_for_level(level: u8, certified: bool) -> String {
    if certified {
        "channel-certified".to_string()
    } else {
        format!("channel-level-{:02}", level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_lesson_counts() {
        assert_eq!(
            lesson_ids_for(PhaseKey {
                level: 2,
                phase: Phase::Primary
            })
            .len(),
            PRIMARY_PHASE_LESSONS
        );
        assert_eq!(
            lesson_ids_for(PhaseKey {
                level: 2,
                phase: Phase::Secondary
            })
            .len(),
            SECONDARY_PHASE_LESSONS
        );
        assert_eq!(lesson_ids_for(PhaseKey::core(1)).len(), CORE_LEVEL_LESSONS);
        assert_eq!(lesson_ids_for(PhaseKey::core(5)).len(), CORE_LEVEL_LESSONS);
    }

    #[test]
    fn test_secondary_pool_is_flat_not_level_scaled() {
        let secondary = PhaseKey {
            level: 2,
            phase: Phase::Secondary,
        };
        assert_eq!(
            xp_per_lesson(secondary),
            SECONDARY_BONUS_POOL / SECONDARY_PHASE_LESSONS as i64
        );
        // The standard formula for level 2 would give a different figure.
        let primary = PhaseKey {
            level: 2,
            phase: Phase::Primary,
        };
        assert_eq!(
            xp_per_lesson(primary),
            level_reward(2) / PRIMARY_PHASE_LESSONS as i64
        );
        assert_ne!(xp_per_lesson(secondary), xp_per_lesson(primary));
    }

    #[test]
    fn test_level_reward_increases() {
        for level in 1..CHANNEL_LEVELS {
            assert!(level_reward(level + 1) > level_reward(level));
        }
    }

    #[test]
    fn test_lesson_ids_distinguish_phases() {
        let primary = lesson_ids_for(PhaseKey {
            level: 2,
            phase: Phase::Primary,
        });
        let secondary = lesson_ids_for(PhaseKey {
            level: 2,
            phase: Phase::Secondary,
        });
        for id in &secondary {
            assert!(!primary.contains(id));
        }
        assert!(primary[0].starts_with("c02-primary-"));
        assert!(secondary[0].starts_with("c02-secondary-"));
    }

    #[test]
    fn test_badges() {
        assert_eq!(badge_for_level(2, false), "channel-level-02");
        assert_eq!(badge_for_level(5, true), "channel-certified");
    }
}
