//! Coached skill dimensions.
//!
//! Every interactive exercise scores the learner on some subset of these six
//! skills; the engine tracks one rating record per skill.

use serde::{Deserialize, Serialize};

/// A coached conversational skill
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Empathy,
    Listening,
    Trust,
    FollowUp,
    Closing,
    Relationship,
}

/// All skills in canonical order (also drives deterministic lesson assignment)
pub const ALL_SKILLS: [Skill; 6] = [
    Skill::Empathy,
    Skill::Listening,
    Skill::Trust,
    Skill::FollowUp,
    Skill::Closing,
    Skill::Relationship,
];

impl Skill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empathy => "empathy",
            Self::Listening => "listening",
            Self::Trust => "trust",
            Self::FollowUp => "follow_up",
            Self::Closing => "closing",
            Self::Relationship => "relationship",
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_skills_distinct() {
        for (i, a) in ALL_SKILLS.iter().enumerate() {
            for b in &ALL_SKILLS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for skill in ALL_SKILLS {
            let json = serde_json::to_string(&skill).unwrap();
            assert_eq!(json, format!("\"{}\"", skill.as_str()));
        }
    }
}
