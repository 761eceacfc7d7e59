//! Feature gates.
//!
//! Each gate is enabled or disabled per organization; a learner has access
//! when any of their organizations enables it. Flags are re-read inside every
//! mutating transaction, never cached across calls.

use serde::{Deserialize, Serialize};

/// A gateable engine feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Interactive exercise completions (rating + XP updates)
    Exercises,
    /// The 10-level base ladder
    BaseLadder,
    /// The 5-level channel-branching ladder
    ChannelLadder,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exercises => "exercises",
            Self::BaseLadder => "base_ladder",
            Self::ChannelLadder => "channel_ladder",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
