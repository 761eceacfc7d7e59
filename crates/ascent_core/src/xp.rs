//! XP sanitization and ledger arithmetic.
//!
//! Two severity classes with asymmetric rules:
//! - `normal` deltas are rounded and clamped to [0, 100]; applying them never
//!   drives the total below zero.
//! - `behavior_violation` deltas can only penalize: positive values are forced
//!   to 0, negatives are clamped to [-100, 0], and the zero floor is removed
//!   on application so disciplinary history stays visible in the total.

use serde::{Deserialize, Serialize};

/// Largest XP award a single completion can produce
pub const MAX_AWARD: i64 = 100;

/// Largest penalty a single violation can apply
pub const MAX_PENALTY: i64 = 100;

/// Severity class of an XP delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    BehaviorViolation,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::BehaviorViolation => "behavior_violation",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "behavior_violation" => Ok(Self::BehaviorViolation),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// Clamp a raw XP delta into the legal range for its severity class
pub fn sanitize(raw: f64, severity: Severity) -> i64 {
    // NaN rounds to 0 via the saturating cast; infinities saturate and are
    // clamped below.
    let rounded = raw.round() as i64;
    match severity {
        Severity::Normal => rounded.clamp(0, MAX_AWARD),
        Severity::BehaviorViolation => {
            if rounded > 0 {
                // Violations cannot award XP.
                0
            } else {
                rounded.clamp(-MAX_PENALTY, 0)
            }
        }
    }
}

/// Apply a sanitized delta to a ledger total.
///
/// Normal accrual floors at zero; violation penalties do not.
pub fn apply(total: i64, delta: i64, severity: Severity) -> i64 {
    match severity {
        Severity::Normal => total.saturating_add(delta).max(0),
        Severity::BehaviorViolation => total.saturating_add(delta),
    }
}
