//! Engine tuning.
//!
//! Behavioral knobs with built-in defaults, overridable from a TOML file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ascent_core::{DecayBlend, DEFAULT_DAILY_PASS_CAP};

/// Default transaction retry budget for write conflicts
pub const DEFAULT_MAX_TX_RETRIES: u32 = 3;

/// Engine tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Base-ladder lesson passes allowed per UTC day
    pub daily_pass_cap: u32,
    /// Attempts before a write conflict is surfaced to the caller
    pub max_tx_retries: u32,
    /// Decay-blend rating parameters
    pub rating: DecayBlend,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            daily_pass_cap: DEFAULT_DAILY_PASS_CAP,
            max_tx_retries: DEFAULT_MAX_TX_RETRIES,
            rating: DecayBlend::default(),
        }
    }
}

impl Tuning {
    /// Load tuning from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tuning file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse tuning file {}", path.display()))
    }

    /// Load tuning, falling back to defaults when the file is missing or
    /// malformed
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(tuning) => tuning,
            Err(e) => {
                warn!("ignoring unreadable tuning file: {:#}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_defaults() {
        let tuning = Tuning::default();
        assert_eq!(tuning.daily_pass_cap, 5);
        assert_eq!(tuning.max_tx_retries, 3);
        assert!((tuning.rating.baseline - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuning.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "daily_pass_cap = 8").unwrap();

        let tuning = Tuning::load(&path).unwrap();
        assert_eq!(tuning.daily_pass_cap, 8);
        assert_eq!(tuning.max_tx_retries, 3);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let tuning = Tuning::load_or_default("/nonexistent/tuning.toml");
        assert_eq!(tuning.daily_pass_cap, 5);
    }

    #[test]
    fn test_nested_rating_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tuning.toml");
        std::fs::write(&path, "[rating]\nalpha = 0.5\n").unwrap();

        let tuning = Tuning::load(&path).unwrap();
        assert!((tuning.rating.alpha - 0.5).abs() < 1e-9);
        assert!((tuning.rating.lambda_per_day - 0.05).abs() < 1e-9);
    }
}
