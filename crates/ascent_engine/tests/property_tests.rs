//! Property-style invariant sweeps over randomized inputs.
//!
//! Uses a small seeded xorshift generator rather than an external crate so
//! runs stay deterministic.
//!
//! Invariants:
//! - Sanitized normal deltas stay in [0, 100]; violation deltas in [-100, 0]
//! - Normal application never produces a negative total
//! - Decay-blend output always stays in [0, 100]
//! - The daily window never counts past its cap within one date key

use chrono::{DateTime, Duration, TimeZone, Utc};

use ascent_engine::core::{xp, DailyPassWindow, DecayBlend, Severity, SkillRating};

/// Simple pseudo-random number generator for test inputs (xorshift64)
struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    /// Uniform-ish float in [min, max)
    fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[test]
fn prop_sanitize_normal_stays_in_award_range() {
    let mut rng = TestRng::new(7);
    for _ in 0..2_000 {
        let raw = rng.next_range(-1e9, 1e9);
        let delta = xp::sanitize(raw, Severity::Normal);
        assert!((0..=100).contains(&delta), "raw {} -> {}", raw, delta);
    }
}

#[test]
fn prop_sanitize_violation_stays_in_penalty_range() {
    let mut rng = TestRng::new(11);
    for _ in 0..2_000 {
        let raw = rng.next_range(-1e9, 1e9);
        let delta = xp::sanitize(raw, Severity::BehaviorViolation);
        assert!((-100..=0).contains(&delta), "raw {} -> {}", raw, delta);
    }
}

#[test]
fn prop_normal_apply_never_negative() {
    let mut rng = TestRng::new(13);
    for _ in 0..2_000 {
        let total = (rng.next_range(-500.0, 5_000.0)) as i64;
        let delta = xp::sanitize(rng.next_range(-200.0, 200.0), Severity::Normal);
        assert!(xp::apply(total, delta, Severity::Normal) >= 0);
    }
}

#[test]
fn prop_decay_blend_output_in_valid_range() {
    let blend = DecayBlend::default();
    let mut rng = TestRng::new(17);
    for _ in 0..2_000 {
        let old = SkillRating {
            score: rng.next_range(0.0, 100.0),
            last_updated: at(0),
        };
        // Elapsed from slightly negative (clock skew) to three years.
        let elapsed = rng.next_range(-86_400.0, 3.0 * 365.0 * 86_400.0) as i64;
        let observed = rng.next_range(0.0, 100.0);
        let after = blend.update(&old, observed, at(elapsed));
        assert!(
            (0.0..=100.0).contains(&after),
            "score {} elapsed {} observed {} -> {}",
            old.score,
            elapsed,
            observed,
            after
        );
    }
}

#[test]
fn prop_decay_always_moves_toward_baseline() {
    let blend = DecayBlend::default();
    let mut rng = TestRng::new(23);
    for _ in 0..500 {
        let score = rng.next_range(0.0, 100.0);
        let old = SkillRating {
            score,
            last_updated: at(0),
        };
        let idle_days = rng.next_range(1.0, 400.0);
        let now = at((idle_days * 86_400.0) as i64);
        // Observation equal to the old score isolates the drift term.
        let after = blend.update(&old, score, now);
        let before_gap = (score - blend.baseline).abs();
        let after_gap = (after - blend.baseline).abs();
        assert!(
            after_gap <= before_gap + 1e-9,
            "gap widened: {} -> {}",
            before_gap,
            after_gap
        );
    }
}

#[test]
fn prop_daily_window_never_exceeds_cap() {
    let mut rng = TestRng::new(31);
    for cap in [1u32, 3, 5, 10] {
        let mut window = DailyPassWindow::default();
        let mut now = at(0);
        for _ in 0..200 {
            // Random walk forward in time, sometimes crossing midnight.
            now = now + Duration::minutes((rng.next_range(0.0, 600.0)) as i64);
            let _ = window.record(now, cap);
            assert!(window.count <= cap, "cap {} exceeded: {}", cap, window.count);
        }
    }
}
