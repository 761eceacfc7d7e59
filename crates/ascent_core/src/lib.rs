//! Core domain logic for the ascent coaching engine.
//!
//! Everything in this crate is pure and side-effect free: rating decay-blend
//! math, XP sanitization, ladder catalogs, and the progression state
//! machines. These are safe to call outside a transaction for previews and
//! estimates. The transactional SQLite engine lives in `ascent_engine`.

pub mod catalog;
pub mod channel;
pub mod channel_progress;
pub mod error;
pub mod gate;
pub mod ladder;
pub mod progress;
pub mod rating;
pub mod skills;
pub mod state;
pub mod xp;

pub use channel::{Channel, L2Phase};
pub use channel_progress::ChannelProgress;
pub use error::CoachError;
pub use gate::Feature;
pub use ladder::{DailyPassWindow, LadderSpec, Phase, PhaseKey};
pub use progress::{LadderProgress, LessonPassResult, DEFAULT_DAILY_PASS_CAP};
pub use rating::{DecayBlend, ObservationKind, SkillRating, BASELINE_SCORE};
pub use skills::{Skill, ALL_SKILLS};
pub use state::{
    ChannelSelectionOutcome, ExerciseOutcome, ExerciseSubmission, LearnerSnapshot, LearnerState,
    PassSummary, SkillDelta,
};
pub use xp::Severity;
