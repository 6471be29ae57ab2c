//! Plant growth earned by focus sessions.

use serde::{Deserialize, Serialize};

/// Best score a single session can earn.
pub const MAX_SESSION_SCORE: u8 = 3;

/// Score for a completed focus session.
///
/// An uninterrupted session earns the full plant, a single break costs one
/// point, and anything more (or an explicit pause) leaves only a sprout.
pub fn session_score(paused: bool, breaks: u32) -> u8 {
    match (paused, breaks) {
        (false, 0) => 3,
        (false, 1) => 2,
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlantStage {
    Seed,
    Sprout,
    HalfGrown,
    FullGrown,
}

impl PlantStage {
    /// Stage for a growth fraction in `0.0..=1.0`.
    pub fn from_fraction(growth: f64) -> Self {
        if growth >= 1.0 {
            Self::FullGrown
        } else if growth >= 0.66 {
            Self::HalfGrown
        } else if growth >= 0.33 {
            Self::Sprout
        } else {
            Self::Seed
        }
    }

    pub fn from_score(score: u8) -> Self {
        Self::from_fraction(f64::from(score) / f64::from(MAX_SESSION_SCORE))
    }
}
