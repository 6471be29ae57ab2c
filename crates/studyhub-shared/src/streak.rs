//! Daily login streak rule.
//!
//! Same calendar day leaves the streak alone, the next day extends it, and
//! any longer gap starts over at 1.

use chrono::NaiveDate;

/// Outcome of applying today's login to the stored streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub count: u32,
    /// Whether the stored values must be written back.
    pub changed: bool,
}

pub fn next_streak(last_login: Option<NaiveDate>, count: Option<u32>, today: NaiveDate) -> StreakUpdate {
    let Some(last) = last_login else {
        return StreakUpdate { count: 1, changed: true };
    };

    match (today - last).num_days() {
        // same day, or the clock went backwards
        gap if gap < 1 => match count {
            Some(n) if n > 0 => StreakUpdate { count: n, changed: false },
            _ => StreakUpdate { count: 1, changed: true },
        },
        1 => StreakUpdate {
            count: count.unwrap_or(0).saturating_add(1),
            changed: true,
        },
        _ => StreakUpdate { count: 1, changed: true },
    }
}
