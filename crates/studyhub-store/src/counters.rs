//! The two durable counters the client keeps: the daily login streak and
//! the growth score of the last focus session.
//!
//! Each operation is an explicit read / compare / write against the
//! [`KvStore`]. Unparseable stored values are treated as absent.

use chrono::NaiveDate;
use tracing::{debug, warn};

use studyhub_shared::constants::{KEY_LAST_LOGIN, KEY_PLANT_GROWTH, KEY_STREAK_COUNT};
use studyhub_shared::growth::MAX_SESSION_SCORE;
use studyhub_shared::streak::next_streak;

use crate::error::Result;
use crate::kv::KvStore;

pub struct Counters<S> {
    store: S,
}

impl<S: KvStore> Counters<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a login on `today` and return the resulting streak.
    pub fn record_login(&self, today: NaiveDate) -> Result<u32> {
        let last = self.read::<NaiveDate>(KEY_LAST_LOGIN)?;
        let count = self.read::<u32>(KEY_STREAK_COUNT)?;

        let update = next_streak(last, count, today);
        if update.changed {
            self.store.set(KEY_STREAK_COUNT, &update.count.to_string())?;
            self.store.set(KEY_LAST_LOGIN, &today.to_string())?;
            debug!(streak = update.count, %today, "login streak updated");
        }
        Ok(update.count)
    }

    /// Current streak without recording a login.
    pub fn streak(&self) -> Result<u32> {
        Ok(self.read::<u32>(KEY_STREAK_COUNT)?.unwrap_or(0))
    }

    /// Score of the last focus session (0 while a session is running).
    pub fn plant_growth(&self) -> Result<u8> {
        Ok(self
            .read::<u8>(KEY_PLANT_GROWTH)?
            .map_or(0, |g| g.min(MAX_SESSION_SCORE)))
    }

    pub fn set_plant_growth(&self, score: u8) -> Result<()> {
        let score = score.min(MAX_SESSION_SCORE);
        self.store.set(KEY_PLANT_GROWTH, &score.to_string())
    }

    /// Called when a new focus session starts.
    pub fn reset_plant_growth(&self) -> Result<()> {
        self.set_plant_growth(0)
    }

    fn read<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparseable stored value");
                Ok(None)
            }
        }
    }
}
