//! Login streak and focus-session plant growth, kept in the local store.

use anyhow::Result;
use chrono::Local;

use studyhub_shared::growth::{session_score, PlantStage};

use super::Context;

pub fn streak(ctx: &Context) -> Result<()> {
    let counters = ctx.counters()?;
    let count = counters.record_login(Local::now().date_naive())?;
    let growth = counters.plant_growth()?;

    println!("🔥 {count} day streak");
    println!("🌱 last session: {:?} ({growth}/3)", PlantStage::from_score(growth));
    Ok(())
}

/// Record the outcome of a finished focus session.
pub fn session(ctx: &Context, paused: bool, breaks: u32) -> Result<()> {
    let counters = ctx.counters()?;
    counters.reset_plant_growth()?;
    let score = session_score(paused, breaks);
    counters.set_plant_growth(score)?;

    println!("🌱 {:?} ({score}/3)", PlantStage::from_score(score));
    Ok(())
}
