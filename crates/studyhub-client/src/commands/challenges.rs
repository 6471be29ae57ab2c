use anyhow::{bail, Result};
use chrono::NaiveDate;

use studyhub_client::{SkipReason, TaskToggle};
use studyhub_shared::protocol::ChallengeDraft;
use studyhub_shared::{Challenge, ChallengeId, Level, TaskRef, UserId};

use super::Context;

pub async fn list(ctx: &Context, mine: bool) -> Result<()> {
    ctx.reconciler.refresh().await?;
    let challenges = if mine {
        if ctx.reconciler.session().user_id().is_none() {
            bail!("Please login first");
        }
        ctx.reconciler.my_challenges()
    } else {
        ctx.reconciler.challenges()
    };

    if challenges.is_empty() {
        println!("No challenges.");
        return Ok(());
    }
    let viewer = ctx.reconciler.session().user_id();
    for c in &challenges {
        println!("{}", summary_line(c, viewer));
    }
    Ok(())
}

pub async fn show(ctx: &Context, id: i64) -> Result<()> {
    let c = ctx.reconciler.open(ChallengeId(id)).await?;
    let viewer = ctx.reconciler.session().user_id();

    println!("{}", summary_line(&c, viewer));
    if let Some(desc) = c.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  {desc}");
    }
    if !c.creator_name.is_empty() {
        println!("  by {}", c.creator_name);
    }
    if let (Some(start), Some(end)) = (c.start_date, c.end_date) {
        println!("  {start} → {end}");
    }
    if !c.participant_names.is_empty() {
        println!("  members: {}", c.participant_names.join(", "));
    }
    println!("  group progress: {:.0}%", c.group_progress);

    let flags = viewer
        .and_then(|u| c.progress.get(&u))
        .and_then(|p| p.flags.clone())
        .unwrap_or_default();
    for (i, task) in c.tasks.iter().enumerate() {
        let done = flags.get(i).copied().unwrap_or(task.done);
        println!("  [{}] {i}. {}", if done { "x" } else { " " }, task.title);
    }
    if let Some(user) = viewer.filter(|u| c.is_member(*u)) {
        println!("  your progress: {:.0}%", c.user_percent(user));
    }
    Ok(())
}

pub async fn join(ctx: &Context, id: i64) -> Result<()> {
    load(ctx, id).await?;
    ctx.reconciler.join(ChallengeId(id)).await?;
    Ok(())
}

pub async fn leave(ctx: &Context, id: i64) -> Result<()> {
    load(ctx, id).await?;
    ctx.reconciler.leave(ChallengeId(id)).await?;
    Ok(())
}

pub async fn toggle(ctx: &Context, id: i64, task_index: usize) -> Result<()> {
    load(ctx, id).await?;
    match ctx
        .reconciler
        .toggle_task(ChallengeId(id), TaskRef::Index(task_index))
        .await?
    {
        TaskToggle::Applied => {
            if let (Some(c), Some(user)) = (
                ctx.reconciler.challenge(ChallengeId(id)),
                ctx.reconciler.session().user_id(),
            ) {
                println!("Progress: {:.0}% (group {:.0}%)", c.user_percent(user), c.group_progress);
            }
        }
        TaskToggle::Skipped(SkipReason::NotMember) => println!("Join the challenge to track tasks."),
        TaskToggle::Skipped(SkipReason::Ended) => println!("This challenge has ended."),
        TaskToggle::Skipped(SkipReason::UnknownTask) => println!("No task #{task_index}."),
    }
    Ok(())
}

pub async fn leaderboard(ctx: &Context, id: i64) -> Result<()> {
    let rows = ctx.reconciler.leaderboard(ChallengeId(id)).await?;
    if rows.is_empty() {
        println!("No participants yet.");
    }
    for (rank, row) in rows.iter().enumerate() {
        println!("{:>3}. {:<24} {:>6.1}%", rank + 1, row.name, row.progress);
    }
    Ok(())
}

pub struct NewChallenge {
    pub title: String,
    pub description: Option<String>,
    pub level: Option<Level>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub max_participants: Option<u32>,
    pub tasks: Vec<String>,
}

pub async fn create(ctx: &Context, new: NewChallenge) -> Result<()> {
    if new.title.trim().is_empty() {
        bail!("Title is required");
    }
    if let (Some(start), Some(end)) = (new.start, new.end) {
        if end < start {
            bail!("End date must not be before start date");
        }
    }
    let draft = ChallengeDraft {
        title: new.title.trim().to_string(),
        description: new.description,
        level: new.level,
        // filled from the session by the reconciler
        creator_id: UserId(0),
        creator_name: String::new(),
        start_date: new.start,
        end_date: new.end,
        max_participants: new.max_participants,
        tasks: new.tasks,
    };
    ctx.reconciler.create(draft).await?;
    Ok(())
}

pub async fn delete(ctx: &Context, id: i64) -> Result<()> {
    ctx.reconciler.delete(ChallengeId(id)).await?;
    Ok(())
}

/// Join/leave/toggle act on the loaded copy, so fetch it first.
async fn load(ctx: &Context, id: i64) -> Result<()> {
    ctx.reconciler.open(ChallengeId(id)).await?;
    Ok(())
}

fn summary_line(c: &Challenge, viewer: Option<UserId>) -> String {
    let capacity = match c.max_participants {
        Some(max) if max > 0 => format!("{}/{max}", c.participants_count),
        _ => c.participants_count.to_string(),
    };
    let mut marks = Vec::new();
    if let Some(user) = viewer {
        if c.is_owner(user) {
            marks.push("owner");
        } else if c.is_member(user) {
            marks.push("joined");
        }
    }
    if c.is_full() {
        marks.push("full");
    }
    let level = c.level.map(|l| format!(" [{l}]")).unwrap_or_default();
    let marks = if marks.is_empty() {
        String::new()
    } else {
        format!(" ({})", marks.join(", "))
    };
    format!(
        "#{:<4} {}{level}  {}  {capacity} members{marks}",
        c.id, c.title, c.status
    )
}
