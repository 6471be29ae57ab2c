use std::time::Duration;

use anyhow::Result;

use studyhub_shared::{ChallengeId, Comment, CommentId};

use super::Context;

pub async fn list(ctx: &mut Context, id: i64, follow: bool) -> Result<()> {
    let thread = ctx.comment_thread(ChallengeId(id));
    thread.refresh().await?;
    print_thread(&thread.comments());

    if !follow {
        return Ok(());
    }

    let every = ctx.config.comment_poll_interval;
    thread.start_polling(every);
    let mut seen = thread.comments();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        let now = thread.comments();
        if now != seen {
            for c in now.iter().filter(|c| !seen.iter().any(|s| s.id == c.id)) {
                print_comment(c);
            }
            seen = now;
        }
        ctx.flush_notices();
    }
    thread.close();
    Ok(())
}

pub async fn add(ctx: &Context, id: i64, text: &str) -> Result<()> {
    let thread = ctx.comment_thread(ChallengeId(id));
    thread.add(text).await?;
    Ok(())
}

pub async fn edit(ctx: &Context, id: i64, comment: i64, text: &str) -> Result<()> {
    let thread = ctx.comment_thread(ChallengeId(id));
    thread.edit(CommentId(comment), text).await?;
    Ok(())
}

pub async fn delete(ctx: &Context, id: i64, comment: i64) -> Result<()> {
    let thread = ctx.comment_thread(ChallengeId(id));
    thread.delete(CommentId(comment)).await?;
    Ok(())
}

fn print_thread(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No comments yet.");
    }
    for c in comments {
        print_comment(c);
    }
}

fn print_comment(c: &Comment) {
    let when = c
        .timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!("#{} {} {when}\n    {}", c.id, c.user_name, c.content);
}
