use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use studyhub_client::{ClientConfig, ClientError};
use studyhub_shared::Level;

mod commands;

use commands::challenges::NewChallenge;
use commands::Context;

#[derive(Parser)]
#[command(name = "studyhub")]
#[command(about = "StudyHub+ challenges from the terminal")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides STUDYHUB_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List challenges
    List {
        /// Only challenges you created or joined
        #[arg(long)]
        mine: bool,
    },

    /// Show one challenge with its tasks and your progress
    Show { id: i64 },

    /// Join a challenge
    Join { id: i64 },

    /// Leave a challenge
    Leave { id: i64 },

    /// Mark one of your tasks done / not done
    Toggle { id: i64, task_index: usize },

    /// Show the progress leaderboard
    Leaderboard { id: i64 },

    /// Create a challenge
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Easy, Medium or Hard
        #[arg(long)]
        level: Option<Level>,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<NaiveDate>,
        /// YYYY-MM-DD
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        max_participants: Option<u32>,
        /// Repeat for each task
        #[arg(long = "task")]
        tasks: Vec<String>,
    },

    /// Delete a challenge you own
    Delete { id: i64 },

    /// Show the comment thread
    Comments {
        id: i64,
        /// Keep polling for new comments until Ctrl-C
        #[arg(long)]
        follow: bool,
    },

    /// Post a comment
    Comment { id: i64, text: String },

    /// Edit one of your comments
    EditComment { id: i64, comment: i64, text: String },

    /// Delete one of your comments
    DeleteComment { id: i64, comment: i64 },

    /// Record today's login and show the streak
    Streak,

    /// Record a finished focus session
    Focus {
        /// The session was paused at least once
        #[arg(long)]
        paused: bool,
        /// Number of breaks taken
        #[arg(long, default_value_t = 0)]
        breaks: u32,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    studyhub_client::init_tracing(cli.verbose);

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }

    let mut ctx = Context::new(config)?;
    let result = run(&mut ctx, cli.command).await;
    ctx.flush_notices();

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        // already shown to the user as a notice
        Err(e) if e.downcast_ref::<ClientError>().is_some() => {
            tracing::debug!(error = %e, "command failed");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}

async fn run(ctx: &mut Context, command: Commands) -> Result<()> {
    use commands::{challenges, comments, focus};

    match command {
        Commands::List { mine } => challenges::list(ctx, mine).await,
        Commands::Show { id } => challenges::show(ctx, id).await,
        Commands::Join { id } => challenges::join(ctx, id).await,
        Commands::Leave { id } => challenges::leave(ctx, id).await,
        Commands::Toggle { id, task_index } => challenges::toggle(ctx, id, task_index).await,
        Commands::Leaderboard { id } => challenges::leaderboard(ctx, id).await,
        Commands::Create {
            title,
            description,
            level,
            start,
            end,
            max_participants,
            tasks,
        } => {
            let new = NewChallenge {
                title,
                description,
                level,
                start,
                end,
                max_participants,
                tasks,
            };
            challenges::create(ctx, new).await
        }
        Commands::Delete { id } => challenges::delete(ctx, id).await,
        Commands::Comments { id, follow } => comments::list(ctx, id, follow).await,
        Commands::Comment { id, text } => comments::add(ctx, id, &text).await,
        Commands::EditComment { id, comment, text } => comments::edit(ctx, id, comment, &text).await,
        Commands::DeleteComment { id, comment } => comments::delete(ctx, id, comment).await,
        Commands::Streak => focus::streak(ctx),
        Commands::Focus { paused, breaks } => focus::session(ctx, paused, breaks),
    }
}
