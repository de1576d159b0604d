//! FieldTrack operator CLI.
//!
//! Seeds sample data, prints team reports, exports CSV, checks how a pasted
//! lead message parses and follows a user's live dashboard.

mod commands;
mod error;
mod state;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use field_sync::SyncConfig;
use field_view::{StatusFilter, TimeRange};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "fieldtrack")]
#[command(about = "FieldTrack installation lead tracking: operator tools")]
struct Cli {
    /// Database URL (overrides FIELDTRACK_DATABASE_URL)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Team scope and filter selections shared by report and export.
#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Team to report on (defaults to every team)
    #[arg(long)]
    team: Option<String>,

    /// Time range: today, week, month or all
    #[arg(long, default_value = "month")]
    range: TimeRange,

    /// Job status filter, or "all"
    #[arg(long, default_value = "all")]
    status: StatusFilter,

    /// Search over name, contact, road and address
    #[arg(long, default_value = "")]
    search: String,

    /// Drill down to one agent uid
    #[arg(long)]
    agent: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fill the store with sample teams, supervisors, agents and leads
    Seed {
        /// Records per agent
        #[arg(long, default_value_t = 20)]
        per_agent: usize,

        /// Spread records over this many past days
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Print KPIs, the leaderboard and per-agent activity
    Report {
        #[command(flatten)]
        view: ViewArgs,

        /// Print the rendered view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the filtered record list as CSV
    Export {
        #[command(flatten)]
        view: ViewArgs,

        /// Output file (defaults to FiberTrack_Export_<date>.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show how a pasted lead message would fill a new record
    Parse {
        /// Message file, or "-" for stdin
        file: PathBuf,
    },

    /// Follow a user's live dashboard
    Watch {
        /// User id to sign in as
        #[arg(long)]
        uid: String,

        /// Email for the restored identity
        #[arg(long, default_value = "")]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = SyncConfig::from_env()?;
    if let Some(database) = cli.database {
        config.database_url = database;
    }

    match cli.command {
        // Parsing needs no store.
        Command::Parse { file } => commands::parse::run(&file)?,
        command => {
            let state = AppState::connect(config).await?;
            match command {
                Command::Seed { per_agent, days } => {
                    commands::seed::run(&state, per_agent, days).await?
                }
                Command::Report { view, json } => commands::report::run(&state, &view, json).await?,
                Command::Export { view, out } => commands::export::run(&state, &view, out).await?,
                Command::Watch { uid, email } => commands::watch::run(&state, uid, email).await?,
                Command::Parse { file } => commands::parse::run(&file)?,
            }
            state.store.close().await;
        }
    }

    Ok(())
}
