mod cmd;
mod config;
mod dry_run;
mod output;

use clap::{Parser, Subcommand};
use config::BotConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tepbot",
    about = "Keep TEP tracking issues and PR reminders in sync with the proposals",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML config file (API base URL, bot user, tracking label, paging)
    #[arg(long, global = true, env = "TEPBOT_CONFIG")]
    config: Option<PathBuf>,

    /// GitHub token; empty means anonymous access
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass for a pull request event
    Reconcile {
        /// JSON file holding the event parameters
        #[arg(long)]
        event: PathBuf,

        /// Read from GitHub but only log the writes
        #[arg(long)]
        dry_run: bool,
    },

    /// List the proposals in a local index document
    Proposals {
        /// Path to the index document (teps/README.md)
        #[arg(long)]
        index: PathBuf,

        /// Only show proposals with this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Parse one proposal document's front-matter
    Proposal { file: PathBuf },

    /// Show the fields tracked in a tracking issue body
    IssueBody { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Reconcile { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Reconcile { event, dry_run } => BotConfig::load(cli.config.as_deref())
            .and_then(|config| {
                cmd::reconcile::run(&config, cli.github_token, &event, dry_run, cli.json)
            }),
        Commands::Proposals { index, status } => {
            cmd::proposals::run(&index, status.as_deref(), cli.json)
        }
        Commands::Proposal { file } => cmd::proposal::run(&file, cli.json),
        Commands::IssueBody { file } => cmd::issue_body::run(&file, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
