//! Shield Control - command-line driver for incident risk reports.

mod commands;
mod display;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shieldctl")]
#[command(about = "Shield - six-step incident risk assessment", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/shield/config.toml, then /etc/shield/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report for an incident description
    Analyze {
        /// Free-text description of the incident
        #[arg(required = true)]
        issue: Vec<String>,

        /// Handbook sections (TOML [[section]] tables)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Use the document in FILE instead of calling the service
        #[arg(long, value_name = "FILE")]
        offline: Option<PathBuf>,

        /// Store the report in the archive
        #[arg(long)]
        archive: bool,

        /// Show every step at once instead of revealing them one by one
        #[arg(long)]
        open_all: bool,
    },

    /// Show a canned walkthrough report (parent-complaint, faculty-leave)
    Scenario {
        key: String,

        /// Store the report in the archive
        #[arg(long)]
        archive: bool,
    },

    /// Browse archived reports
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },

    /// Print the response schema sent to the generation service
    Schema,

    /// Print the generation instruction for an issue
    Prompt {
        #[arg(required = true)]
        issue: Vec<String>,

        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ReportsAction {
    /// List archived reports, newest first
    List,
    /// Replay one archived report
    Show { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    shield_common::logging::init(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Analyze {
            issue,
            corpus,
            offline,
            archive,
            open_all,
        } => {
            let opts = commands::AnalyzeOptions {
                corpus,
                offline,
                archive,
                open_all,
            };
            commands::analyze(config, &issue.join(" "), opts).await
        }
        Commands::Scenario { key, archive } => commands::scenario(config, &key, archive),
        Commands::Reports { action } => match action {
            ReportsAction::List => commands::reports_list(config),
            ReportsAction::Show { id } => commands::reports_show(config, &id),
        },
        Commands::Schema => commands::schema(),
        Commands::Prompt { issue, corpus } => commands::prompt(config, &issue.join(" "), corpus),
    }
}
