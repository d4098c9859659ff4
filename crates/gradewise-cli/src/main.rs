//! Gradewise CLI - student performance management from the terminal
//!
//! Log in as a teacher or student, manage subjects, classes, rosters and
//! grades, and follow recommendations.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gradewise_core::config::{ENV_API_URL, ENV_AUTH_URL, ENV_SESSION_PATH};
use gradewise_core::ClientConfig;

#[derive(Parser)]
#[command(name = "gradewise")]
#[command(author, version, about = "Student performance management CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Backend base URL (or set GRADEWISE_API_URL)
    #[arg(long, env = ENV_API_URL, global = true)]
    api_url: Option<String>,

    /// Identity provider base URL (or set GRADEWISE_AUTH_URL)
    #[arg(long, env = ENV_AUTH_URL, global = true)]
    auth_url: Option<String>,

    /// Override the session file (or set GRADEWISE_SESSION_PATH)
    #[arg(long, env = ENV_SESSION_PATH, global = true)]
    session_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, sign up, log out
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },

    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },

    /// Manage subjects
    Subjects {
        #[command(subcommand)]
        action: commands::subjects::SubjectAction,
    },

    /// Manage classes
    Classes {
        #[command(subcommand)]
        action: commands::classes::ClassAction,
    },

    /// Manage class rosters
    Roster {
        #[command(subcommand)]
        action: commands::roster::RosterAction,
    },

    /// Record grades and view summaries
    Grades {
        #[command(subcommand)]
        action: commands::grades::GradeAction,
    },

    /// Read recommendations
    Recommendations {
        #[command(subcommand)]
        action: commands::recommendations::RecommendationAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Flags win over the environment; pass them on the same way
    if let Some(url) = &cli.api_url {
        std::env::set_var(ENV_API_URL, url);
    }
    if let Some(url) = &cli.auth_url {
        std::env::set_var(ENV_AUTH_URL, url);
    }
    if let Some(path) = &cli.session_file {
        std::env::set_var(ENV_SESSION_PATH, path);
    }

    let config = ClientConfig::from_env()?;
    config.validate()?;
    log::debug!("[cli] API at {}, session at {}", config.api_base_url, config.session_path.display());

    let mut ctx = commands::Context::new(config, cli.format, cli.quiet)?;

    match cli.command {
        Commands::Auth { action } => commands::auth::execute(&mut ctx, action).await,
        Commands::Profile { action } => commands::profile::execute(&mut ctx, action).await,
        Commands::Subjects { action } => commands::subjects::execute(&ctx, action).await,
        Commands::Classes { action } => commands::classes::execute(&ctx, action).await,
        Commands::Roster { action } => commands::roster::execute(&ctx, action).await,
        Commands::Grades { action } => commands::grades::execute(&ctx, action).await,
        Commands::Recommendations { action } => {
            commands::recommendations::execute(&ctx, action).await
        }
        Commands::Config { action } => commands::config::execute(&ctx, action).await,
    }
}
