use std::path::PathBuf;
use std::process::ExitCode;

use blogapi::config::{MigrationConfig, DEFAULT_SECTION};
use blogapi::migrations::env::{run, Command, Outcome, RunMode};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};

/// Apply or render the schema migrations embedded in this build
#[derive(Parser)]
#[command(author, version)]
struct Cli {
    /// Configuration file, defaults to ./migrations.toml if it exists
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Section of the configuration file to read
    #[arg(short, long, default_value = DEFAULT_SECTION)]
    section: String,

    /// Database url, overrides the configuration file and DATABASE_URL
    #[arg(long)]
    url: Option<String>,

    /// Print the SQL to stdout instead of connecting to the database
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration (default)
    Upgrade,
    /// Revert the most recently applied migration
    Downgrade,
    /// Compare the live schema against the declared tables
    Check,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let command = match cli.command {
        None | Some(Commands::Upgrade) => Command::Upgrade,
        Some(Commands::Downgrade) => Command::Downgrade,
        Some(Commands::Check) => Command::Check,
    };

    let config = match MigrationConfig::load(cli.config.as_deref(), &cli.section) {
        Ok(config) => match cli.url {
            Some(url) => config.with_url(url),
            None => config,
        },
        Err(e) => {
            error!("Could not load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&config, RunMode::from_offline_flag(cli.offline), command) {
        Ok(Outcome::Script(sql)) => print!("{}", sql),
        Ok(Outcome::Upgraded(report)) => {
            if report.applied.is_empty() {
                info!("Database is up to date");
            }
        }
        Ok(Outcome::Downgraded(migration)) => {
            info!("Reverted {} ({})", migration.version, migration.name);
        }
        Ok(Outcome::Checked(drift)) => {
            if drift.is_empty() {
                info!("Live schema matches the declared tables");
            } else {
                for entry in &drift {
                    warn!("{}", entry);
                }
                return ExitCode::FAILURE;
            }
        }
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
