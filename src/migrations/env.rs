//! Entry point of a migration run.
//!
//! One invocation picks a mode once: offline renders SQL for the configured
//! url without connecting, online opens a single unpooled connection and
//! applies everything inside one transaction.

use log::info;

use super::{check, downgrade, upgrade, Migration, MigrationError, Report, MIGRATIONS};
use super::target::{LiveTarget, OfflineScript};
use crate::config::MigrationConfig;
use crate::database::db_utils::establish_unpooled;
use crate::database::metadata::{metadata, MetaData, SchemaDrift};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Emit SQL text only
    Offline,
    /// Apply to the configured database
    Online,
}

impl RunMode {
    pub fn from_offline_flag(offline: bool) -> Self {
        if offline {
            RunMode::Offline
        } else {
            RunMode::Online
        }
    }

    pub fn is_offline(self) -> bool {
        self == RunMode::Offline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Upgrade,
    Downgrade,
    Check,
}

#[derive(Debug)]
pub enum Outcome {
    /// Offline output, ready for `psql`
    Script(String),
    Upgraded(Report<'static>),
    Downgraded(&'static Migration),
    Checked(Vec<SchemaDrift>),
}

pub fn run(config: &MigrationConfig, mode: RunMode, command: Command) -> Result<Outcome, MigrationError> {
    let target_metadata = metadata();

    if mode.is_offline() {
        run_migrations_offline(config, &target_metadata, command).map(Outcome::Script)
    } else {
        run_migrations_online(config, &target_metadata, command)
    }
}

/// Renders the SQL `command` would run, using only the configured url
pub fn run_migrations_offline(
    config: &MigrationConfig,
    target_metadata: &MetaData,
    command: Command,
) -> Result<String, MigrationError> {
    let url = config.require_url()?;

    let script = match command {
        Command::Upgrade => {
            let mut script = OfflineScript::new(url)?;
            upgrade(&mut script, MIGRATIONS, target_metadata)?;
            script
        }
        Command::Downgrade => {
            let mut script = OfflineScript::at_head(url, MIGRATIONS)?;
            downgrade(&mut script, MIGRATIONS)?;
            script
        }
        Command::Check => return Err(MigrationError::RequiresConnection("check")),
    };

    Ok(script.into_sql())
}

/// Connects with the configured url and driver options and runs `command`
pub fn run_migrations_online(
    config: &MigrationConfig,
    target_metadata: &MetaData,
    command: Command,
) -> Result<Outcome, MigrationError> {
    let url = config.engine_url()?;
    let conn = establish_unpooled(&url)?;
    let mut target = LiveTarget::new(&conn);

    match command {
        Command::Upgrade => {
            let report = upgrade(&mut target, MIGRATIONS, target_metadata)?;
            info!("{} migration(s) applied", report.applied.len());
            Ok(Outcome::Upgraded(report))
        }
        Command::Downgrade => Ok(Outcome::Downgraded(downgrade(&mut target, MIGRATIONS)?)),
        Command::Check => Ok(Outcome::Checked(check(&mut target, target_metadata)?)),
    }
}
