//! Embedded schema migrations and the runner that applies them.
//!
//! Scripts live in `migrations/` at the repository root using the
//! diesel-cli layout, and applied versions are tracked in the same
//! `__diesel_schema_migrations` table, so `diesel migration list` keeps
//! working against a database managed by this module.

pub mod env;
pub mod target;

use std::collections::BTreeSet;

use config::ConfigError;
use diesel::result::ConnectionError;
use log::{info, warn};
use thiserror::Error;

use crate::database::metadata::{MetaData, SchemaDrift};

pub use target::{LiveTarget, MigrationTarget, OfflineScript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    /// Digits of the directory's date prefix
    pub version: &'static str,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// Every migration known to this build, oldest first
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: "20241014000000",
    name: "create_users_and_blogs",
    up: include_str!("../../migrations/2024-10-14-000000_create_users_and_blogs/up.sql"),
    down: include_str!("../../migrations/2024-10-14-000000_create_users_and_blogs/down.sql"),
}];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("unsupported database scheme `{0}`, expected postgres:// or postgresql://")]
    UnsupportedDialect(String),
    #[error("could not connect to the database: {0}")]
    Connection(#[from] ConnectionError),
    #[error("migration failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("no applied migration to revert")]
    NothingToRevert,
    #[error("`{0}` needs a live database, run it without --offline")]
    RequiresConnection(&'static str),
}

/// What an upgrade did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report<'m> {
    pub applied: Vec<&'m Migration>,
    /// Always empty when no database was inspected
    pub drift: Vec<SchemaDrift>,
}

/// Applies every migration not yet recorded on `target`, in version order,
/// inside one transaction. Running it again applies nothing.
pub fn upgrade<'m, T: MigrationTarget>(
    target: &mut T,
    migrations: &'m [Migration],
    meta: &MetaData,
) -> Result<Report<'m>, MigrationError> {
    let mut ordered: Vec<&'m Migration> = migrations.iter().collect();
    ordered.sort_by_key(|m| m.version);

    target.in_transaction(|t| {
        t.ensure_version_table()?;
        let done: BTreeSet<String> = t.applied_versions()?;

        let mut applied = Vec::new();
        for migration in ordered.into_iter().filter(|m| !done.contains(m.version)) {
            info!("Running upgrade {} ({})", migration.version, migration.name);
            t.annotate(&format!("Running upgrade {} ({})", migration.version, migration.name));
            t.execute_batch(migration.up)?;
            t.record_applied(migration.version)?;
            applied.push(migration);
        }

        let drift = match t.live_columns()? {
            Some(live) => meta.diff(&live),
            None => Vec::new(),
        };
        for entry in &drift {
            warn!("Schema drift: {}", entry);
        }

        Ok(Report { applied, drift })
    })
}

/// Reverts the most recent migration recorded on `target`
pub fn downgrade<'m, T: MigrationTarget>(
    target: &mut T,
    migrations: &'m [Migration],
) -> Result<&'m Migration, MigrationError> {
    target.in_transaction(|t| {
        t.ensure_version_table()?;
        let done = t.applied_versions()?;

        let latest = migrations
            .iter()
            .filter(|m| done.contains(m.version))
            .max_by_key(|m| m.version)
            .ok_or(MigrationError::NothingToRevert)?;

        info!("Running downgrade {} ({})", latest.version, latest.name);
        t.annotate(&format!("Running downgrade {} ({})", latest.version, latest.name));
        t.execute_batch(latest.down)?;
        t.record_reverted(latest.version)?;

        Ok(latest)
    })
}

/// Compares the live schema behind `target` to `meta`
pub fn check<T: MigrationTarget>(
    target: &mut T,
    meta: &MetaData,
) -> Result<Vec<SchemaDrift>, MigrationError> {
    let live = target
        .live_columns()?
        .ok_or(MigrationError::RequiresConnection("check"))?;

    Ok(meta.diff(&live))
}
