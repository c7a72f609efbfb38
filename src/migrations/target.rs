use std::collections::BTreeSet;

use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;

use super::{Migration, MigrationError};
use crate::database::metadata::LiveColumn;

table! {
    __diesel_schema_migrations (version) {
        version -> VarChar,
        run_on -> Timestamp,
    }
}

const VERSION_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS __diesel_schema_migrations (
    version VARCHAR(50) PRIMARY KEY NOT NULL,
    run_on TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);";

const LIVE_COLUMNS_SQL: &str = "SELECT table_name::text AS table_name, \
    column_name::text AS column_name, \
    is_nullable::text AS is_nullable, \
    data_type::text AS data_type, \
    character_maximum_length::int AS character_maximum_length \
    FROM information_schema.columns \
    WHERE table_schema = current_schema() \
    ORDER BY table_name, ordinal_position";

/// Where migration SQL ends up: a live database or a script
pub trait MigrationTarget {
    /// Runs `f` so that either all of its statements take effect or none do
    fn in_transaction<R, F>(&mut self, f: F) -> Result<R, MigrationError>
    where
        F: FnOnce(&mut Self) -> Result<R, MigrationError>;

    fn ensure_version_table(&mut self) -> Result<(), MigrationError>;

    fn applied_versions(&mut self) -> Result<BTreeSet<String>, MigrationError>;

    fn execute_batch(&mut self, sql: &str) -> Result<(), MigrationError>;

    fn record_applied(&mut self, version: &str) -> Result<(), MigrationError>;

    fn record_reverted(&mut self, version: &str) -> Result<(), MigrationError>;

    /// Columns of the current schema, `None` if there is no database to ask
    fn live_columns(&mut self) -> Result<Option<Vec<LiveColumn>>, MigrationError>;

    fn annotate(&mut self, _note: &str) {}
}

/// Runs migrations against a connection the caller owns
pub struct LiveTarget<'a> {
    conn: &'a PgConnection,
}

impl<'a> LiveTarget<'a> {
    pub fn new(conn: &'a PgConnection) -> Self {
        LiveTarget { conn }
    }
}

impl<'a> MigrationTarget for LiveTarget<'a> {
    fn in_transaction<R, F>(&mut self, f: F) -> Result<R, MigrationError>
    where
        F: FnOnce(&mut Self) -> Result<R, MigrationError>,
    {
        let conn = self.conn;
        conn.transaction(|| f(self))
    }

    fn ensure_version_table(&mut self) -> Result<(), MigrationError> {
        self.conn.batch_execute(VERSION_TABLE_SQL)?;
        Ok(())
    }

    fn applied_versions(&mut self) -> Result<BTreeSet<String>, MigrationError> {
        use self::__diesel_schema_migrations::dsl::*;

        let found = __diesel_schema_migrations
            .select(version)
            .load::<String>(self.conn)?;
        Ok(found.into_iter().collect())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), MigrationError> {
        self.conn.batch_execute(sql)?;
        Ok(())
    }

    fn record_applied(&mut self, applied: &str) -> Result<(), MigrationError> {
        use self::__diesel_schema_migrations::dsl::*;

        diesel::insert_into(__diesel_schema_migrations)
            .values(version.eq(applied))
            .execute(self.conn)?;
        Ok(())
    }

    fn record_reverted(&mut self, reverted: &str) -> Result<(), MigrationError> {
        use self::__diesel_schema_migrations::dsl::*;

        diesel::delete(__diesel_schema_migrations.filter(version.eq(reverted)))
            .execute(self.conn)?;
        Ok(())
    }

    fn live_columns(&mut self) -> Result<Option<Vec<LiveColumn>>, MigrationError> {
        let columns = diesel::sql_query(LIVE_COLUMNS_SQL).load::<LiveColumn>(self.conn)?;
        Ok(Some(columns))
    }
}

/// Collects migration SQL as text without touching a database.
///
/// Values are written inline as literals, so the script can be piped
/// straight into `psql`.
#[derive(Debug)]
pub struct OfflineScript {
    sql: String,
    assume_applied: BTreeSet<String>,
}

impl OfflineScript {
    /// A script for a database with no migrations applied
    pub fn new(url: &str) -> Result<OfflineScript, MigrationError> {
        check_dialect(url)?;
        Ok(OfflineScript {
            sql: String::new(),
            assume_applied: BTreeSet::new(),
        })
    }

    /// A script for a database that is already at the newest migration
    pub fn at_head(url: &str, migrations: &[Migration]) -> Result<OfflineScript, MigrationError> {
        let mut script = Self::new(url)?;
        script.assume_applied = migrations.iter().map(|m| m.version.to_string()).collect();
        Ok(script)
    }

    pub fn into_sql(self) -> String {
        self.sql
    }

    fn push(&mut self, statement: &str) {
        self.sql.push_str(statement.trim());
        self.sql.push_str("\n\n");
    }
}

impl MigrationTarget for OfflineScript {
    fn in_transaction<R, F>(&mut self, f: F) -> Result<R, MigrationError>
    where
        F: FnOnce(&mut Self) -> Result<R, MigrationError>,
    {
        self.push("BEGIN;");
        let result = f(self)?;
        self.push("COMMIT;");
        Ok(result)
    }

    fn ensure_version_table(&mut self) -> Result<(), MigrationError> {
        self.push(VERSION_TABLE_SQL);
        Ok(())
    }

    fn applied_versions(&mut self) -> Result<BTreeSet<String>, MigrationError> {
        Ok(self.assume_applied.clone())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), MigrationError> {
        self.push(sql);
        Ok(())
    }

    fn record_applied(&mut self, version: &str) -> Result<(), MigrationError> {
        self.push(&format!(
            "INSERT INTO __diesel_schema_migrations (version) VALUES ({});",
            literal(version)
        ));
        Ok(())
    }

    fn record_reverted(&mut self, version: &str) -> Result<(), MigrationError> {
        self.push(&format!(
            "DELETE FROM __diesel_schema_migrations WHERE version = {};",
            literal(version)
        ));
        Ok(())
    }

    fn live_columns(&mut self) -> Result<Option<Vec<LiveColumn>>, MigrationError> {
        Ok(None)
    }

    fn annotate(&mut self, note: &str) {
        self.push(&format!("-- {}", note));
    }
}

/// Only PostgreSQL urls can be rendered for
fn check_dialect(url: &str) -> Result<(), MigrationError> {
    let scheme = url.split_once("://").map(|(scheme, _)| scheme).unwrap_or(url);
    match scheme {
        "postgres" | "postgresql" => Ok(()),
        other => Err(MigrationError::UnsupportedDialect(other.to_string())),
    }
}

/// A SQL string literal with quotes escaped
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
