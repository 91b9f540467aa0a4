//! Migration management
//!
//! This module applies generated migrations and tracks them in a history
//! table so the most recent one can be rolled back.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::MigrationsConfig;
use crate::db::connection::{BoundStatement, DatabaseConnection};
use crate::error::{Error, Result};
use crate::grammar::Dialect;
use crate::schema::generator::MigrationSql;

/// A versioned migration ready to be applied
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: String,
    pub sql: MigrationSql,
}

impl Migration {
    /// Stamp the migration with the current UTC time (`YYYYmmddHHMMSSmmm`)
    pub fn new(sql: MigrationSql) -> Self {
        Self::with_version(generate_version(), sql)
    }

    pub fn with_version(version: impl Into<String>, sql: MigrationSql) -> Self {
        Self {
            version: version.into(),
            sql,
        }
    }
}

/// Generate a migration version based on timestamp, to the millisecond
pub fn generate_version() -> String {
    Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// Ensure the migration history table exists
pub async fn ensure_history_table(
    connection: &DatabaseConnection,
    config: &MigrationsConfig,
) -> Result<()> {
    let dialect = connection.dialect();
    let table = dialect.grammar().wrap(&config.history_table);

    let sql = match dialect {
        Dialect::Postgres => format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             id SERIAL PRIMARY KEY, \
             version VARCHAR(255) NOT NULL UNIQUE, \
             down_sql TEXT NOT NULL, \
             applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        ),
        Dialect::MySql => format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             id INT AUTO_INCREMENT PRIMARY KEY, \
             version VARCHAR(255) NOT NULL UNIQUE, \
             down_sql LONGTEXT NOT NULL, \
             applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        ),
        Dialect::Sqlite => format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             version TEXT NOT NULL UNIQUE, \
             down_sql TEXT NOT NULL, \
             applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        ),
        Dialect::SqlServer => return Err(Error::UnsupportedDialect(dialect.to_string())),
    };

    connection.execute(&sql).await
}

/// Apply a migration and record it in the history table.
///
/// The history row is written together with the statements, inside the
/// same transaction when `transaction_per_migration` is set. A version that
/// is already recorded is rejected before anything runs. With `dry_run` the
/// statements are only logged.
pub async fn apply(
    connection: &DatabaseConnection,
    config: &MigrationsConfig,
    migration: &Migration,
) -> Result<()> {
    let statements = migration.sql.statements_up();

    if config.dry_run {
        for statement in statements {
            info!(version = %migration.version, "[dry run] {statement};");
        }
        return Ok(());
    }

    if applied_versions(connection, config)
        .await?
        .contains(&migration.version)
    {
        return Err(Error::MigrationError(format!(
            "migration {} is already applied",
            migration.version
        )));
    }

    info!(version = %migration.version, statements = statements.len(), "Applying migration");

    let change = HistoryChange::Record {
        version: &migration.version,
        down_sql: serde_json::to_string(migration.sql.statements_down())?,
    };
    run(connection, config, statements, &change).await?;

    info!(version = %migration.version, "Migration applied successfully");
    Ok(())
}

/// Roll back the most recently applied migration.
///
/// Returns the version that was rolled back, or `None` when the history is
/// empty.
pub async fn rollback_last(
    connection: &DatabaseConnection,
    config: &MigrationsConfig,
) -> Result<Option<String>> {
    ensure_history_table(connection, config).await?;

    let Some((version, down_sql)) = latest_migration(connection, config).await? else {
        warn!("No applied migrations to roll back");
        return Ok(None);
    };

    let statements: Vec<String> = serde_json::from_str(&down_sql)?;

    if config.dry_run {
        for statement in &statements {
            info!(version = %version, "[dry run] {statement};");
        }
        return Ok(Some(version));
    }

    info!(version = %version, statements = statements.len(), "Rolling back migration");

    run(
        connection,
        config,
        &statements,
        &HistoryChange::Remove { version: &version },
    )
    .await?;

    Ok(Some(version))
}

/// Versions recorded in the history table, oldest first
pub async fn applied_versions(
    connection: &DatabaseConnection,
    config: &MigrationsConfig,
) -> Result<Vec<String>> {
    ensure_history_table(connection, config).await?;

    let table = history_table(connection, config);
    let sql = format!("SELECT version FROM {table} ORDER BY id");

    let versions = match connection {
        DatabaseConnection::Postgres(pool) => {
            sqlx::query_scalar::<_, String>(&sql).fetch_all(pool).await?
        }
        DatabaseConnection::MySql(pool) => {
            sqlx::query_scalar::<_, String>(&sql).fetch_all(pool).await?
        }
        DatabaseConnection::Sqlite(pool) => {
            sqlx::query_scalar::<_, String>(&sql).fetch_all(pool).await?
        }
    };

    Ok(versions)
}

/// A history table write that accompanies a migration's statements
enum HistoryChange<'a> {
    Record { version: &'a str, down_sql: String },
    Remove { version: &'a str },
}

impl HistoryChange<'_> {
    /// The write as a parameterized statement against `table`
    fn statement(&self, dialect: Dialect, table: &str) -> BoundStatement<'_> {
        let (first, second) = match dialect {
            Dialect::Postgres => ("$1", "$2"),
            _ => ("?", "?"),
        };

        match self {
            HistoryChange::Record { version, down_sql } => BoundStatement {
                sql: format!("INSERT INTO {table} (version, down_sql) VALUES ({first}, {second})"),
                binds: vec![*version, down_sql.as_str()],
            },
            HistoryChange::Remove { version } => BoundStatement {
                sql: format!("DELETE FROM {table} WHERE version = {first}"),
                binds: vec![*version],
            },
        }
    }
}

/// Execute `statements` followed by the history write
async fn run(
    connection: &DatabaseConnection,
    config: &MigrationsConfig,
    statements: &[String],
    change: &HistoryChange<'_>,
) -> Result<()> {
    let history = change.statement(connection.dialect(), &history_table(connection, config));

    if config.transaction_per_migration {
        connection
            .execute_in_transaction(statements, Some(&history))
            .await
    } else {
        connection.execute_all(statements).await?;
        connection.execute_bound(&history).await
    }
}

fn history_table(connection: &DatabaseConnection, config: &MigrationsConfig) -> String {
    connection.dialect().grammar().wrap(&config.history_table)
}

async fn latest_migration(
    connection: &DatabaseConnection,
    config: &MigrationsConfig,
) -> Result<Option<(String, String)>> {
    let table = history_table(connection, config);
    let sql = format!("SELECT version, down_sql FROM {table} ORDER BY id DESC LIMIT 1");

    let row = match connection {
        DatabaseConnection::Postgres(pool) => {
            sqlx::query_as::<_, (String, String)>(&sql)
                .fetch_optional(pool)
                .await?
        }
        DatabaseConnection::MySql(pool) => {
            sqlx::query_as::<_, (String, String)>(&sql)
                .fetch_optional(pool)
                .await?
        }
        DatabaseConnection::Sqlite(pool) => {
            sqlx::query_as::<_, (String, String)>(&sql)
                .fetch_optional(pool)
                .await?
        }
    };

    Ok(row)
}
