//! Database connection handling
//!
//! One sqlx pool per supported driver, chosen from the configured dialect.

use std::time::Duration;

use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, MySql, Pool,
    Postgres, Sqlite,
};
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::grammar::Dialect;

/// A parameterized statement with string bindings, in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundStatement<'a> {
    pub sql: String,
    pub binds: Vec<&'a str>,
}

/// A connection pool for one of the dialects with driver support
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(10);
        let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(30));
        let dialect = config.driver.parse::<Dialect>()?;

        debug!(%dialect, pool_size, "Connecting to database");

        let connection = match dialect {
            Dialect::Postgres => PgPoolOptions::new()
                .max_connections(pool_size)
                .acquire_timeout(timeout)
                .connect(&config.url)
                .await
                .map(DatabaseConnection::Postgres),
            Dialect::MySql => MySqlPoolOptions::new()
                .max_connections(pool_size)
                .acquire_timeout(timeout)
                .connect(&config.url)
                .await
                .map(DatabaseConnection::MySql),
            Dialect::Sqlite => SqlitePoolOptions::new()
                .max_connections(pool_size)
                .acquire_timeout(timeout)
                .connect(&config.url)
                .await
                .map(DatabaseConnection::Sqlite),
            Dialect::SqlServer => {
                return Err(Error::UnsupportedDialect(format!(
                    "{dialect} (DDL generation only, no database driver)"
                )))
            }
        };

        connection.map_err(|e| Error::ConnectionError(e.to_string()))
    }

    /// The dialect of the underlying pool
    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseConnection::Postgres(_) => Dialect::Postgres,
            DatabaseConnection::MySql(_) => Dialect::MySql,
            DatabaseConnection::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Execute a single SQL statement
    pub async fn execute(&self, sql: &str) -> Result<()> {
        match self {
            DatabaseConnection::Postgres(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            DatabaseConnection::MySql(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            DatabaseConnection::Sqlite(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Execute statements in order, stopping at the first failure
    pub async fn execute_all(&self, statements: &[String]) -> Result<()> {
        for statement in statements {
            self.execute(statement).await?;
        }
        Ok(())
    }

    /// Execute a parameterized statement
    pub async fn execute_bound(&self, statement: &BoundStatement<'_>) -> Result<()> {
        match self {
            DatabaseConnection::Postgres(pool) => {
                let mut query = sqlx::query(&statement.sql);
                for value in &statement.binds {
                    query = query.bind(*value);
                }
                query.execute(pool).await?;
            }
            DatabaseConnection::MySql(pool) => {
                let mut query = sqlx::query(&statement.sql);
                for value in &statement.binds {
                    query = query.bind(*value);
                }
                query.execute(pool).await?;
            }
            DatabaseConnection::Sqlite(pool) => {
                let mut query = sqlx::query(&statement.sql);
                for value in &statement.binds {
                    query = query.bind(*value);
                }
                query.execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Execute statements inside one transaction, then `last` before the
    /// commit. Nothing is kept when any of them fails.
    ///
    /// MySQL commits implicitly around DDL, so there the transaction only
    /// guards data statements.
    pub async fn execute_in_transaction(
        &self,
        statements: &[String],
        last: Option<&BoundStatement<'_>>,
    ) -> Result<()> {
        match self {
            DatabaseConnection::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                for statement in statements {
                    sqlx::query(statement).execute(&mut *tx).await?;
                }
                if let Some(last) = last {
                    let mut query = sqlx::query(&last.sql);
                    for value in &last.binds {
                        query = query.bind(*value);
                    }
                    query.execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
            DatabaseConnection::MySql(pool) => {
                let mut tx = pool.begin().await?;
                for statement in statements {
                    sqlx::query(statement).execute(&mut *tx).await?;
                }
                if let Some(last) = last {
                    let mut query = sqlx::query(&last.sql);
                    for value in &last.binds {
                        query = query.bind(*value);
                    }
                    query.execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
            DatabaseConnection::Sqlite(pool) => {
                let mut tx = pool.begin().await?;
                for statement in statements {
                    sqlx::query(statement).execute(&mut *tx).await?;
                }
                if let Some(last) = last {
                    let mut query = sqlx::query(&last.sql);
                    for value in &last.binds {
                        query = query.bind(*value);
                    }
                    query.execute(&mut *tx).await?;
                }
                tx.commit().await?;
            }
        }
        Ok(())
    }

    pub async fn close(&self) {
        match self {
            DatabaseConnection::Postgres(pool) => pool.close().await,
            DatabaseConnection::MySql(pool) => pool.close().await,
            DatabaseConnection::Sqlite(pool) => pool.close().await,
        }
    }
}
