//! ddl_sync: keeps a database schema in sync with Rust entity declarations
//!
//! ddl_sync derives the desired schema from entity metadata, introspects the
//! actual schema of a live database, diffs the two and compiles the
//! difference into dialect-specific DDL with a matching rollback script.

pub mod config;
pub mod db;
pub mod error;
pub mod grammar;
pub mod models;
pub mod schema;
pub mod utils;

// Re-export inventory for the derive macro
pub use inventory;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use ddl_sync_macros::Entity;
pub use error::{Error, Result};
pub use grammar::{Dialect, Grammar};
pub use models::registry::{Entity, EntitySchemaReader};
pub use schema::diff::{SchemaComparator, SchemaDiff};
pub use schema::generator::{MigrationGenerator, MigrationSql};
pub use schema::types::{Column, ColumnType, Scalar, Schema, Table};

use std::path::Path;

use tokio::sync::OnceCell;
use tracing::info;

use db::migrations::{self, Migration};
use schema::introspector::introspector_for;

/// Initialize ddl_sync with the specified configuration file
pub fn init(config_path: impl AsRef<Path>) -> Result<DdlSync> {
    let config = config::load_from_file(config_path)?;
    DdlSync::new(config)
}

/// The main client for interacting with ddl_sync
pub struct DdlSync {
    config: Config,
    dialect: Dialect,
    reader: EntitySchemaReader,
    connection: OnceCell<DatabaseConnection>,
}

impl DdlSync {
    /// Create a client from configuration. No connection is opened until a
    /// database operation needs one.
    pub fn new(config: Config) -> Result<Self> {
        let dialect = config.dialect()?;
        let reader = EntitySchemaReader::from_config(&config.entities)?;

        Ok(Self {
            config,
            dialect,
            reader,
            connection: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The database connection, opened on first use
    pub async fn connection(&self) -> Result<&DatabaseConnection> {
        self.connection
            .get_or_try_init(|| DatabaseConnection::connect(&self.config.database))
            .await
    }

    /// Schema declared by the entities under the configured paths
    pub fn desired_schema(&self) -> Result<Schema> {
        self.reader.read_all(&self.config.entities.paths)
    }

    /// Schema of the live database, without the migration history table
    pub async fn actual_schema(&self) -> Result<Schema> {
        let connection = self.connection().await?;
        let introspector = introspector_for(connection, self.config.database.schema.as_deref());

        let mut schema = introspector.introspect().await?;
        schema.remove_table(&self.config.migrations.history_table);
        Ok(schema)
    }

    /// Difference between the database and the entities
    pub async fn diff(&self) -> Result<SchemaDiff> {
        let desired = self.desired_schema()?;
        let actual = self.actual_schema().await?;
        let grammar = self.dialect.grammar();
        Ok(SchemaComparator::compare_stored(grammar.as_ref(), &actual, &desired))
    }

    /// Full create script for the desired schema
    pub fn schema_sql(&self) -> Result<String> {
        let grammar = self.dialect.grammar();
        MigrationGenerator::new(grammar.as_ref())
            .generate_for(&self.reader, &self.config.entities.paths)
    }

    /// Up and down scripts that bring the database to the desired schema
    pub async fn migration_sql(&self) -> Result<MigrationSql> {
        let diff = self.diff().await?;
        let grammar = self.dialect.grammar();
        MigrationGenerator::new(grammar.as_ref()).generate_diff(&diff)
    }

    /// Generate and apply a migration. Returns the applied version, or
    /// `None` when the database is already in sync.
    pub async fn sync(&self) -> Result<Option<String>> {
        let diff = self.diff().await?;

        if !diff.has_changes() {
            info!("Database schema is already in sync with entities");
            return Ok(None);
        }

        let grammar = self.dialect.grammar();
        let sql = MigrationGenerator::new(grammar.as_ref()).generate_diff(&diff)?;
        let migration = Migration::new(sql);

        migrations::apply(self.connection().await?, &self.config.migrations, &migration).await?;
        Ok(Some(migration.version))
    }

    /// Roll back the most recently applied migration
    pub async fn rollback(&self) -> Result<Option<String>> {
        migrations::rollback_last(self.connection().await?, &self.config.migrations).await
    }

    /// Close the connection pool if one was opened
    pub async fn close(&self) {
        if let Some(connection) = self.connection.get() {
            connection.close().await;
        }
    }
}
