//! Configuration handling for ddl_sync

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::grammar::Dialect;
use crate::utils::naming::TableNaming;

/// Load configuration from a TOML file, or YAML for `.yaml`/`.yml` paths
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    let config: Config = if is_yaml {
        serde_yaml::from_str(&config_str)?
    } else {
        toml::from_str(&config_str)?
    };

    config.dialect()?;
    Ok(config)
}

/// Represents the complete ddl_sync configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub entities: EntitiesConfig,
    #[serde(default)]
    pub migrations: MigrationsConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// The configured dialect. Unknown drivers are rejected here, before
    /// any other work.
    pub fn dialect(&self) -> Result<Dialect> {
        self.database.driver.parse()
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Dialect selector: `mysql`, `pgsql`, `sqlite`, `sqlsrv` or an alias
    pub driver: String,
    #[serde(default)]
    pub url: String,
    /// PostgreSQL schema to introspect, `public` when absent
    pub schema: Option<String>,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Entity discovery configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EntitiesConfig {
    pub paths: Vec<String>,
    /// Glob patterns of files to skip
    pub exclude_paths: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub recursive_scan: bool,
    #[serde(default = "default_table_style")]
    pub table_style: String,
    #[serde(default = "default_true")]
    pub pluralize_tables: bool,
}

impl EntitiesConfig {
    pub fn naming(&self) -> TableNaming {
        TableNaming {
            style: self.table_style.clone(),
            pluralize: self.pluralize_tables,
        }
    }
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            paths: vec!["src".to_string()],
            exclude_paths: None,
            recursive_scan: true,
            table_style: default_table_style(),
            pluralize_tables: true,
        }
    }
}

/// Migration settings configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MigrationsConfig {
    #[serde(default = "default_history_table")]
    pub history_table: String,
    #[serde(default = "default_true")]
    pub transaction_per_migration: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            history_table: default_history_table(),
            transaction_per_migration: true,
            dry_run: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    pub file: Option<String>,
    /// `text` or `json`
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
            format: default_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_table_style() -> String {
    "snake_case".to_string()
}

fn default_history_table() -> String {
    "ddl_sync_migrations".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_minimal_toml() {
        let config: Config = toml::from_str(
            r#"
            [database]
            driver = "pgsql"
            url = "postgres://localhost/app"
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect().unwrap(), Dialect::Postgres);
        assert_eq!(config.migrations.history_table, "ddl_sync_migrations");
        assert!(config.migrations.transaction_per_migration);
        assert_eq!(config.entities.paths, vec!["src".to_string()]);
        assert!(config.logging.is_none());
    }

    #[test]
    fn parses_yaml() {
        let config: Config = serde_yaml::from_str(
            r#"
database:
  driver: sqlite
  url: "sqlite::memory:"
entities:
  paths: [entities]
  exclude_paths: ["**/legacy/**"]
  pluralize_tables: false
logging:
  level: debug
  format: json
"#,
        )
        .unwrap();

        assert_eq!(config.dialect().unwrap(), Dialect::Sqlite);
        assert!(!config.entities.naming().pluralize);
        assert_eq!(config.logging.unwrap().format, "json");
    }

    #[test]
    fn rejects_unknown_driver_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddl_sync.toml");
        fs::write(&path, "[database]\ndriver = \"oracle\"\nurl = \"\"\n").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDialect(_)));
    }
}
