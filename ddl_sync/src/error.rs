//! Error types for ddl_sync

use std::path::PathBuf;

use thiserror::Error;

/// Result type for ddl_sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ddl_sync
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// A single source file could not be read or parsed during entity
    /// discovery. The scanner logs and skips these.
    #[error("Discovery error in {path}: {message}")]
    DiscoveryError { path: PathBuf, message: String },

    #[error("Metadata error: {0}")]
    MetadataError(String),

    #[error("Invalid column type \"{0}\" (supported: {supported})", supported = crate::schema::types::ColumnType::supported_names())]
    InvalidColumnType(String),

    #[error("Table \"{table}\" is declared by both {first} and {second}")]
    DuplicateTable {
        table: String,
        first: String,
        second: String,
    },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Whether the error only concerns a single discovered file and the
    /// surrounding scan may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DiscoveryError { .. })
    }
}

/// Convert Serde JSON errors to ddl_sync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to ddl_sync errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
