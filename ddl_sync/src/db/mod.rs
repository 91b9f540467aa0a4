//! Database module for ddl_sync
//!
//! This module handles database connections and the migration history.

pub mod connection;
pub mod migrations;

// Re-export key types
pub use connection::DatabaseConnection;
pub use migrations::Migration;
