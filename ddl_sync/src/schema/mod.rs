//! Schema module for ddl_sync
//!
//! This module holds the canonical schema model, catalog introspection,
//! schema comparison and migration generation.

pub mod diff;
pub mod generator;
pub mod introspector;
pub mod types;

// Re-export key types
pub use diff::{ColumnDiff, SchemaComparator, SchemaDiff, TableDiff};
pub use generator::{MigrationGenerator, MigrationSql};
pub use introspector::{introspector_for, Introspector};
pub use types::{Column, ColumnType, Index, Scalar, Schema, Table};
