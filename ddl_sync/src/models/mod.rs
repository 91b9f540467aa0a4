//! Models module for ddl_sync
//!
//! This module handles entity metadata, registration and discovery.

pub mod metadata;
pub mod registry;

// Re-export key types
pub use metadata::{ColumnMeta, EntityMeta, IndexMeta, TableMeta};
pub use registry::{registered_entities, Entity, EntityDef, EntitySchemaReader};
