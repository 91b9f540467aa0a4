//! SQLite grammar

use super::{generic_type, Dialect, Grammar};
use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnType};

/// DDL grammar for SQLite.
///
/// Declared type names keep the canonical kind recoverable from the catalog
/// while still resolving to the intended storage affinity. Columns cannot
/// be redefined in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar;

impl Grammar for SqliteGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn auto_increment_sql(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn get_type(&self, column: &Column) -> String {
        // Only a column declared exactly `INTEGER` can carry AUTOINCREMENT
        if column.is_auto_increment() && column.column_type().is_integer() {
            return "INTEGER".to_string();
        }

        match column.column_type() {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::DatetimeTz => "TIMESTAMP".to_string(),
            _ => generic_type(column),
        }
    }

    /// Auto-increment keys of every integer kind are stored as `INTEGER`
    fn stored_column(&self, column: &Column) -> Column {
        if column.is_auto_increment() && column.column_type().is_integer() {
            column.clone().with_type(ColumnType::Integer)
        } else {
            column.clone()
        }
    }

    fn compile_modify_column(&self, table: &str, _old: &Column, new: &Column) -> Result<String> {
        Err(Error::MigrationError(format!(
            "SQLite cannot redefine column \"{}\" on table \"{}\" in place; rebuild the table instead",
            new.name(),
            table
        )))
    }
}
