//! SQL Server grammar

use super::{generic_type, Dialect, Grammar};
use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnType, DEFAULT_LENGTH};

/// DDL grammar for Microsoft SQL Server
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerGrammar;

impl Grammar for SqlServerGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn auto_increment_sql(&self) -> &'static str {
        "IDENTITY(1,1)"
    }

    fn quote_chars(&self) -> (char, char) {
        ('[', ']')
    }

    fn get_type(&self, column: &Column) -> String {
        match column.column_type() {
            ColumnType::String => format!(
                "NVARCHAR({})",
                column.get_length().unwrap_or(DEFAULT_LENGTH)
            ),
            ColumnType::Text => "NVARCHAR(MAX)".to_string(),
            ColumnType::Uuid => "UNIQUEIDENTIFIER".to_string(),
            ColumnType::Blob => "VARBINARY(MAX)".to_string(),
            ColumnType::Boolean => "BIT".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::DatetimeTz => "DATETIMEOFFSET(0)".to_string(),
            ColumnType::Time => "TIME(0)".to_string(),
            ColumnType::Json | ColumnType::Array => "VARCHAR(MAX)".to_string(),
            _ => generic_type(column),
        }
    }

    fn compile_add_column(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            self.wrap(table),
            self.compile_column(column)
        )
    }

    /// `ALTER COLUMN` only accepts the type and nullability. Default,
    /// unique, key and identity changes live in named constraints or
    /// column properties it cannot reach, so those fail.
    fn compile_modify_column(&self, table: &str, old: &Column, new: &Column) -> Result<String> {
        let default_sql = |column: &Column| {
            column
                .get_default()
                .map_or_else(|| "NULL".to_string(), |value| self.format_default(value))
        };

        let unsupported = [
            (default_sql(old) != default_sql(new), "default"),
            (old.is_unique() != new.is_unique(), "uniqueness"),
            (old.is_primary_key() != new.is_primary_key(), "primary key"),
            (old.is_auto_increment() != new.is_auto_increment(), "identity"),
        ];
        if let Some((_, what)) = unsupported.iter().find(|(changed, _)| *changed) {
            return Err(Error::MigrationError(format!(
                "SQL Server cannot change the {what} of column {} on table {} with ALTER COLUMN",
                self.wrap(new.name()),
                self.wrap(table)
            )));
        }

        let nullability = if new.is_nullable() { "NULL" } else { "NOT NULL" };
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} {} {}",
            self.wrap(table),
            self.wrap(new.name()),
            self.get_type(new),
            nullability
        ))
    }
}
