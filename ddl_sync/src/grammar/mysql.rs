//! MySQL grammar

use super::{generic_type, precision, scale, Dialect, Grammar};
use crate::error::Result;
use crate::schema::types::{Column, ColumnType};

/// DDL grammar for MySQL and MariaDB
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGrammar;

impl Grammar for MySqlGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn auto_increment_sql(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn get_type(&self, column: &Column) -> String {
        match column.column_type() {
            ColumnType::Decimal => format!("DECIMAL({}, {})", precision(column), scale(column)),
            ColumnType::SmallFloat => "FLOAT".to_string(),
            ColumnType::Boolean => "TINYINT(1)".to_string(),
            ColumnType::Array => "LONGTEXT".to_string(),
            _ => generic_type(column),
        }
    }

    /// `MODIFY COLUMN` restates the definition without key clauses; key
    /// changes become separate `ADD`/`DROP` actions on the same statement.
    fn compile_modify_column(&self, table: &str, old: &Column, new: &Column) -> Result<String> {
        let column = self.wrap(new.name());
        let definition = new.clone().unique(false).primary_key(false);
        let mut actions = vec![format!("MODIFY COLUMN {}", self.compile_column(&definition))];

        if old.is_primary_key() != new.is_primary_key() {
            if new.is_primary_key() {
                actions.push(format!("ADD PRIMARY KEY ({column})"));
            } else {
                actions.push("DROP PRIMARY KEY".to_string());
            }
        }

        // An inline UNIQUE creates an index named after the column
        if old.is_unique() != new.is_unique() {
            if new.is_unique() {
                actions.push(format!("ADD UNIQUE INDEX {column} ({column})"));
            } else {
                actions.push(format!("DROP INDEX {column}"));
            }
        }

        Ok(format!(
            "ALTER TABLE {} {}",
            self.wrap(table),
            actions.join(", ")
        ))
    }
}
