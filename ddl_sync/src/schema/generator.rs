//! Migration generator
//!
//! This module turns schemas and schema diffs into SQL scripts through a
//! dialect grammar.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::grammar::Grammar;
use crate::models::registry::EntitySchemaReader;
use crate::schema::diff::{SchemaDiff, TableDiff};
use crate::schema::types::{Schema, Table};

/// Forward and inverse scripts for one migration.
///
/// Statements are kept individually so they can be executed one by one;
/// [`MigrationSql::up`] and [`MigrationSql::down`] render the scripts as
/// newline-joined, semicolon-terminated text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSql {
    up: Vec<String>,
    down: Vec<String>,
}

impl MigrationSql {
    pub fn up(&self) -> String {
        render(&self.up)
    }

    pub fn down(&self) -> String {
        render(&self.down)
    }

    pub fn statements_up(&self) -> &[String] {
        &self.up
    }

    pub fn statements_down(&self) -> &[String] {
        &self.down
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty()
    }
}

fn render(statements: &[String]) -> String {
    statements
        .iter()
        .map(|statement| format!("{statement};"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Migration SQL generator
pub struct MigrationGenerator<'a> {
    grammar: &'a dyn Grammar,
}

impl<'a> MigrationGenerator<'a> {
    /// Create a new migration generator
    pub fn new(grammar: &'a dyn Grammar) -> Self {
        Self { grammar }
    }

    /// Full `CREATE TABLE` script for every table of the schema
    pub fn generate(&self, schema: &Schema) -> String {
        let statements: Vec<String> = schema
            .tables()
            .map(|table| self.create_table(table))
            .collect();

        info!(
            dialect = %self.grammar.dialect(),
            statements = statements.len(),
            "Generated schema script"
        );

        render(&statements)
    }

    /// Read the entity directories and generate their full schema script
    pub fn generate_for<P: AsRef<Path>>(
        &self,
        reader: &EntitySchemaReader,
        directories: &[P],
    ) -> Result<String> {
        let schema = reader.read_all(directories)?;
        Ok(self.generate(&schema))
    }

    /// Generate the forward and inverse scripts for a diff.
    ///
    /// Fails when the grammar cannot express a column modification.
    pub fn generate_diff(&self, diff: &SchemaDiff) -> Result<MigrationSql> {
        let mut sql = MigrationSql::default();

        for table in &diff.new_tables {
            sql.up.push(self.create_table(table));
            sql.down.push(self.grammar.compile_drop_table(table.name()));
        }

        for table_diff in &diff.changed_tables {
            self.alter_table(table_diff, &mut sql)?;
        }

        for table in &diff.removed_tables {
            sql.up.push(self.grammar.compile_drop_table(table.name()));
            sql.down.push(self.create_table(table));
        }

        info!(
            dialect = %self.grammar.dialect(),
            up = sql.up.len(),
            down = sql.down.len(),
            "Generated migration"
        );

        Ok(sql)
    }

    fn create_table(&self, table: &Table) -> String {
        self.grammar
            .compile_create_table(table.name(), &table.column_list())
    }

    fn alter_table(&self, table_diff: &TableDiff, sql: &mut MigrationSql) -> Result<()> {
        let table = table_diff.table_name.as_str();

        for column in &table_diff.added_columns {
            sql.up.push(self.grammar.compile_add_column(table, column));
            sql.down
                .push(self.grammar.compile_drop_column(table, column.name()));
        }

        for change in &table_diff.changed_columns {
            sql.up.push(
                self.grammar
                    .compile_modify_column(table, &change.old, &change.new)?,
            );
            sql.down.push(
                self.grammar
                    .compile_modify_column(table, &change.new, &change.old)?,
            );
        }

        for column in &table_diff.removed_columns {
            sql.up
                .push(self.grammar.compile_drop_column(table, column.name()));
            sql.down.push(self.grammar.compile_add_column(table, column));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{MySqlGrammar, SqliteGrammar};
    use crate::schema::diff::SchemaComparator;
    use crate::schema::types::{Column, ColumnType};
    use pretty_assertions::assert_eq;

    fn posts() -> Table {
        Table::new("posts")
            .with_columns(vec![
                Column::new("id", ColumnType::Integer).primary_key(true),
                Column::new("title", ColumnType::String).length(80),
            ])
            .unwrap()
    }

    #[test]
    fn generates_full_schema_script() {
        let schema = Schema::from_tables(vec![posts(), Table::new("tags")
            .with_column(Column::new("label", ColumnType::Text))
            .unwrap()]);

        assert_eq!(
            MigrationGenerator::new(&MySqlGrammar).generate(&schema),
            "CREATE TABLE `posts` (`id` INT NOT NULL PRIMARY KEY, `title` VARCHAR(80) NOT NULL);\n\
             CREATE TABLE `tags` (`label` TEXT NOT NULL);"
        );
    }

    #[test]
    fn orders_statements_within_a_changed_table() {
        let actual = Schema::from_tables(vec![posts()
            .with_column(Column::new("old_flag", ColumnType::Boolean))
            .unwrap()]);
        let desired = Schema::from_tables(vec![Table::new("posts")
            .with_columns(vec![
                Column::new("id", ColumnType::Integer).primary_key(true),
                Column::new("title", ColumnType::String).length(120),
                Column::new("body", ColumnType::Text).nullable(true),
            ])
            .unwrap()]);

        let diff = SchemaComparator::compare(&actual, &desired);
        let sql = MigrationGenerator::new(&MySqlGrammar)
            .generate_diff(&diff)
            .unwrap();

        assert_eq!(
            sql.statements_up(),
            &[
                "ALTER TABLE `posts` ADD COLUMN `body` TEXT".to_string(),
                "ALTER TABLE `posts` MODIFY COLUMN `title` VARCHAR(120) NOT NULL".to_string(),
                "ALTER TABLE `posts` DROP COLUMN `old_flag`".to_string(),
            ]
        );
        assert_eq!(
            sql.statements_down(),
            &[
                "ALTER TABLE `posts` DROP COLUMN `body`".to_string(),
                "ALTER TABLE `posts` MODIFY COLUMN `title` VARCHAR(80) NOT NULL".to_string(),
                "ALTER TABLE `posts` ADD COLUMN `old_flag` TINYINT(1) NOT NULL".to_string(),
            ]
        );
    }

    #[test]
    fn empty_diff_generates_nothing() {
        let sql = MigrationGenerator::new(&MySqlGrammar)
            .generate_diff(&SchemaDiff::default())
            .unwrap();
        assert!(sql.is_empty());
        assert_eq!(sql.up(), "");
    }

    #[test]
    fn propagates_unsupported_modifications() {
        let actual = Schema::from_tables(vec![posts()]);
        let desired = Schema::from_tables(vec![Table::new("posts")
            .with_columns(vec![
                Column::new("id", ColumnType::Integer).primary_key(true),
                Column::new("title", ColumnType::Text),
            ])
            .unwrap()]);

        let diff = SchemaComparator::compare(&actual, &desired);
        assert!(MigrationGenerator::new(&SqliteGrammar)
            .generate_diff(&diff)
            .is_err());
    }
}
