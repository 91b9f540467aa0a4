//! Schema difference calculator
//!
//! This module compares an actual schema against a desired schema and
//! records the structural delta between them.

use serde::Serialize;

use crate::grammar::Grammar;
use crate::schema::types::{Column, Schema, Table};

/// A column present on both sides whose definition differs
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDiff {
    /// Definition found in the actual schema
    pub old: Column,
    /// Definition required by the desired schema
    pub new: Column,
}

/// Column-level changes for a table present on both sides
#[derive(Debug, Clone, Serialize)]
pub struct TableDiff {
    pub table_name: String,
    pub added_columns: Vec<Column>,
    pub removed_columns: Vec<Column>,
    pub changed_columns: Vec<ColumnDiff>,
}

impl TableDiff {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            added_columns: Vec::new(),
            removed_columns: Vec::new(),
            changed_columns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.changed_columns.is_empty()
    }
}

/// Represents changes needed to bring the actual schema to the desired one.
///
/// Removed tables carry their full definition so the inverse migration can
/// recreate them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaDiff {
    pub new_tables: Vec<Table>,
    pub removed_tables: Vec<Table>,
    pub changed_tables: Vec<TableDiff>,
}

impl SchemaDiff {
    pub fn has_changes(&self) -> bool {
        !self.new_tables.is_empty()
            || !self.removed_tables.is_empty()
            || !self.changed_tables.is_empty()
    }
}

/// Compares two schemas by table and column name
pub struct SchemaComparator;

impl SchemaComparator {
    /// Compute the delta from `actual` to `desired`.
    ///
    /// New and changed tables follow the desired schema's order, removed
    /// tables the actual schema's order.
    pub fn compare(actual: &Schema, desired: &Schema) -> SchemaDiff {
        let mut diff = SchemaDiff::default();

        for desired_table in desired.tables() {
            match actual.table(desired_table.name()) {
                None => diff.new_tables.push(desired_table.clone()),
                Some(actual_table) => {
                    let table_diff = Self::compare_tables(actual_table, desired_table);
                    if !table_diff.is_empty() {
                        diff.changed_tables.push(table_diff);
                    }
                }
            }
        }

        diff.removed_tables = actual
            .tables()
            .filter(|table| !desired.has_table(table.name()))
            .cloned()
            .collect();

        diff
    }

    /// Compute the delta from an introspected `actual` schema to `desired`,
    /// first mapping `desired` onto the kinds `grammar`'s dialect stores.
    pub fn compare_stored(grammar: &dyn Grammar, actual: &Schema, desired: &Schema) -> SchemaDiff {
        let stored = Schema::from_tables(
            desired
                .tables()
                .cloned()
                .map(|table| table.map_columns(|column| grammar.stored_column(&column))),
        );

        Self::compare(actual, &stored)
    }

    fn compare_tables(actual: &Table, desired: &Table) -> TableDiff {
        let mut table_diff = TableDiff::new(desired.name());

        for column in desired.columns() {
            match actual.column(column.name()) {
                None => table_diff.added_columns.push(column.clone()),
                Some(existing) if !existing.equals(column) => {
                    table_diff.changed_columns.push(ColumnDiff {
                        old: existing.clone(),
                        new: column.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        table_diff.removed_columns = actual
            .columns()
            .filter(|column| !desired.has_column(column.name()))
            .cloned()
            .collect();

        table_diff
    }
}
