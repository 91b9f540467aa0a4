//! PostgreSQL grammar

use super::{generic_type, Dialect, Grammar};
use crate::error::Result;
use crate::schema::types::{Column, ColumnType, Scalar};

/// DDL grammar for PostgreSQL.
///
/// Auto-increment is expressed through the `SERIAL` family of types, so the
/// trailing auto-increment clause is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresGrammar;

impl PostgresGrammar {
    /// The storage type of a column, ignoring auto-increment. `SERIAL` is
    /// only valid at creation time, so alterations use this instead.
    pub fn storage_type(&self, column: &Column) -> String {
        match column.column_type() {
            ColumnType::Float => "DOUBLE PRECISION".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Binary | ColumnType::Blob => "BYTEA".to_string(),
            ColumnType::Datetime => "TIMESTAMP(0) WITHOUT TIME ZONE".to_string(),
            ColumnType::DatetimeTz => "TIMESTAMP(0) WITH TIME ZONE".to_string(),
            ColumnType::Time => "TIME(0) WITHOUT TIME ZONE".to_string(),
            ColumnType::Array => "TEXT[]".to_string(),
            _ => generic_type(column),
        }
    }

    fn unique_constraint(&self, table: &str, column: &str) -> String {
        self.wrap(&format!("{table}_{column}_key"))
    }
}

impl Grammar for PostgresGrammar {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn auto_increment_sql(&self) -> &'static str {
        ""
    }

    fn get_type(&self, column: &Column) -> String {
        if column.is_auto_increment() && column.column_type().is_integer() {
            return match column.column_type() {
                ColumnType::Bigint => "BIGSERIAL",
                ColumnType::Smallint => "SMALLSERIAL",
                _ => "SERIAL",
            }
            .to_string();
        }

        self.storage_type(column)
    }

    /// `binary` and `blob` are both `BYTEA`
    fn stored_column(&self, column: &Column) -> Column {
        match column.column_type() {
            ColumnType::Binary => column.clone().with_type(ColumnType::Blob),
            _ => column.clone(),
        }
    }

    fn format_default(&self, value: &Scalar) -> String {
        match value {
            Scalar::Bool(true) => "TRUE".to_string(),
            Scalar::Bool(false) => "FALSE".to_string(),
            other => other.format_default(),
        }
    }

    fn compile_modify_column(&self, table: &str, old: &Column, new: &Column) -> Result<String> {
        let column = self.wrap(new.name());
        let new_type = self.storage_type(new);
        let type_change = format!("ALTER COLUMN {column} TYPE {new_type} USING {column}::{new_type}");
        let mut actions = Vec::new();

        if self.storage_type(old) != new_type {
            actions.push(type_change.clone());
        }

        if old.is_nullable() != new.is_nullable() {
            let action = if new.is_nullable() { "DROP" } else { "SET" };
            actions.push(format!("ALTER COLUMN {column} {action} NOT NULL"));
        }

        let old_default = old.get_default().map(|d| self.format_default(d));
        let new_default = new.get_default().map(|d| self.format_default(d));
        if old_default != new_default {
            match new_default {
                Some(default) => actions.push(format!("ALTER COLUMN {column} SET DEFAULT {default}")),
                None => actions.push(format!("ALTER COLUMN {column} DROP DEFAULT")),
            }
        }

        if old.is_unique() != new.is_unique() {
            let constraint = self.unique_constraint(table, new.name());
            if new.is_unique() {
                actions.push(format!("ADD CONSTRAINT {constraint} UNIQUE ({column})"));
            } else {
                actions.push(format!("DROP CONSTRAINT {constraint}"));
            }
        }

        // Key and sequence changes have no in-place form; restate the type.
        if actions.is_empty() {
            actions.push(type_change);
        }

        Ok(format!(
            "ALTER TABLE {} {}",
            self.wrap(table),
            actions.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uses_serial_types_for_auto_increment() {
        let id = Column::new("id", ColumnType::Integer)
            .primary_key(true)
            .auto_increment(true);
        let big = Column::new("id", ColumnType::Bigint).auto_increment(true);

        assert_eq!(PostgresGrammar.compile_column(&id), "\"id\" SERIAL NOT NULL PRIMARY KEY");
        assert_eq!(PostgresGrammar.get_type(&big), "BIGSERIAL");
    }

    #[test]
    fn binary_is_stored_as_blob() {
        let digest = Column::new("digest", ColumnType::Binary).length(32);
        let stored = PostgresGrammar.stored_column(&digest);

        assert_eq!(stored.column_type(), ColumnType::Blob);
        assert_eq!(PostgresGrammar.get_type(&stored), PostgresGrammar.get_type(&digest));
        assert!(stored.equals(&Column::new("digest", ColumnType::Blob)));
    }

    #[test]
    fn renders_boolean_defaults_as_literals() {
        let active = Column::new("active", ColumnType::Boolean).default_value(true);
        assert_eq!(
            PostgresGrammar.compile_column(&active),
            "\"active\" BOOLEAN NOT NULL DEFAULT TRUE"
        );
    }

    #[test]
    fn modifies_only_what_changed() {
        let old = Column::new("email", ColumnType::String).nullable(true);
        let new = Column::new("email", ColumnType::String);

        assert_eq!(
            PostgresGrammar.compile_modify_column("users", &old, &new).unwrap(),
            "ALTER TABLE \"users\" ALTER COLUMN \"email\" SET NOT NULL"
        );
        assert_eq!(
            PostgresGrammar.compile_modify_column("users", &new, &old).unwrap(),
            "ALTER TABLE \"users\" ALTER COLUMN \"email\" DROP NOT NULL"
        );
    }

    #[test]
    fn modifies_type_default_and_uniqueness() {
        let old = Column::new("code", ColumnType::String).length(10);
        let new = Column::new("code", ColumnType::String)
            .length(20)
            .default_value("x")
            .unique(true);

        assert_eq!(
            PostgresGrammar.compile_modify_column("items", &old, &new).unwrap(),
            "ALTER TABLE \"items\" ALTER COLUMN \"code\" TYPE VARCHAR(20) USING \"code\"::VARCHAR(20), \
             ALTER COLUMN \"code\" SET DEFAULT 'x', \
             ADD CONSTRAINT \"items_code_key\" UNIQUE (\"code\")"
        );
    }
}
