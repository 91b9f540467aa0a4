//! Database introspection
//!
//! Introspectors read a live database's catalog and rebuild canonical
//! [`Table`]s from it. Each dialect maps its native types onto
//! [`ColumnType`] and normalizes catalog defaults into [`Scalar`]s.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlIntrospector;
pub use postgres::PostgresIntrospector;
pub use sqlite::SqliteIntrospector;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::db::connection::DatabaseConnection;
use crate::error::Result;
use crate::schema::types::{Column, ColumnType, Scalar, Schema, Table};

/// Reads the actual schema from a database catalog
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Names of the user tables, in a stable order
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Rebuild one table. Returns `None` when the table has no columns,
    /// which is also the case for tables that do not exist.
    async fn introspect_table(&self, name: &str) -> Result<Option<Table>>;

    /// Rebuild every user table, one catalog round trip per table
    async fn introspect(&self) -> Result<Schema> {
        let mut schema = Schema::new();

        for name in self.table_names().await? {
            debug!(table = %name, "Introspecting table");
            if let Some(table) = self.introspect_table(&name).await? {
                schema.add_table(table);
            }
        }

        Ok(schema)
    }
}

/// Pick the introspector matching the connection's dialect.
///
/// `schema` selects the PostgreSQL schema and is ignored elsewhere.
pub fn introspector_for<'a>(
    connection: &'a DatabaseConnection,
    schema: Option<&str>,
) -> Box<dyn Introspector + 'a> {
    match connection {
        DatabaseConnection::Postgres(pool) => {
            Box::new(PostgresIntrospector::new(pool, schema.unwrap_or("public")))
        }
        DatabaseConnection::MySql(pool) => Box::new(MySqlIntrospector::new(pool)),
        DatabaseConnection::Sqlite(pool) => Box::new(SqliteIntrospector::new(pool)),
    }
}

static NATIVE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z][a-z0-9_]*)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?")
        .expect("native type pattern is valid")
});

/// A native column type split into its base name and modifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NativeType {
    /// Lowercase base name, e.g. `varchar`
    pub base: String,
    /// First modifier: length, or precision for numeric types
    pub length: Option<u32>,
    /// Second modifier: scale for numeric types
    pub scale: Option<u32>,
}

impl NativeType {
    /// Parse `varchar(100)`, `decimal(10,2)`, `int unsigned` and the like
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();

        match NATIVE_TYPE.captures(&lowered) {
            Some(captures) => Self {
                base: captures[1].to_string(),
                length: captures.get(2).and_then(|m| m.as_str().parse().ok()),
                scale: captures.get(3).and_then(|m| m.as_str().parse().ok()),
            },
            None => Self {
                base: lowered,
                length: None,
                scale: None,
            },
        }
    }
}

/// Apply only the dimensions that are structural for the column type
pub(crate) fn with_dimensions(
    column: Column,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> Column {
    let column_type = column.column_type();
    let mut column = column;

    if column_type.has_length() {
        if let Some(length) = length {
            column = column.length(length);
        }
    }

    if column_type == ColumnType::Decimal {
        if let Some(precision) = precision {
            column = column.precision(precision);
        }
        if let Some(scale) = scale {
            column = column.scale(scale);
        }
    }

    column
}

/// Turn a catalog default expression into a canonical value.
///
/// Quotes are stripped and `''` unescaped, `NULL` becomes absent, booleans
/// and numbers are parsed according to the column type. Anything else is
/// kept verbatim as a string.
pub fn normalize_default(raw: Option<&str>, column_type: ColumnType) -> Option<Scalar> {
    let mut value = raw?.trim();

    while value.len() >= 2 && value.starts_with('(') && value.ends_with(')') {
        value = value[1..value.len() - 1].trim();
    }

    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        return None;
    }

    let (text, quoted) = match unquote(value) {
        Some(inner) => (inner, true),
        None => (value.to_string(), false),
    };

    if column_type == ColumnType::Boolean {
        match text.to_lowercase().as_str() {
            "1" | "true" | "t" | "b'1'" => return Some(Scalar::Bool(true)),
            "0" | "false" | "f" | "b'0'" => return Some(Scalar::Bool(false)),
            _ => {}
        }
    }

    if column_type.is_numeric() || (column_type == ColumnType::Boolean && !quoted) {
        if let Ok(int) = text.parse::<i64>() {
            return Some(Scalar::Int(int));
        }
        if let Ok(float) = text.parse::<f64>() {
            return Some(Scalar::Float(float));
        }
    }

    Some(Scalar::String(text))
}

/// Strip one level of single quotes, unescaping doubled quotes inside
fn unquote(value: &str) -> Option<String> {
    let inner = value.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace("''", "'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_native_types() {
        assert_eq!(
            NativeType::parse("VARCHAR(100)"),
            NativeType { base: "varchar".into(), length: Some(100), scale: None }
        );
        assert_eq!(
            NativeType::parse("decimal(10, 2)"),
            NativeType { base: "decimal".into(), length: Some(10), scale: Some(2) }
        );
        assert_eq!(NativeType::parse("int unsigned").base, "int");
        assert_eq!(NativeType::parse("TEXT").length, None);
    }

    #[test]
    fn normalizes_quoted_strings() {
        assert_eq!(
            normalize_default(Some("'it''s'"), ColumnType::String),
            Some(Scalar::String("it's".into()))
        );
        assert_eq!(
            normalize_default(Some("guest"), ColumnType::String),
            Some(Scalar::String("guest".into()))
        );
    }

    #[test]
    fn normalizes_null_and_missing() {
        assert_eq!(normalize_default(None, ColumnType::Text), None);
        assert_eq!(normalize_default(Some("NULL"), ColumnType::Text), None);
        assert_eq!(normalize_default(Some("  "), ColumnType::Text), None);
    }

    #[test]
    fn normalizes_by_column_type() {
        assert_eq!(normalize_default(Some("1"), ColumnType::Boolean), Some(Scalar::Bool(true)));
        assert_eq!(normalize_default(Some("false"), ColumnType::Boolean), Some(Scalar::Bool(false)));
        assert_eq!(normalize_default(Some("(42)"), ColumnType::Integer), Some(Scalar::Int(42)));
        assert_eq!(normalize_default(Some("'7'"), ColumnType::Bigint), Some(Scalar::Int(7)));
        assert_eq!(normalize_default(Some("9.5"), ColumnType::Decimal), Some(Scalar::Float(9.5)));
        assert_eq!(
            normalize_default(Some("42"), ColumnType::String),
            Some(Scalar::String("42".into()))
        );
    }
}
