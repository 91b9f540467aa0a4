//! DDL grammars
//!
//! A grammar renders canonical tables and columns into SQL for one dialect.
//! The [`Grammar`] trait's provided methods hold the behaviour shared by all
//! dialects; each implementation overrides only what diverges.

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlGrammar;
pub use postgres::PostgresGrammar;
pub use sqlite::SqliteGrammar;
pub use sqlserver::SqlServerGrammar;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::types::{
    Column, ColumnType, Scalar, DEFAULT_LENGTH, DEFAULT_PRECISION, DEFAULT_SCALE,
};

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
    SqlServer,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::Sqlite,
        Dialect::SqlServer,
    ];

    /// The driver identifier used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "pgsql",
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlsrv",
        }
    }

    /// Instantiate the DDL grammar for this dialect
    pub fn grammar(&self) -> Box<dyn Grammar> {
        match self {
            Dialect::MySql => Box::new(MySqlGrammar),
            Dialect::Postgres => Box::new(PostgresGrammar),
            Dialect::Sqlite => Box::new(SqliteGrammar),
            Dialect::SqlServer => Box::new(SqlServerGrammar),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "sqlsrv" | "mssql" | "sqlserver" => Ok(Dialect::SqlServer),
            _ => Err(Error::UnsupportedDialect(s.to_string())),
        }
    }
}

/// Dialect-specific DDL compiler.
///
/// Statements are returned without a trailing semicolon.
pub trait Grammar: Send + Sync {
    /// The dialect this grammar targets
    fn dialect(&self) -> Dialect;

    /// Clause appended to auto-increment columns. Empty when the column
    /// type already encodes the behaviour.
    fn auto_increment_sql(&self) -> &'static str;

    /// Opening and closing identifier quote characters
    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    /// Quote an identifier. The `*` wildcard is never quoted.
    fn wrap(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }

        let (open, close) = self.quote_chars();
        let escaped = value.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// The full SQL type clause for a column
    fn get_type(&self, column: &Column) -> String {
        generic_type(column)
    }

    /// The column as this dialect's catalog reports it back once created.
    /// Dialects that store several canonical kinds alike override this so
    /// a desired column compares equal to its introspected counterpart.
    fn stored_column(&self, column: &Column) -> Column {
        column.clone()
    }

    /// Render a default value
    fn format_default(&self, value: &Scalar) -> String {
        value.format_default()
    }

    /// `name type [NOT NULL] [DEFAULT x] [UNIQUE] [PRIMARY KEY] [auto-increment]`
    fn compile_column(&self, column: &Column) -> String {
        let mut sql = format!("{} {}", self.wrap(column.name()), self.get_type(column));

        if !column.is_nullable() {
            sql.push_str(" NOT NULL");
        }

        if let Some(default) = column.get_default() {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.format_default(default));
        }

        if column.is_unique() {
            sql.push_str(" UNIQUE");
        }

        if column.is_primary_key() {
            sql.push_str(" PRIMARY KEY");
        }

        if column.is_auto_increment() {
            let clause = self.auto_increment_sql();
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(clause);
            }
        }

        sql
    }

    fn compile_create_table(&self, table: &str, columns: &[&Column]) -> String {
        let definitions: Vec<String> = columns
            .iter()
            .map(|column| self.compile_column(column))
            .collect();

        format!(
            "CREATE TABLE {} ({})",
            self.wrap(table),
            definitions.join(", ")
        )
    }

    fn compile_drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.wrap(table))
    }

    fn compile_add_column(&self, table: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.wrap(table),
            self.compile_column(column)
        )
    }

    fn compile_drop_column(&self, table: &str, column_name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.wrap(table),
            self.wrap(column_name)
        )
    }

    /// Redefine `old` as `new`. Fails for dialects that cannot alter a
    /// column in place.
    fn compile_modify_column(&self, table: &str, _old: &Column, new: &Column) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.wrap(table),
            self.compile_column(new)
        ))
    }
}

/// Canonical-type-to-SQL mapping shared by every dialect
pub fn generic_type(column: &Column) -> String {
    let length = column.get_length().unwrap_or(DEFAULT_LENGTH);

    match column.column_type() {
        ColumnType::Smallint => "SMALLINT".to_string(),
        ColumnType::Integer => "INT".to_string(),
        ColumnType::Bigint => "BIGINT".to_string(),
        ColumnType::Decimal => format!("NUMERIC({}, {})", precision(column), scale(column)),
        ColumnType::SmallFloat => "REAL".to_string(),
        ColumnType::Float => "DOUBLE".to_string(),
        ColumnType::String => format!("VARCHAR({length})"),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::Uuid => "CHAR(36)".to_string(),
        ColumnType::Binary => format!("VARBINARY({length})"),
        ColumnType::Blob => "BLOB".to_string(),
        ColumnType::Boolean => "BOOLEAN".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Datetime => "DATETIME".to_string(),
        ColumnType::DatetimeTz => "TIMESTAMP".to_string(),
        ColumnType::Time => "TIME".to_string(),
        ColumnType::Json => "JSON".to_string(),
        ColumnType::Array => "LONGTEXT".to_string(),
    }
}

pub(crate) fn precision(column: &Column) -> u32 {
    column.get_precision().unwrap_or(DEFAULT_PRECISION)
}

pub(crate) fn scale(column: &Column) -> u32 {
    column.get_scale().unwrap_or(DEFAULT_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_dialect_aliases() {
        assert_eq!("pgsql".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("sqlite".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::SqlServer);
    }

    #[test]
    fn rejects_unknown_dialects() {
        let err = "oracle".parse::<Dialect>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedDialect(ref d) if d == "oracle"));
    }

    #[test]
    fn wildcard_is_never_wrapped() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.grammar().wrap("*"), "*");
        }
    }

    #[test]
    fn escapes_quote_characters_inside_identifiers() {
        assert_eq!(PostgresGrammar.wrap("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(MySqlGrammar.wrap("we`ird"), "`we``ird`");
        assert_eq!(SqlServerGrammar.wrap("we]ird"), "[we]]ird]");
    }

    #[test]
    fn generic_type_applies_fallbacks() {
        assert_eq!(generic_type(&Column::new("s", ColumnType::String)), "VARCHAR(255)");
        assert_eq!(
            generic_type(&Column::new("d", ColumnType::Decimal).precision(8).scale(2)),
            "NUMERIC(8, 2)"
        );
        assert_eq!(generic_type(&Column::new("d", ColumnType::Decimal)), "NUMERIC(10, 0)");
    }
}
