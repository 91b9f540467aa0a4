//! MySQL catalog introspection

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::{FromRow, MySqlPool};

use super::{normalize_default, with_dimensions, Introspector, NativeType};
use crate::error::Result;
use crate::schema::types::{Column, ColumnType, Index, Table};

// information_schema columns are cast to CHAR so they decode as strings on
// every server version.

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
    column_key: String,
    extra: String,
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
    column_name: String,
}

/// Introspector for the current MySQL database
pub struct MySqlIntrospector<'a> {
    pool: &'a MySqlPool,
}

impl<'a> MySqlIntrospector<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    async fn unique_indexes(&self, table: &str) -> Result<Vec<IndexRow>> {
        let sql = r#"
            SELECT
                CAST(index_name AS CHAR) AS index_name,
                CAST(column_name AS CHAR) AS column_name
            FROM information_schema.statistics
            WHERE table_schema = DATABASE() AND table_name = ? AND non_unique = 0
            ORDER BY index_name, seq_in_index
        "#;

        Ok(sqlx::query_as::<_, IndexRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await?)
    }
}

#[async_trait]
impl<'a> Introspector for MySqlIntrospector<'a> {
    async fn table_names(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.table_name).collect())
    }

    async fn introspect_table(&self, name: &str) -> Result<Option<Table>> {
        let sql = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(column_type AS CHAR) AS column_type,
                CAST(is_nullable AS CHAR) AS is_nullable,
                CAST(column_default AS CHAR) AS column_default,
                CAST(column_key AS CHAR) AS column_key,
                CAST(extra AS CHAR) AS extra
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(name)
            .fetch_all(self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut table = Table::new(name);
        for row in rows {
            let native = NativeType::parse(&row.column_type);
            let column_type = map_type(&native);

            let column = Column::new(&row.column_name, column_type)
                .nullable(row.is_nullable == "YES")
                .unique(row.column_key == "UNI")
                .primary_key(row.column_key == "PRI")
                .auto_increment(row.extra.to_lowercase().contains("auto_increment"));
            let column = match normalize_default(row.column_default.as_deref(), column_type) {
                Some(value) => column.default_value(value),
                None => column,
            };

            table = table.with_column(with_dimensions(
                column,
                native.length,
                native.length,
                native.scale,
            ))?;
        }

        let mut indexes: IndexMap<String, Vec<String>> = IndexMap::new();
        for row in self.unique_indexes(name).await? {
            indexes.entry(row.index_name).or_default().push(row.column_name);
        }
        for (index_name, columns) in indexes {
            let primary = index_name == "PRIMARY";
            table = table.with_index(Index::new(index_name, columns).unique(true).primary(primary));
        }

        Ok(Some(table))
    }
}

/// Map a parsed MySQL `column_type` onto a canonical type
fn map_type(native: &NativeType) -> ColumnType {
    match native.base.as_str() {
        "tinyint" if native.length == Some(1) => ColumnType::Boolean,
        "bool" | "boolean" => ColumnType::Boolean,
        "tinyint" | "smallint" => ColumnType::Smallint,
        "mediumint" | "int" | "integer" => ColumnType::Integer,
        "bigint" => ColumnType::Bigint,
        "decimal" | "numeric" => ColumnType::Decimal,
        "float" => ColumnType::SmallFloat,
        "double" | "real" => ColumnType::Float,
        "char" if native.length == Some(36) => ColumnType::Uuid,
        "varchar" | "char" => ColumnType::String,
        "tinytext" | "text" | "mediumtext" => ColumnType::Text,
        "longtext" => ColumnType::Array,
        "binary" | "varbinary" => ColumnType::Binary,
        "tinyblob" | "blob" | "mediumblob" | "longblob" => ColumnType::Blob,
        "date" => ColumnType::Date,
        "datetime" => ColumnType::Datetime,
        "timestamp" => ColumnType::DatetimeTz,
        "time" => ColumnType::Time,
        "json" => ColumnType::Json,
        _ => ColumnType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn maps_column_types() {
        let map = |raw: &str| map_type(&NativeType::parse(raw));

        assert_eq!(map("tinyint(1)"), ColumnType::Boolean);
        assert_eq!(map("tinyint(4)"), ColumnType::Smallint);
        assert_eq!(map("int(11) unsigned"), ColumnType::Integer);
        assert_eq!(map("char(36)"), ColumnType::Uuid);
        assert_eq!(map("char(2)"), ColumnType::String);
        assert_eq!(map("decimal(10,2)"), ColumnType::Decimal);
        assert_eq!(map("longtext"), ColumnType::Array);
        assert_eq!(map("timestamp"), ColumnType::DatetimeTz);
        assert_eq!(map("geometry"), ColumnType::String);
    }
}
