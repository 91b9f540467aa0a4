//! SQLite catalog introspection
//!
//! SQLite keeps declared type names verbatim, so the mapping below reverses
//! the SQLite grammar's declared names. Auto-increment keys are always
//! declared `INTEGER` and come back as `integer`.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{normalize_default, with_dimensions, Introspector, NativeType};
use crate::error::Result;
use crate::grammar::{Grammar, SqliteGrammar};
use crate::schema::types::{Column, ColumnType, Index, Table};

/// Introspector for a SQLite database
pub struct SqliteIntrospector<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SqliteIntrospector<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    async fn create_sql(&self, table: &str) -> Result<String> {
        let sql = sqlx::query_scalar::<_, Option<String>>(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_optional(self.pool)
        .await?
        .flatten();

        Ok(sql.unwrap_or_default())
    }

    /// Unique indexes as `(name, origin, columns)`
    async fn unique_indexes(&self, table: &str) -> Result<Vec<(String, String, Vec<String>)>> {
        let list_sql = format!("PRAGMA index_list({})", SqliteGrammar.wrap(table));
        let rows = sqlx::query(&list_sql).fetch_all(self.pool).await?;

        let mut indexes = Vec::new();
        for row in rows {
            let unique: i64 = row.try_get("unique")?;
            if unique == 0 {
                continue;
            }

            let index_name: String = row.try_get("name")?;
            let origin: String = row.try_get("origin")?;

            let info_sql = format!("PRAGMA index_info({})", SqliteGrammar.wrap(&index_name));
            let columns = sqlx::query(&info_sql)
                .fetch_all(self.pool)
                .await?
                .iter()
                .map(|info| info.try_get::<String, _>("name"))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            indexes.push((index_name, origin, columns));
        }

        Ok(indexes)
    }
}

#[async_trait]
impl<'a> Introspector for SqliteIntrospector<'a> {
    async fn table_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(names)
    }

    async fn introspect_table(&self, name: &str) -> Result<Option<Table>> {
        let sql = format!("PRAGMA table_info({})", SqliteGrammar.wrap(name));
        let rows = sqlx::query(&sql).fetch_all(self.pool).await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let autoincrement = self
            .create_sql(name)
            .await?
            .to_uppercase()
            .contains("AUTOINCREMENT");
        let indexes = self.unique_indexes(name).await?;

        let mut table = Table::new(name);
        let mut primary_columns = Vec::new();

        for row in rows {
            let column_name: String = row.try_get("name")?;
            let declared: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;
            let default: Option<String> = row.try_get("dflt_value")?;
            let pk: i64 = row.try_get("pk")?;

            let native = NativeType::parse(&declared);
            let column_type = map_type(&native);
            let primary_key = pk > 0;

            let unique = indexes.iter().any(|(_, origin, columns)| {
                origin == "u" && columns.len() == 1 && columns[0] == column_name
            });

            let column = Column::new(&column_name, column_type)
                .nullable(not_null == 0)
                .unique(unique)
                .primary_key(primary_key)
                .auto_increment(primary_key && autoincrement && native.base == "integer");
            let column = match normalize_default(default.as_deref(), column_type) {
                Some(value) => column.default_value(value),
                None => column,
            };

            if primary_key {
                primary_columns.push(column_name);
            }

            table = table.with_column(with_dimensions(
                column,
                native.length,
                native.length,
                native.scale,
            ))?;
        }

        if !primary_columns.is_empty() {
            table = table.with_index(Index::new("primary", primary_columns).primary(true));
        }
        for (index_name, origin, columns) in indexes {
            if origin != "pk" {
                table = table.with_index(Index::new(index_name, columns).unique(true));
            }
        }

        Ok(Some(table))
    }
}

/// Map a declared SQLite type onto a canonical type
fn map_type(native: &NativeType) -> ColumnType {
    match native.base.as_str() {
        "integer" | "int" | "mediumint" => ColumnType::Integer,
        "tinyint" | "smallint" => ColumnType::Smallint,
        "bigint" => ColumnType::Bigint,
        "boolean" | "bool" => ColumnType::Boolean,
        "numeric" | "decimal" => ColumnType::Decimal,
        "real" => ColumnType::SmallFloat,
        "double" | "float" => ColumnType::Float,
        "char" | "uuid" => ColumnType::Uuid,
        "text" | "clob" => ColumnType::Text,
        "longtext" => ColumnType::Array,
        "json" => ColumnType::Json,
        "varbinary" | "binary" => ColumnType::Binary,
        "blob" => ColumnType::Blob,
        "date" => ColumnType::Date,
        "datetime" => ColumnType::Datetime,
        "timestamp" => ColumnType::DatetimeTz,
        "time" => ColumnType::Time,
        _ => ColumnType::String,
    }
}
