//! PostgreSQL catalog introspection

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{FromRow, PgPool};

use super::{normalize_default, with_dimensions, Introspector};
use crate::error::Result;
use crate::schema::types::{Column, ColumnType, Index, Scalar, Table};

#[derive(FromRow)]
struct TableRow {
    tablename: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    udt_name: String,
    is_nullable: String,
    column_default: Option<String>,
    character_maximum_length: Option<i32>,
    numeric_precision: Option<i32>,
    numeric_scale: Option<i32>,
    is_identity: String,
}

#[derive(FromRow)]
struct ConstraintRow {
    constraint_name: String,
    constraint_type: String,
    column_name: String,
}

static CAST_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)::[a-z_][a-z0-9_ ]*(?:\[\])?$").expect("cast pattern is valid")
});

/// Introspector for one PostgreSQL schema
pub struct PostgresIntrospector<'a> {
    pool: &'a PgPool,
    schema: String,
}

impl<'a> PostgresIntrospector<'a> {
    pub fn new(pool: &'a PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnRow>> {
        let sql = r#"
            SELECT
                column_name::text AS column_name,
                udt_name::text AS udt_name,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default,
                character_maximum_length::int4 AS character_maximum_length,
                numeric_precision::int4 AS numeric_precision,
                numeric_scale::int4 AS numeric_scale,
                is_identity::text AS is_identity
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;

        Ok(sqlx::query_as::<_, ColumnRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await?)
    }

    async fn constraints(&self, table: &str) -> Result<Vec<ConstraintRow>> {
        let sql = r#"
            SELECT
                tc.constraint_name::text AS constraint_name,
                tc.constraint_type::text AS constraint_type,
                kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = $1
                AND tc.table_name = $2
                AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
            ORDER BY tc.constraint_name, kcu.ordinal_position
        "#;

        Ok(sqlx::query_as::<_, ConstraintRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await?)
    }
}

#[async_trait]
impl<'a> Introspector for PostgresIntrospector<'a> {
    async fn table_names(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT tablename::text AS tablename
            FROM pg_catalog.pg_tables
            WHERE schemaname = $1
            ORDER BY tablename
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(&self.schema)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.tablename).collect())
    }

    async fn introspect_table(&self, name: &str) -> Result<Option<Table>> {
        let column_rows = self.columns(name).await?;
        if column_rows.is_empty() {
            return Ok(None);
        }

        let mut constraints: IndexMap<String, (String, Vec<String>)> = IndexMap::new();
        for row in self.constraints(name).await? {
            constraints
                .entry(row.constraint_name)
                .or_insert_with(|| (row.constraint_type, Vec::new()))
                .1
                .push(row.column_name);
        }

        let is_primary = |column: &str| {
            constraints
                .values()
                .any(|(kind, columns)| kind == "PRIMARY KEY" && columns.iter().any(|c| c == column))
        };
        let is_unique = |column: &str| {
            constraints
                .values()
                .any(|(kind, columns)| kind == "UNIQUE" && columns.len() == 1 && columns[0] == column)
        };

        let mut table = Table::new(name);
        for row in column_rows {
            let column_type = map_type(&row.udt_name);
            let (default, serial) = split_default(row.column_default.as_deref(), column_type);

            let column = Column::new(&row.column_name, column_type)
                .nullable(row.is_nullable == "YES")
                .unique(is_unique(&row.column_name))
                .primary_key(is_primary(&row.column_name))
                .auto_increment(serial || row.is_identity == "YES");
            let column = match default {
                Some(value) => column.default_value(value),
                None => column,
            };

            table = table.with_column(with_dimensions(
                column,
                row.character_maximum_length.and_then(|v| u32::try_from(v).ok()),
                row.numeric_precision.and_then(|v| u32::try_from(v).ok()),
                row.numeric_scale.and_then(|v| u32::try_from(v).ok()),
            ))?;
        }

        for (constraint_name, (kind, columns)) in constraints {
            let primary = kind == "PRIMARY KEY";
            table = table.with_index(
                Index::new(constraint_name, columns)
                    .unique(true)
                    .primary(primary),
            );
        }

        Ok(Some(table))
    }
}

/// Map a PostgreSQL `udt_name` onto a canonical type
fn map_type(udt_name: &str) -> ColumnType {
    if udt_name.starts_with('_') {
        return ColumnType::Array;
    }

    match udt_name {
        "int2" => ColumnType::Smallint,
        "int4" => ColumnType::Integer,
        "int8" => ColumnType::Bigint,
        "numeric" => ColumnType::Decimal,
        "float4" => ColumnType::SmallFloat,
        "float8" => ColumnType::Float,
        "varchar" | "bpchar" => ColumnType::String,
        "text" => ColumnType::Text,
        "uuid" => ColumnType::Uuid,
        "bytea" => ColumnType::Blob,
        "bool" => ColumnType::Boolean,
        "date" => ColumnType::Date,
        "timestamp" => ColumnType::Datetime,
        "timestamptz" => ColumnType::DatetimeTz,
        "time" | "timetz" => ColumnType::Time,
        "json" | "jsonb" => ColumnType::Json,
        _ => ColumnType::String,
    }
}

/// Split a column default into its value and whether it is a sequence.
///
/// Sequence defaults are cleared; `'x'::type` casts are stripped before
/// the shared normalization.
fn split_default(raw: Option<&str>, column_type: ColumnType) -> (Option<Scalar>, bool) {
    let Some(raw) = raw else {
        return (None, false);
    };

    if raw.trim_start().starts_with("nextval(") {
        return (None, true);
    }

    let uncast = match CAST_SUFFIX.captures(raw.trim()) {
        Some(captures) => captures[1].to_string(),
        None => raw.to_string(),
    };

    (normalize_default(Some(&uncast), column_type), false)
}
