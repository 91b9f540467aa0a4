//! Declarative entity metadata
//!
//! `TableMeta`, `ColumnMeta` and `IndexMeta` are the attribute values of an
//! entity as written in source. Both the `Entity` derive and the source
//! scanner produce them from the `ddl_sync_attrs` grammar;
//! [`EntityMeta::into_table`] is the single place where they become a
//! canonical [`Table`].

use std::path::Path;

use ddl_sync_attrs::{
    parse_column_attr, parse_index_attr, parse_table_attr, ColumnAttr, IndexAttr, Literal,
};
use quote::ToTokens;
use syn::{Fields, ItemStruct};

use crate::error::{Error, Result};
use crate::schema::types::{split_option, Column, ColumnType, Index, Scalar, Table};
use crate::utils::naming::{get_index_name, TableNaming};

/// Pattern for indexes declared without a name
pub const INDEX_NAME_PATTERN: &str = "idx_{table}_{columns}";

/// Table-level metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableMeta {
    /// Explicit table name; derived from the type name when absent
    pub name: Option<String>,
    pub indexes: Vec<IndexMeta>,
}

/// A declared index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexMeta {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Column-level metadata of one persisted field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMeta {
    /// Field identifier, used when `name` is absent
    pub field: String,
    pub name: Option<String>,
    /// Canonical type name; inferred from `rust_type` when absent, falling
    /// back to `string` for types that cannot be inferred
    pub column_type: Option<String>,
    /// Textual rendering of the field's Rust type
    pub rust_type: String,
    pub length: Option<u32>,
    /// Explicit nullability; `Option<T>` fields are nullable otherwise
    pub nullable: Option<bool>,
    pub default: Option<Scalar>,
    pub unique: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub options: Vec<(String, Scalar)>,
}

impl ColumnMeta {
    /// Metadata of field `field` of type `rust_type`, as its `#[column]`
    /// attribute declares it
    pub fn from_attr(field: String, rust_type: String, attr: ColumnAttr) -> Self {
        Self {
            field,
            name: attr.name,
            column_type: attr.column_type,
            rust_type,
            length: attr.length,
            nullable: attr.nullable,
            default: attr.default.map(Scalar::from),
            unique: attr.unique,
            primary_key: attr.primary_key,
            auto_increment: attr.auto_increment,
            precision: attr.precision,
            scale: attr.scale,
            options: attr
                .options
                .into_iter()
                .map(|(key, value)| (key, Scalar::from(value)))
                .collect(),
        }
    }

    /// Build the canonical column. Unknown declared type names fail here.
    pub fn into_column(self) -> Result<Column> {
        let compact: String = self.rust_type.chars().filter(|c| !c.is_whitespace()).collect();
        let (_, optional) = split_option(&compact);

        let column_type = match &self.column_type {
            Some(type_name) => type_name.parse::<ColumnType>()?,
            None => ColumnType::infer(&self.rust_type).unwrap_or(ColumnType::String),
        };

        let name = self.name.unwrap_or(self.field);
        let mut column = Column::new(name, column_type)
            .nullable(self.nullable.unwrap_or(optional))
            .unique(self.unique)
            .primary_key(self.primary_key)
            .auto_increment(self.auto_increment);

        if let Some(length) = self.length {
            column = column.length(length);
        }
        if let Some(default) = self.default {
            column = column.default_value(default);
        }
        if let Some(precision) = self.precision {
            column = column.precision(precision);
        }
        if let Some(scale) = self.scale {
            column = column.scale(scale);
        }
        for (key, value) in self.options {
            column = column.option(key, value);
        }

        Ok(column)
    }
}

impl From<IndexAttr> for IndexMeta {
    fn from(attr: IndexAttr) -> Self {
        Self {
            name: attr.name,
            columns: attr.columns,
            unique: attr.unique,
        }
    }
}

impl From<Literal> for Scalar {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Null => Scalar::Null,
            Literal::Bool(value) => Scalar::Bool(value),
            Literal::Int(value) => Scalar::Int(value),
            Literal::Float(value) => Scalar::Float(value),
            Literal::Str(value) => Scalar::String(value),
        }
    }
}

/// Everything declared on one entity type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMeta {
    pub type_name: String,
    pub table: TableMeta,
    pub columns: Vec<ColumnMeta>,
}

impl EntityMeta {
    /// Build the canonical table, naming it by `naming` when no explicit
    /// name was declared.
    pub fn into_table(self, naming: &TableNaming) -> Result<Table> {
        let table_name = self
            .table
            .name
            .unwrap_or_else(|| naming.table_name(&self.type_name));

        let columns = self
            .columns
            .into_iter()
            .map(ColumnMeta::into_column)
            .collect::<Result<Vec<_>>>()?;
        let mut table = Table::new(&table_name).with_columns(columns)?;

        for index in self.table.indexes {
            if let Some(missing) = index.columns.iter().find(|c| !table.has_column(c)) {
                return Err(Error::MetadataError(format!(
                    "index on table \"{}\" references unknown column \"{}\"",
                    table_name, missing
                )));
            }

            let name = index
                .name
                .unwrap_or_else(|| get_index_name(INDEX_NAME_PATTERN, &table_name, &index.columns));
            table = table.with_index(Index::new(name, index.columns).unique(index.unique));
        }

        Ok(table)
    }
}

/// Read the entity metadata of a struct.
///
/// Returns `None` for structs without `#[table]`. Malformed attributes are
/// reported as a recoverable [`Error::DiscoveryError`] for `path`; a field
/// carrying `#[column]` on a struct without `#[table]` is a
/// [`Error::MetadataError`].
pub fn parse_struct(item: &ItemStruct, path: &Path) -> Result<Option<EntityMeta>> {
    let type_name = item.ident.to_string();
    let discovery = |e: syn::Error| Error::DiscoveryError {
        path: path.to_path_buf(),
        message: format!("{}: {}", type_name, e),
    };

    let mut table: Option<TableMeta> = None;
    let mut indexes: Vec<IndexMeta> = Vec::new();
    for attr in &item.attrs {
        if attr.path().is_ident("table") {
            table = Some(TableMeta {
                name: parse_table_attr(attr).map_err(discovery)?,
                indexes: Vec::new(),
            });
        } else if attr.path().is_ident("index") {
            indexes.push(parse_index_attr(attr).map_err(discovery)?.into());
        }
    }

    let fields = match &item.fields {
        Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
        Fields::Unnamed(unnamed) => unnamed.unnamed.iter().collect(),
        Fields::Unit => Vec::new(),
    };

    let mut columns = Vec::new();
    for field in fields {
        for attr in field.attrs.iter().filter(|a| a.path().is_ident("column")) {
            let Some(ident) = &field.ident else {
                return Err(Error::MetadataError(format!(
                    "{} has a #[column] on an unnamed field; only named fields can be columns",
                    type_name
                )));
            };
            let field_name = ident.to_string().trim_start_matches("r#").to_string();
            let rust_type = field.ty.to_token_stream().to_string();
            let attr = parse_column_attr(attr).map_err(discovery)?;
            columns.push(ColumnMeta::from_attr(field_name, rust_type, attr));
        }
    }

    let Some(mut table) = table else {
        if !columns.is_empty() {
            return Err(Error::MetadataError(format!(
                "{} declares #[column] fields but has no #[table] attribute",
                type_name
            )));
        }
        return Ok(None);
    };
    table.indexes = indexes;

    Ok(Some(EntityMeta {
        type_name,
        table,
        columns,
    }))
}
