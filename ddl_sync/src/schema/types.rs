//! Type definitions for the canonical schema model
//!
//! Both the entity side (desired state) and the database side (actual state)
//! are expressed with these types, so they can be compared directly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Length assumed for `string` and `binary` columns that do not declare one.
pub const DEFAULT_LENGTH: u32 = 255;
/// Precision assumed for `decimal` columns that do not declare one.
pub const DEFAULT_PRECISION: u32 = 10;
/// Scale assumed for `decimal` columns that do not declare one.
pub const DEFAULT_SCALE: u32 = 0;

/// Portable column kinds understood by every grammar and introspector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Smallint,
    Integer,
    Bigint,
    Decimal,
    SmallFloat,
    Float,
    String,
    Text,
    Uuid,
    Binary,
    Blob,
    Boolean,
    Date,
    Datetime,
    DatetimeTz,
    Time,
    Json,
    Array,
}

impl ColumnType {
    /// Every canonical column type, in declaration order
    pub const ALL: [ColumnType; 18] = [
        ColumnType::Smallint,
        ColumnType::Integer,
        ColumnType::Bigint,
        ColumnType::Decimal,
        ColumnType::SmallFloat,
        ColumnType::Float,
        ColumnType::String,
        ColumnType::Text,
        ColumnType::Uuid,
        ColumnType::Binary,
        ColumnType::Blob,
        ColumnType::Boolean,
        ColumnType::Date,
        ColumnType::Datetime,
        ColumnType::DatetimeTz,
        ColumnType::Time,
        ColumnType::Json,
        ColumnType::Array,
    ];

    /// The canonical name used in entity metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Smallint => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::Bigint => "bigint",
            ColumnType::Decimal => "decimal",
            ColumnType::SmallFloat => "small_float",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Uuid => "uuid",
            ColumnType::Binary => "binary",
            ColumnType::Blob => "blob",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Datetime => "datetime",
            ColumnType::DatetimeTz => "datetime_tz",
            ColumnType::Time => "time",
            ColumnType::Json => "json",
            ColumnType::Array => "array",
        }
    }

    /// Comma-separated list of every canonical name
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(ColumnType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Smallint | ColumnType::Integer | ColumnType::Bigint
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                ColumnType::Decimal | ColumnType::SmallFloat | ColumnType::Float
            )
    }

    /// Whether the declared length is part of the column's structure
    pub fn has_length(&self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Binary)
    }

    /// Infer a canonical type from the textual rendering of a Rust field type.
    ///
    /// `Option<T>` is unwrapped first; whitespace is ignored so the output of
    /// `stringify!` and of `ToTokens` are both accepted.
    pub fn infer(rust_type: &str) -> Option<ColumnType> {
        let compact: String =
            rust_type.chars().filter(|c| !c.is_whitespace()).collect();
        let (inner, _) = split_option(&compact);

        if inner == "Vec<u8>" || inner == "&[u8]" || inner == "[u8]" {
            return Some(ColumnType::Blob);
        }

        let base = inner.split('<').next().unwrap_or(inner);
        let base = base.rsplit("::").next().unwrap_or(base);

        let inferred = match base {
            "i8" | "i16" | "u8" => ColumnType::Smallint,
            "i32" | "u16" => ColumnType::Integer,
            "i64" | "u32" | "u64" | "isize" | "usize" => ColumnType::Bigint,
            "f32" => ColumnType::SmallFloat,
            "f64" => ColumnType::Float,
            "bool" => ColumnType::Boolean,
            "String" | "str" | "&str" | "char" => ColumnType::String,
            "Uuid" => ColumnType::Uuid,
            "NaiveDate" | "Date" => ColumnType::Date,
            "NaiveDateTime" | "PrimitiveDateTime" => ColumnType::Datetime,
            "DateTime" | "OffsetDateTime" => ColumnType::DatetimeTz,
            "NaiveTime" | "Time" => ColumnType::Time,
            "Decimal" | "BigDecimal" => ColumnType::Decimal,
            "Value" | "Json" | "JsonValue" => ColumnType::Json,
            "Vec" | "HashSet" | "BTreeSet" => ColumnType::Array,
            _ => return None,
        };

        Some(inferred)
    }
}

/// Split `Option<T>` into `(T, true)`; any other type is returned as is.
pub(crate) fn split_option(compact: &str) -> (&str, bool) {
    let unwrapped = compact
        .strip_prefix("Option<")
        .or_else(|| compact.strip_prefix("std::option::Option<"))
        .or_else(|| compact.strip_prefix("core::option::Option<"))
        .and_then(|rest| rest.strip_suffix('>'));

    match unwrapped {
        Some(inner) => (inner, true),
        None => (compact, false),
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ColumnType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidColumnType(s.to_string()))
    }
}

/// A scalar value used for column defaults and dialect options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Render the value the way it appears after `DEFAULT` in DDL.
    ///
    /// Strings are single-quoted with embedded quotes doubled, booleans
    /// become `1`/`0`, null becomes the `NULL` keyword.
    pub fn format_default(&self) -> String {
        match self {
            Scalar::String(s) => format!("'{}'", s.replace('\'', "''")),
            Scalar::Bool(true) => "1".to_string(),
            Scalar::Bool(false) => "0".to_string(),
            Scalar::Null => "NULL".to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

/// Represents a table column.
///
/// Columns are assembled with the consuming builder methods and are
/// read-only once placed in a [`Table`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    name: String,
    #[serde(rename = "type")]
    column_type: ColumnType,
    length: Option<u32>,
    nullable: bool,
    default: Option<Scalar>,
    unique: bool,
    primary_key: bool,
    auto_increment: bool,
    precision: Option<u32>,
    scale: Option<u32>,
    options: IndexMap<String, Scalar>,
}

impl Column {
    /// Create a non-nullable column with no default and no constraints
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: None,
            nullable: false,
            default: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
            precision: None,
            scale: None,
            options: IndexMap::new(),
        }
    }

    /// Create a column from a canonical type name, rejecting unknown names
    pub fn with_type_name(name: impl Into<String>, type_name: &str) -> Result<Self> {
        let column_type = type_name.parse::<ColumnType>()?;
        Ok(Self::new(name, column_type))
    }

    /// Replace the column type, keeping every other attribute
    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default_value(mut self, default: impl Into<Scalar>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Mark the column as (part of) the primary key. Primary key columns
    /// are never nullable.
    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        if primary_key {
            self.nullable = false;
        }
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn get_length(&self) -> Option<u32> {
        self.length
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn get_default(&self) -> Option<&Scalar> {
        self.default.as_ref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn get_precision(&self) -> Option<u32> {
        self.precision
    }

    pub fn get_scale(&self) -> Option<u32> {
        self.scale
    }

    pub fn options(&self) -> &IndexMap<String, Scalar> {
        &self.options
    }

    /// Structural equality, ignoring the name and `options`.
    ///
    /// Lengths only count for `string`/`binary` and precision/scale only for
    /// `decimal`; absent values compare as the grammar fallbacks
    /// ([`DEFAULT_LENGTH`], [`DEFAULT_PRECISION`], [`DEFAULT_SCALE`]).
    pub fn equals(&self, other: &Column) -> bool {
        self.column_type == other.column_type
            && self.effective_length() == other.effective_length()
            && self.nullable == other.nullable
            && self.formatted_default() == other.formatted_default()
            && self.unique == other.unique
            && self.primary_key == other.primary_key
            && self.auto_increment == other.auto_increment
            && self.effective_precision() == other.effective_precision()
            && self.effective_scale() == other.effective_scale()
    }

    fn formatted_default(&self) -> String {
        self.default
            .as_ref()
            .map_or_else(|| Scalar::Null.format_default(), Scalar::format_default)
    }

    fn effective_length(&self) -> Option<u32> {
        self.column_type
            .has_length()
            .then(|| self.length.unwrap_or(DEFAULT_LENGTH))
    }

    fn effective_precision(&self) -> Option<u32> {
        (self.column_type == ColumnType::Decimal)
            .then(|| self.precision.unwrap_or(DEFAULT_PRECISION))
    }

    fn effective_scale(&self) -> Option<u32> {
        (self.column_type == ColumnType::Decimal).then(|| self.scale.unwrap_or(DEFAULT_SCALE))
    }
}

/// Represents an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique: false,
            is_primary: false,
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.is_unique = unique;
        self
    }

    /// Primary indexes are always unique
    pub fn primary(mut self, primary: bool) -> Self {
        self.is_primary = primary;
        if primary {
            self.is_unique = true;
        }
        self
    }
}

/// Represents a database table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    name: String,
    columns: IndexMap<String, Column>,
    indexes: IndexMap<String, Index>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    /// Append a column. Column names are unique within a table.
    pub fn with_column(mut self, column: Column) -> Result<Self> {
        if self.columns.contains_key(column.name()) {
            return Err(Error::MetadataError(format!(
                "column \"{}\" is declared twice on table \"{}\"",
                column.name(),
                self.name
            )));
        }
        self.columns.insert(column.name().to_string(), column);
        Ok(self)
    }

    pub fn with_columns(self, columns: impl IntoIterator<Item = Column>) -> Result<Self> {
        columns
            .into_iter()
            .try_fold(self, |table, column| table.with_column(column))
    }

    /// Add an index, replacing any index with the same name
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.insert(index.name.clone(), index);
        self
    }

    /// Rewrite every column in place. `f` must keep column names.
    pub fn map_columns(mut self, mut f: impl FnMut(Column) -> Column) -> Self {
        self.columns = self
            .columns
            .into_iter()
            .map(|(name, column)| (name, f(column)))
            .collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column_list(&self) -> Vec<&Column> {
        self.columns.values().collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .values()
            .filter(|c| c.is_primary_key())
            .map(Column::name)
            .collect()
    }
}

/// Represents a complete database schema, keyed by table name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    tables: IndexMap<String, Table>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from tables; a later table replaces an earlier one
    /// with the same name.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        let mut schema = Self::new();
        for table in tables {
            schema.add_table(table);
        }
        schema
    }

    /// Add a table to the schema, returning the table it replaced
    pub fn add_table(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(table.name().to_string(), table)
    }

    /// Add a table, rejecting a name that is already present. `origin`
    /// describes where the table was declared; `origins` tracks earlier
    /// declarations for the error message.
    pub fn try_add_table(
        &mut self,
        table: Table,
        origin: &str,
        origins: &mut IndexMap<String, String>,
    ) -> Result<()> {
        if let Some(first) = origins.get(table.name()) {
            return Err(Error::DuplicateTable {
                table: table.name().to_string(),
                first: first.clone(),
                second: origin.to_string(),
            });
        }
        origins.insert(table.name().to_string(), origin.to_string());
        self.add_table(table);
        Ok(())
    }

    /// Remove a table, keeping the order of the remaining ones
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_every_canonical_name() {
        for column_type in ColumnType::ALL {
            assert_eq!(column_type.as_str().parse::<ColumnType>().unwrap(), column_type);
        }
    }

    #[test]
    fn rejects_unknown_type_names() {
        let err = Column::with_type_name("name", "varchar").unwrap_err();
        assert!(matches!(err, Error::InvalidColumnType(ref t) if t == "varchar"));
        assert!(err.to_string().contains("small_float"));
    }

    #[test]
    fn infers_types_from_rust_fields() {
        assert_eq!(ColumnType::infer("i32"), Some(ColumnType::Integer));
        assert_eq!(ColumnType::infer("Option < String >"), Some(ColumnType::String));
        assert_eq!(ColumnType::infer("Vec < u8 >"), Some(ColumnType::Blob));
        assert_eq!(ColumnType::infer("Vec<String>"), Some(ColumnType::Array));
        assert_eq!(
            ColumnType::infer("chrono::DateTime<chrono::Utc>"),
            Some(ColumnType::DatetimeTz)
        );
        assert_eq!(ColumnType::infer("uuid::Uuid"), Some(ColumnType::Uuid));
        assert_eq!(ColumnType::infer("MyNewtype"), None);
    }

    #[test]
    fn options_do_not_affect_equality() {
        let a = Column::new("bio", ColumnType::Text).option("collation", "utf8mb4_bin");
        let b = Column::new("bio", ColumnType::Text);
        assert!(a.equals(&b));
    }

    #[test]
    fn equality_covers_structural_fields() {
        let base = Column::new("email", ColumnType::String).length(255);
        assert!(!base.equals(&base.clone().nullable(true)));
        assert!(!base.equals(&base.clone().unique(true)));
        assert!(!base.equals(&base.clone().length(100)));
        assert!(!base.equals(&base.clone().default_value("x")));
        assert!(!base.equals(&Column::new("email", ColumnType::Text)));
    }

    #[test]
    fn equality_normalizes_grammar_fallbacks() {
        let declared = Column::new("name", ColumnType::String);
        let introspected = Column::new("name", ColumnType::String).length(DEFAULT_LENGTH);
        assert!(declared.equals(&introspected));

        let amount = Column::new("amount", ColumnType::Decimal);
        assert!(amount.equals(&Column::new("amount", ColumnType::Decimal).precision(10).scale(0)));
        assert!(!amount.equals(&Column::new("amount", ColumnType::Decimal).precision(12).scale(2)));

        let count = Column::new("count", ColumnType::Integer).precision(32);
        assert!(count.equals(&Column::new("count", ColumnType::Integer)));
    }

    #[test]
    fn defaults_compare_by_formatted_value() {
        let flag = Column::new("active", ColumnType::Boolean).default_value(true);
        assert!(flag.equals(&Column::new("active", ColumnType::Boolean).default_value(1)));
        assert!(Column::new("a", ColumnType::Text)
            .default_value(Scalar::Null)
            .equals(&Column::new("a", ColumnType::Text)));
    }

    #[test]
    fn formats_defaults() {
        assert_eq!(Scalar::from("it's").format_default(), "'it''s'");
        assert_eq!(Scalar::from(true).format_default(), "1");
        assert_eq!(Scalar::from(false).format_default(), "0");
        assert_eq!(Scalar::Null.format_default(), "NULL");
        assert_eq!(Scalar::from(42).format_default(), "42");
        assert_eq!(Scalar::from(1.5).format_default(), "1.5");
    }

    #[test]
    fn primary_key_implies_not_null() {
        let id = Column::new("id", ColumnType::Integer).nullable(true).primary_key(true);
        assert!(!id.is_nullable());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = Table::new("users")
            .with_column(Column::new("id", ColumnType::Integer))
            .and_then(|t| t.with_column(Column::new("id", ColumnType::Bigint)))
            .unwrap_err();
        assert!(matches!(err, Error::MetadataError(_)));
    }

    #[test]
    fn rejects_duplicate_tables_with_both_origins() {
        let mut schema = Schema::new();
        let mut origins = IndexMap::new();
        schema
            .try_add_table(Table::new("users"), "app::User", &mut origins)
            .unwrap();

        let err = schema
            .try_add_table(Table::new("users"), "legacy::Account", &mut origins)
            .unwrap_err();
        match err {
            Error::DuplicateTable { table, first, second } => {
                assert_eq!(table, "users");
                assert_eq!(first, "app::User");
                assert_eq!(second, "legacy::Account");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn keeps_declaration_order() {
        let table = Table::new("t")
            .with_columns(vec![
                Column::new("z", ColumnType::Integer),
                Column::new("a", ColumnType::Integer),
                Column::new("m", ColumnType::Integer),
            ])
            .unwrap();
        let names: Vec<_> = table.columns().map(Column::name).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }
}
