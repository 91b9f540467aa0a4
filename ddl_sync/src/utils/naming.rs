//! Naming utilities for ddl_sync
//!
//! Table names for entities that do not declare one, and default index
//! names, are derived here.

use inflector::Inflector;
use serde::{Deserialize, Serialize};

/// How table names are derived from entity type names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNaming {
    /// One of `snake_case`, `camel_case`, `pascal_case`,
    /// `screaming_snake_case`; anything else keeps the name as is
    pub style: String,
    pub pluralize: bool,
}

impl Default for TableNaming {
    fn default() -> Self {
        Self {
            style: "snake_case".to_string(),
            pluralize: true,
        }
    }
}

impl TableNaming {
    /// Table name for an entity type, e.g. `UserProfile` -> `user_profiles`
    pub fn table_name(&self, type_name: &str) -> String {
        get_table_name(type_name, &self.style, self.pluralize)
    }
}

/// Rewrite `name` in the given case convention
pub fn apply_naming_convention(name: &str, convention: &str) -> String {
    match convention {
        "snake_case" => name.to_snake_case(),
        "camel_case" => name.to_camel_case(),
        "pascal_case" => name.to_pascal_case(),
        "screaming_snake_case" => name.to_screaming_snake_case(),
        _ => name.to_string(),
    }
}

/// Fill the `{placeholder}`s of a pattern, e.g. `idx_{table}_{columns}`
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    replacements
        .iter()
        .fold(pattern.to_string(), |name, (placeholder, value)| {
            name.replace(&format!("{{{placeholder}}}"), value)
        })
}

/// Get table name from a type name according to convention
pub fn get_table_name(type_name: &str, style: &str, pluralize: bool) -> String {
    let name = apply_naming_convention(type_name, style);

    if pluralize {
        self::pluralize(&name)
    } else {
        name
    }
}

/// Default name of an index over `columns`
pub fn get_index_name(pattern: &str, table_name: &str, columns: &[String]) -> String {
    let joined = columns.join("_");
    format_name(pattern, &[("table", table_name), ("columns", &joined)])
}

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

/// Plural form of a table name
pub fn pluralize(name: &str) -> String {
    let lowered = name.to_lowercase();
    IRREGULAR_PLURALS
        .iter()
        .find(|(singular, _)| *singular == lowered)
        .map_or_else(|| name.to_plural(), |(_, plural)| plural.to_string())
}
