//! Entity registry and schema reader
//!
//! Entities reach the reader in two ways: `#[derive(Entity)]` submits each
//! type into a static registry at compile time, and the source scanner reads
//! the same attributes from `.rs` files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use indexmap::IndexMap;
use syn::{parse_file, Item};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::EntitiesConfig;
use crate::error::{Error, Result};
use crate::models::metadata::{parse_struct, EntityMeta};
use crate::schema::types::{Schema, Table};
use crate::utils::naming::TableNaming;

/// A type that declares a table
pub trait Entity {
    /// The metadata declared on this type
    fn metadata() -> EntityMeta;

    /// Build the table definition, naming an unnamed table by the default
    /// convention
    fn table() -> Result<Table> {
        Self::metadata().into_table(&TableNaming::default())
    }
}

/// Registration record submitted by `#[derive(Entity)]`
pub struct EntityDef {
    pub type_name: &'static str,
    /// `file!()` of the declaring type
    pub source_file: &'static str,
    pub metadata: fn() -> EntityMeta,
}

inventory::collect!(EntityDef);

/// Every entity registered in the running binary
pub fn registered_entities() -> impl Iterator<Item = &'static EntityDef> {
    inventory::iter::<EntityDef>.into_iter()
}

/// Builds the desired schema from entity metadata
#[derive(Debug, Clone)]
pub struct EntitySchemaReader {
    recursive: bool,
    exclude: Vec<Pattern>,
    naming: TableNaming,
}

impl Default for EntitySchemaReader {
    fn default() -> Self {
        Self {
            recursive: true,
            exclude: Vec::new(),
            naming: TableNaming::default(),
        }
    }
}

impl EntitySchemaReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader configured from the `[entities]` section
    pub fn from_config(config: &EntitiesConfig) -> Result<Self> {
        let mut reader = Self::new()
            .recursive(config.recursive_scan)
            .naming(config.naming());

        for pattern in config.exclude_paths.iter().flatten() {
            reader = reader.exclude(pattern)?;
        }

        Ok(reader)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Skip files whose path matches the glob pattern
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        let pattern = Pattern::new(pattern).map_err(|e| {
            Error::ConfigError(format!("Invalid exclude pattern \"{}\": {}", pattern, e))
        })?;
        self.exclude.push(pattern);
        Ok(self)
    }

    pub fn naming(mut self, naming: TableNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Scan a directory of Rust sources for entities.
    ///
    /// Files that cannot be read or parsed are logged and skipped. Structs
    /// without `#[table]` are ignored.
    pub fn read(&self, directory: impl AsRef<Path>) -> Result<Schema> {
        let mut schema = Schema::new();
        let mut origins = IndexMap::new();
        self.scan_into(directory.as_ref(), &mut schema, &mut origins)?;
        Ok(schema)
    }

    /// Scan several directories into one schema
    pub fn read_all<P: AsRef<Path>>(&self, directories: &[P]) -> Result<Schema> {
        let mut schema = Schema::new();
        let mut origins = IndexMap::new();

        for directory in directories {
            self.scan_into(directory.as_ref(), &mut schema, &mut origins)?;
        }

        info!(tables = schema.len(), "Read entity schema");
        Ok(schema)
    }

    /// Resolve the static registry, optionally limited to entities whose
    /// source file lies under `directory`. Unnamed tables are named by this
    /// reader's convention, as in a source scan.
    pub fn read_registered(&self, directory: Option<&Path>) -> Result<Schema> {
        let mut schema = Schema::new();
        let mut origins = IndexMap::new();

        let mut entities: Vec<&EntityDef> = registered_entities()
            .filter(|def| directory.map_or(true, |dir| is_under(def.source_file, dir)))
            .collect();
        entities.sort_by_key(|def| (def.source_file, def.type_name));

        for def in entities {
            let table = (def.metadata)().into_table(&self.naming)?;
            let origin = format!("{} ({})", def.type_name, def.source_file);
            schema.try_add_table(table, &origin, &mut origins)?;
        }

        Ok(schema)
    }

    fn scan_into(
        &self,
        directory: &Path,
        schema: &mut Schema,
        origins: &mut IndexMap<String, String>,
    ) -> Result<()> {
        if !directory.is_dir() {
            return Err(Error::ConfigError(format!(
                "Entity path does not exist: {}",
                directory.display()
            )));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(directory)
            .follow_links(true)
            .max_depth(max_depth)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "rs") {
                continue;
            }

            if self.is_excluded(path, directory) {
                debug!(path = %path.display(), "Excluded from entity scan");
                continue;
            }

            match self.scan_file(path) {
                Ok(tables) => {
                    for (type_name, table) in tables {
                        let origin = format!("{}::{}", path.display(), type_name);
                        schema.try_add_table(table, &origin, origins)?;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    warn!(path = %path.display(), error = %e, "Skipping entity file");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    fn is_excluded(&self, path: &Path, root: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.exclude
            .iter()
            .any(|pattern| pattern.matches_path(path) || pattern.matches_path(relative))
    }

    /// Tables declared in one file, as `(type name, table)` pairs
    fn scan_file(&self, path: &Path) -> Result<Vec<(String, Table)>> {
        let discovery = |message: String| Error::DiscoveryError {
            path: path.to_path_buf(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| discovery(e.to_string()))?;
        let syntax = parse_file(&content).map_err(|e| discovery(e.to_string()))?;

        let mut tables = Vec::new();
        self.collect_items(&syntax.items, path, &mut tables)?;
        Ok(tables)
    }

    fn collect_items(
        &self,
        items: &[Item],
        path: &Path,
        tables: &mut Vec<(String, Table)>,
    ) -> Result<()> {
        for item in items {
            match item {
                Item::Struct(item_struct) => {
                    if let Some(meta) = parse_struct(item_struct, path)? {
                        let type_name = meta.type_name.clone();
                        tables.push((type_name, meta.into_table(&self.naming)?));
                    }
                }
                Item::Mod(module) => {
                    if let Some((_, nested)) = &module.content {
                        self.collect_items(nested, path, tables)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Whether a `file!()` path lies under `directory`
fn is_under(source_file: &str, directory: &Path) -> bool {
    let source = Path::new(source_file);
    if source.starts_with(directory) {
        return true;
    }

    match (canonical(source), canonical(directory)) {
        (Some(source), Some(directory)) => source.starts_with(directory),
        _ => false,
    }
}

fn canonical(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok()
}
