//! Entity discovery from source trees

use std::fs;
use std::path::Path;

use ddl_sync::schema::types::ColumnType;
use ddl_sync::{Dialect, EntitySchemaReader, Error, MigrationGenerator};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const USER: &str = r#"
use chrono::{DateTime, Utc};

#[derive(Debug, Entity)]
#[table(name = "users")]
#[index(columns("email"), unique)]
pub struct User {
    #[column(primary_key, auto_increment)]
    pub id: i32,
    #[column(type = "string", length = 100, unique)]
    pub username: String,
    #[column(length = 255)]
    pub email: String,
    #[column(default = true)]
    pub active: bool,
    #[column]
    pub last_login: Option<DateTime<Utc>>,
    pub cached_score: u32,
}
"#;

const POST: &str = r#"
#[derive(Entity)]
#[table]
pub struct BlogPost {
    #[column(primary_key)]
    pub id: i64,
    #[column(type = "decimal", precision = 8, scale = 2, default = -1.5)]
    pub rating: f64,
    #[column(type = "text", nullable)]
    pub body: String,
}

pub struct ViewModel {
    pub title: String,
}
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, content) in files {
        write(dir.path(), relative, content);
    }
    dir
}

#[test]
fn reads_entities_in_declaration_order() {
    let dir = tree(&[("user.rs", USER), ("blog/post.rs", POST)]);

    let schema = EntitySchemaReader::new().read(dir.path()).unwrap();
    assert_eq!(schema.table_names(), vec!["blog_posts", "users"]);

    let users = schema.table("users").unwrap();
    let names: Vec<&str> = users.columns().map(|c| c.name()).collect();
    assert_eq!(names, vec!["id", "username", "email", "active", "last_login"]);

    let last_login = users.column("last_login").unwrap();
    assert_eq!(last_login.column_type(), ColumnType::DatetimeTz);
    assert!(last_login.is_nullable());

    let index = users.index("idx_users_email").unwrap();
    assert!(index.is_unique);

    let rating = schema.table("blog_posts").unwrap().column("rating").unwrap();
    assert_eq!(rating.column_type(), ColumnType::Decimal);
    assert_eq!(rating.get_precision(), Some(8));
}

#[test]
fn generates_the_full_script_for_a_directory() {
    let dir = tree(&[("user.rs", USER)]);
    let grammar = Dialect::MySql.grammar();

    let sql = MigrationGenerator::new(grammar.as_ref())
        .generate_for(&EntitySchemaReader::new(), &[dir.path()])
        .unwrap();

    assert_eq!(
        sql,
        "CREATE TABLE `users` (\
         `id` INT NOT NULL PRIMARY KEY AUTO_INCREMENT, \
         `username` VARCHAR(100) NOT NULL UNIQUE, \
         `email` VARCHAR(255) NOT NULL, \
         `active` TINYINT(1) NOT NULL DEFAULT 1, \
         `last_login` TIMESTAMP);"
    );
}

#[test]
fn skips_structs_without_table_metadata() {
    let dir = tree(&[(
        "plain.rs",
        "pub struct Settings { pub theme: String }\n",
    )]);

    let schema = EntitySchemaReader::new().read(dir.path()).unwrap();
    assert!(schema.is_empty());
}

#[test]
fn skips_unparsable_files_and_keeps_scanning() {
    let dir = tree(&[
        ("broken.rs", "pub struct Broken { id: i32,,, }\n#[table\n"),
        ("notes.txt", "#[table] struct Ignored;"),
        ("user.rs", USER),
    ]);

    let schema = EntitySchemaReader::new().read(dir.path()).unwrap();
    assert_eq!(schema.table_names(), vec!["users"]);
}

#[test]
fn skips_entities_with_malformed_attributes() {
    let dir = tree(&[
        (
            "bad.rs",
            "#[table(name = 42)]\npub struct Bad { #[column] pub id: i32 }\n",
        ),
        ("user.rs", USER),
    ]);

    let schema = EntitySchemaReader::new().read(dir.path()).unwrap();
    assert_eq!(schema.table_names(), vec!["users"]);
}

#[test]
fn column_without_table_is_fatal() {
    let dir = tree(&[(
        "orphan.rs",
        "pub struct Orphan { #[column] pub id: i32 }\n",
    )]);

    let err = EntitySchemaReader::new().read(dir.path()).unwrap_err();
    assert!(matches!(err, Error::MetadataError(_)), "{err}");
}

#[test]
fn unknown_column_type_is_fatal() {
    let dir = tree(&[(
        "money.rs",
        "#[table]\npub struct Money { #[column(type = \"varchar\")] pub amount: String }\n",
    )]);

    let err = EntitySchemaReader::new().read(dir.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidColumnType(ref t) if t == "varchar"), "{err}");
}

#[test]
fn duplicate_tables_are_rejected() {
    let dir = tree(&[
        ("a.rs", "#[table(name = \"accounts\")]\npub struct Account { #[column] pub id: i32 }\n"),
        ("b.rs", "#[table(name = \"accounts\")]\npub struct LegacyAccount { #[column] pub id: i64 }\n"),
    ]);

    let err = EntitySchemaReader::new().read(dir.path()).unwrap_err();
    match err {
        Error::DuplicateTable { table, first, second } => {
            assert_eq!(table, "accounts");
            assert!(first.ends_with("Account"), "{first}");
            assert!(second.ends_with("LegacyAccount"), "{second}");
        }
        other => panic!("expected DuplicateTable, got {other}"),
    }
}

#[test]
fn exclusions_and_depth_limit_apply() {
    let dir = tree(&[
        ("user.rs", USER),
        ("legacy/post.rs", POST),
    ]);

    let excluded = EntitySchemaReader::new()
        .exclude("legacy/*")
        .unwrap()
        .read(dir.path())
        .unwrap();
    assert_eq!(excluded.table_names(), vec!["users"]);

    let shallow = EntitySchemaReader::new()
        .recursive(false)
        .read(dir.path())
        .unwrap();
    assert_eq!(shallow.table_names(), vec!["users"]);
}

#[test]
fn inline_modules_are_scanned() {
    let dir = tree(&[(
        "lib.rs",
        "pub mod entities {\n    #[table]\n    pub struct Tag { #[column] pub label: String }\n}\n",
    )]);

    let schema = EntitySchemaReader::new().read(dir.path()).unwrap();
    assert_eq!(schema.table_names(), vec!["tags"]);
}

#[test]
fn missing_directory_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EntitySchemaReader::new()
        .read(dir.path().join("absent"))
        .unwrap_err();

    assert!(matches!(err, Error::ConfigError(_)));
}
