//! `#[derive(Entity)]` and the static entity registry

use std::fs;

use ddl_sync::schema::types::{ColumnType, Scalar, Schema};
use ddl_sync::utils::naming::TableNaming;
use ddl_sync::{Entity, EntitySchemaReader, SchemaComparator};
use pretty_assertions::assert_eq;

#[allow(dead_code)]
#[derive(Entity)]
#[table(name = "users")]
#[index(name = "users_by_email", columns("email"), unique)]
struct User {
    #[column(primary_key, auto_increment)]
    id: i32,
    #[column(type = "string", length = 100, unique)]
    username: String,
    #[column(length = 255)]
    email: String,
    #[column(default = true)]
    active: bool,
    #[column(name = "last_seen")]
    last_login: Option<chrono::DateTime<chrono::Utc>>,
    cached_score: u32,
}

const USER_SOURCE: &str = r#"
#[derive(Entity)]
#[table(name = "users")]
#[index(name = "users_by_email", columns("email"), unique)]
struct User {
    #[column(primary_key, auto_increment)]
    id: i32,
    #[column(type = "string", length = 100, unique)]
    username: String,
    #[column(length = 255)]
    email: String,
    #[column(default = true)]
    active: bool,
    #[column(name = "last_seen")]
    last_login: Option<chrono::DateTime<chrono::Utc>>,
    cached_score: u32,
}
"#;

#[allow(dead_code)]
#[derive(Entity)]
#[table]
struct LineItem {
    #[column(primary_key)]
    id: i64,
    #[column(type = "decimal", precision = 10, scale = 2, default = -0.5)]
    price: f64,
    #[column(nullable = false, options(collation = "nocase", weight = 3))]
    sku: Option<String>,
}

#[test]
fn derived_table_matches_declaration() {
    let users = User::table().unwrap();

    assert_eq!(users.name(), "users");
    let names: Vec<&str> = users.columns().map(|c| c.name()).collect();
    assert_eq!(names, vec!["id", "username", "email", "active", "last_seen"]);

    let id = users.column("id").unwrap();
    assert!(id.is_primary_key() && id.is_auto_increment() && !id.is_nullable());

    let username = users.column("username").unwrap();
    assert_eq!(username.column_type(), ColumnType::String);
    assert_eq!(username.get_length(), Some(100));
    assert!(username.is_unique());

    assert_eq!(
        users.column("active").unwrap().get_default(),
        Some(&Scalar::Bool(true))
    );

    let last_seen = users.column("last_seen").unwrap();
    assert_eq!(last_seen.column_type(), ColumnType::DatetimeTz);
    assert!(last_seen.is_nullable());

    assert!(users.index("users_by_email").unwrap().is_unique);
}

#[test]
fn derived_names_defaults_and_options() {
    let items = LineItem::table().unwrap();

    assert_eq!(items.name(), "line_items");

    let price = items.column("price").unwrap();
    assert_eq!(price.column_type(), ColumnType::Decimal);
    assert_eq!(price.get_default(), Some(&Scalar::Float(-0.5)));

    let sku = items.column("sku").unwrap();
    assert!(!sku.is_nullable());
    assert_eq!(sku.options().get("collation"), Some(&Scalar::String("nocase".into())));
    assert_eq!(sku.options().get("weight"), Some(&Scalar::Int(3)));
}

#[test]
fn derive_and_source_scan_agree() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("user.rs"), USER_SOURCE).unwrap();

    let scanned = EntitySchemaReader::new().read(dir.path()).unwrap();
    let derived = Schema::from_tables(vec![User::table().unwrap()]);

    assert!(!SchemaComparator::compare(&scanned, &derived).has_changes());
}

#[test]
fn registry_holds_every_derived_entity() {
    let schema = EntitySchemaReader::new().read_registered(None).unwrap();

    assert_eq!(schema.table_names(), vec!["line_items", "users"]);
}

#[test]
fn registry_names_tables_by_the_reader_convention() {
    let naming = TableNaming {
        style: "snake_case".into(),
        pluralize: false,
    };
    let schema = EntitySchemaReader::new()
        .naming(naming)
        .read_registered(None)
        .unwrap();

    // An explicit #[table(name)] is kept as declared.
    assert_eq!(schema.table_names(), vec!["line_item", "users"]);
}
