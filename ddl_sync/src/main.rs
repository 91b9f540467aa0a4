//! ddl_sync CLI
//!
//! Command-line tool for generating and applying schema migrations.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ddl_sync::schema::introspector::introspector_for;
use ddl_sync::utils::logging::init_logging;
use ddl_sync::{DdlSync, MigrationGenerator};

/// Keep a database schema in sync with Rust entity declarations.
#[derive(Parser)]
#[command(name = "ddl_sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, or YAML by extension).
    #[arg(short, long, default_value = "ddl_sync.toml")]
    config: PathBuf,

    /// Log statements instead of executing them.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full create script for the declared entities.
    Schema,

    /// Show the migration that would bring the database in sync.
    Diff {
        /// Print the structural diff as JSON instead of SQL.
        #[arg(long)]
        json: bool,
    },

    /// Generate and apply the migration.
    Sync,

    /// Roll back the most recently applied migration.
    Rollback,

    /// Print the schema read from the database.
    Introspect {
        /// Print the schema as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ddl_sync::config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if cli.dry_run {
        config.migrations.dry_run = true;
    }
    init_logging(&config.logging)?;

    let client = DdlSync::new(config)?;
    let result = run(&client, cli.command).await;
    client.close().await;
    result
}

async fn run(client: &DdlSync, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Schema => {
            let schema = client.desired_schema()?;
            if schema.is_empty() {
                println!("No tables found.");
                return Ok(());
            }
            println!("{}", client.schema_sql()?);
        }

        Commands::Diff { json } => {
            let diff = client.diff().await?;
            if !diff.has_changes() {
                println!("No changes detected.");
                return Ok(());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                let grammar = client.dialect().grammar();
                let sql = MigrationGenerator::new(grammar.as_ref()).generate_diff(&diff)?;
                println!("-- up\n{}\n\n-- down\n{}", sql.up(), sql.down());
            }
        }

        Commands::Sync => match client.sync().await? {
            Some(version) => println!("Applied migration {version}."),
            None => println!("No changes detected."),
        },

        Commands::Rollback => match client.rollback().await? {
            Some(version) => println!("Rolled back migration {version}."),
            None => println!("No migrations to roll back."),
        },

        Commands::Introspect { json } => {
            let connection = client.connection().await?;
            let introspector =
                introspector_for(connection, client.config().database.schema.as_deref());
            let schema = introspector.introspect().await?;

            if schema.is_empty() {
                println!("No tables found.");
            } else if json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                for table in schema.tables() {
                    println!("{}", table.name());
                    for column in table.columns() {
                        println!("  {} {}", column.name(), column.column_type());
                    }
                }
            }
        }
    }

    Ok(())
}
