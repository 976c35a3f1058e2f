//! # Tablesmith CLI
//!
//! Command-line interface for Tablesmith.
//!
//! ## Commands
//!
//! - `validate` - Load schema files and report validation errors
//! - `migrate` - Diff an as-is and a to-be schema into a SQL script
//! - `generate` - Generate models and a migration from a schema
//! - `info` - Display information about a schema
//!
//! Paths may be files or directories; directories are searched
//! recursively for `*.xml` files.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;
use walkdir::WalkDir;

use tablesmith_codegen::{Generator, GeneratorConfig, column_migrator, diff_containers, summarize};
use tablesmith_core::DatabaseType;
use tablesmith_ir::{DataModelContainer, SCHEMA_FILE_EXTENSION, ValidationLog, ValidationLogger};

// Re-export dependencies for use in main.rs
pub use tablesmith_codegen;
pub use tablesmith_core;
pub use tablesmith_ir;

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file
pub const DEFAULT_CONFIG_FILE: &str = "tablesmith.toml";

/// Generated file whose modification time marks the last generation
const GENERATION_MARKER: &str = "src/models/mod.rs";

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "tablesmith")]
#[command(about = "XML schema validation, MySQL migrations and model generation")]
#[command(version)]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and validate schema files
    Validate {
        /// Schema files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print the validation log as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the SQL that turns the as-is schema into the to-be schema
    Migrate {
        /// Schema currently deployed
        #[arg(long, required = true, num_args = 1..)]
        as_is: Vec<PathBuf>,

        /// Desired schema
        #[arg(long, required = true, num_args = 1..)]
        to_be: Vec<PathBuf>,

        /// Output file [default: stdout]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured database
        #[arg(long)]
        database: Option<DatabaseType>,
    },

    /// Generate Rust models and a migration script
    Generate {
        /// Schema files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Schema currently deployed; the migration then only contains changes
        #[arg(long, num_args = 1..)]
        as_is: Vec<PathBuf>,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Only regenerate models of entities whose schema files changed
        /// since the last generation (implies --force)
        #[arg(long)]
        incremental: bool,

        /// Skip model generation
        #[arg(long)]
        no_models: bool,

        /// Skip migration generation
        #[arg(long)]
        no_migrations: bool,
    },

    /// Display information about a schema
    Info {
        /// Schema files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// How a command finished when it did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The schema has validation errors
    Invalid,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Invalid => ExitCode::from(1),
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Run a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<Outcome> {
    match cli.command {
        Command::Validate { paths, json } => validate(&paths, json),
        Command::Migrate {
            as_is,
            to_be,
            output,
            database,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(database) = database {
                config.database = database;
            }
            migrate(&config, &as_is, &to_be, output.as_deref())
        }
        Command::Generate {
            paths,
            output,
            as_is,
            force,
            incremental,
            no_models,
            no_migrations,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(output) = output {
                config.output_dir = output;
            }
            if force || incremental {
                config.overwrite = true;
            }
            if no_models {
                config.generate_models = false;
            }
            if no_migrations {
                config.generate_migrations = false;
            }
            let last_generation = if incremental {
                last_generation_time(&config.output_dir)
            } else {
                None
            };
            generate(config, &paths, &as_is, last_generation)
        }
        Command::Info { paths } => info(&paths),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn validate(paths: &[PathBuf], json: bool) -> anyhow::Result<Outcome> {
    let (_, log) = load_model(paths, None)?;

    if json {
        println!("{}", log.to_json()?);
    } else {
        print_log(&log);
        if !log.has_errors() {
            println!(
                "{} schema is valid ({} warning(s))",
                "✓".green().bold(),
                log.warnings().len()
            );
        }
    }

    Ok(outcome_of(&log))
}

fn migrate(
    config: &GeneratorConfig,
    as_is: &[PathBuf],
    to_be: &[PathBuf],
    output: Option<&Path>,
) -> anyhow::Result<Outcome> {
    let (current, current_log) = load_model(as_is, None)?;
    let (desired, desired_log) = load_model(to_be, None)?;
    if current_log.has_errors() || desired_log.has_errors() {
        print_log(&current_log);
        print_log(&desired_log);
        return Ok(Outcome::Invalid);
    }

    let migrator = column_migrator(config.database)?;
    let plan = diff_containers(&current, &desired, migrator.as_ref());
    if plan.is_empty() {
        eprintln!("{} schemas are identical, nothing to migrate", "✓".green().bold());
        return Ok(Outcome::Success);
    }

    let sql = plan.to_sql();
    match output {
        Some(path) => {
            std::fs::write(path, &sql)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} {} statement(s) written to {}",
                "✓".green().bold(),
                plan.statement_count(),
                path.display()
            );
        }
        None => print!("{sql}"),
    }

    Ok(Outcome::Success)
}

fn generate(
    config: GeneratorConfig,
    paths: &[PathBuf],
    as_is: &[PathBuf],
    last_generation: Option<SystemTime>,
) -> anyhow::Result<Outcome> {
    let (desired, log) = load_model(paths, last_generation)?;
    if log.has_errors() {
        print_log(&log);
        return Ok(Outcome::Invalid);
    }

    let current = if as_is.is_empty() {
        None
    } else {
        let (current, current_log) = load_model(as_is, None)?;
        if current_log.has_errors() {
            print_log(&current_log);
            return Ok(Outcome::Invalid);
        }
        Some(current)
    };

    let output_dir = config.output_dir.clone();
    let project = Generator::new(config)
        .generate_and_write(&desired, current.as_ref())
        .context("code generation failed")?;

    for file in &project.files {
        println!("  {} {}", "create".green(), file.path.display());
    }
    for warning in &project.warnings {
        println!("  {} {}", "warning:".yellow().bold(), warning);
    }
    println!();
    println!("Output:    {}", output_dir.display());
    print!("{}", summarize(&project));

    Ok(Outcome::Success)
}

fn info(paths: &[PathBuf]) -> anyhow::Result<Outcome> {
    let (container, log) = load_model(paths, None)?;

    println!("{}", "Entities (dependency order)".bold());
    for entity in container.entities_in_dependency_order() {
        println!(
            "  {} → {}  attributes: {}, references: {}, indexes: {}, collectors: {}",
            entity.fully_qualified_class_name().cyan(),
            entity.table,
            entity.attributes.len(),
            entity.references.len(),
            entity.indexes.len(),
            entity.collectors.len()
        );
        for mapping in container.nm_mappings_for(entity.id) {
            println!(
                "      many-to-many from {} ({})",
                mapping.foreign_class, mapping.collector
            );
        }
    }

    println!();
    println!("Entities:  {}", container.len());
    println!("Errors:    {}", log.errors().len());
    println!("Warnings:  {}", log.warnings().len());

    Ok(outcome_of(&log))
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(path: &Path) -> anyhow::Result<GeneratorConfig> {
    let config = GeneratorConfig::from_toml_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::debug!(path = %path.display(), database = %config.database, "configuration loaded");
    Ok(config)
}

/// Expand directories into the schema files they contain, sorted by path
pub fn collect_schema_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            let is_schema = entry
                .path()
                .extension()
                .is_some_and(|ext| ext == SCHEMA_FILE_EXTENSION);
            if entry.file_type().is_file() && is_schema {
                files.push(entry.into_path());
            }
        }
    }

    if files.is_empty() {
        bail!("no schema files found");
    }
    Ok(files)
}

/// Modification time of the last generation's marker file in `output_dir`
fn last_generation_time(output_dir: &Path) -> Option<SystemTime> {
    let marker = output_dir.join(GENERATION_MARKER);
    let modified = std::fs::metadata(&marker)
        .and_then(|metadata| metadata.modified())
        .ok();
    if modified.is_none() {
        tracing::debug!(path = %marker.display(), "no previous generation found");
    }
    modified
}

/// Load, resolve and validate a model
fn load_model(
    paths: &[PathBuf],
    last_generation: Option<SystemTime>,
) -> anyhow::Result<(DataModelContainer, ValidationLog)> {
    let files = collect_schema_files(paths)?;
    let mut container = tablesmith_ir::load_container(&files, last_generation)?;
    let log = container.resolve_and_validate();
    tracing::info!(
        files = files.len(),
        entities = container.len(),
        errors = log.errors().len(),
        warnings = log.warnings().len(),
        "schema loaded",
    );
    Ok((container, log))
}

fn print_log(log: &ValidationLog) {
    for entry in log.errors() {
        println!("{} {}", "error".red().bold(), entry);
    }
    for entry in log.warnings() {
        println!("{} {}", "warning".yellow().bold(), entry);
    }
}

fn outcome_of(log: &ValidationLog) -> Outcome {
    if log.has_errors() {
        Outcome::Invalid
    } else {
        Outcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SHOP: &str = r#"<schema>
    <entity name="Customer" table="customers">
        <attribute name="id" dbType="INT" primaryKey="true" autoValue="autoincrement"/>
    </entity>
    <entity name="Order" table="orders">
        <attribute name="id" dbType="INT" primaryKey="true" autoValue="autoincrement"/>
        <reference name="customer" foreignClass="Customer">
            <mapping name="customer_id" foreignAttribute="id"/>
        </reference>
    </entity>
</schema>"#;

    const SHOP_WITH_EMAIL: &str = r#"<schema>
    <entity name="Customer" table="customers">
        <attribute name="id" dbType="INT" primaryKey="true" autoValue="autoincrement"/>
        <attribute name="email" dbType="VARCHAR(100)"/>
    </entity>
    <entity name="Order" table="orders">
        <attribute name="id" dbType="INT" primaryKey="true" autoValue="autoincrement"/>
        <reference name="customer" foreignClass="Customer">
            <mapping name="customer_id" foreignAttribute="id"/>
        </reference>
    </entity>
</schema>"#;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tablesmith").chain(args.iter().copied())).unwrap()
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_parse_arguments() {
        let cli = parse(&["validate", "a.xml", "b.xml", "--json", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        match cli.command {
            Command::Validate { paths, json } => {
                assert_eq!(paths.len(), 2);
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = parse(&[
            "migrate",
            "--as-is",
            "old.xml",
            "--to-be",
            "new.xml",
            "--database",
            "mysql",
        ]);
        assert!(matches!(
            cli.command,
            Command::Migrate { database: Some(DatabaseType::MySQL), .. }
        ));

        assert!(Cli::try_parse_from(["tablesmith", "validate"]).is_err());
    }

    #[test]
    fn test_collect_schema_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.xml"), SHOP).unwrap();
        fs::write(dir.path().join("nested/a.xml"), SHOP).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_schema_files(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "xml"));

        let empty = tempfile::tempdir().unwrap();
        assert!(collect_schema_files(&[empty.path().to_path_buf()]).is_err());
    }

    #[test]
    fn test_validate_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let valid = dir.path().join("shop.xml");
        fs::write(&valid, SHOP).unwrap();
        let invalid = dir.path().join("broken.xml");
        fs::write(&invalid, r#"<entity name="Order" table="orders"/>"#).unwrap();

        assert_eq!(run(parse(&["validate", path_str(&valid)])).unwrap(), Outcome::Success);
        assert_eq!(run(parse(&["validate", path_str(&invalid)])).unwrap(), Outcome::Invalid);
    }

    #[test]
    fn test_migrate_writes_script() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.xml");
        fs::write(&old, SHOP).unwrap();
        let new = dir.path().join("new.xml");
        fs::write(&new, SHOP_WITH_EMAIL).unwrap();
        let script = dir.path().join("migration.sql");
        let config = dir.path().join("none.toml");

        let outcome = run(parse(&[
            "migrate",
            "--config",
            path_str(&config),
            "--as-is",
            path_str(&old),
            "--to-be",
            path_str(&new),
            "-o",
            path_str(&script),
        ]))
        .unwrap();

        assert_eq!(outcome, Outcome::Success);
        let sql = fs::read_to_string(script).unwrap();
        assert_eq!(
            sql,
            "-- alter customers\nALTER TABLE `customers` ADD `email` VARCHAR(100);\n\n"
        );
    }

    #[test]
    fn test_generate_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("shop.xml");
        fs::write(&schema, SHOP).unwrap();
        let out = dir.path().join("out");
        let config = dir.path().join("none.toml");

        let outcome = run(parse(&[
            "generate",
            path_str(&schema),
            "--config",
            path_str(&config),
            "-o",
            path_str(&out),
        ]))
        .unwrap();

        assert_eq!(outcome, Outcome::Success);
        assert!(out.join("src/models/customer.rs").exists());
        assert!(out.join("src/models/order.rs").exists());
        assert_eq!(fs::read_dir(out.join("migrations")).unwrap().count(), 1);
    }

    #[test]
    fn test_incremental_generate_skips_unchanged_models() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("shop.xml");
        fs::write(&schema, SHOP).unwrap();
        let out = dir.path().join("out");
        let config = dir.path().join("none.toml");
        let args = |incremental: bool| {
            let mut args = vec![
                "generate",
                path_str(&schema),
                "--config",
                path_str(&config),
                "-o",
                path_str(&out),
                "--no-migrations",
            ];
            if incremental {
                args.push("--incremental");
            }
            parse(&args)
        };

        assert_eq!(last_generation_time(&out), None);
        assert_eq!(run(args(false)).unwrap(), Outcome::Success);
        assert!(last_generation_time(&out).is_some());

        // Unchanged schema: the existing model survives an incremental run
        let order = out.join("src/models/order.rs");
        fs::write(&order, "// edited\n").unwrap();
        assert_eq!(run(args(true)).unwrap(), Outcome::Success);
        assert_eq!(fs::read_to_string(&order).unwrap(), "// edited\n");

        // Without --incremental the existing files are refused
        assert!(run(args(false)).is_err());
    }

    #[test]
    fn test_config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("shop.xml");
        fs::write(&schema, SHOP).unwrap();
        let config = dir.path().join("tablesmith.toml");
        fs::write(&config, "database = \"postgresql\"\n").unwrap();

        let err = run(parse(&[
            "generate",
            path_str(&schema),
            "--config",
            path_str(&config),
            "-o",
            path_str(&dir.path().join("out")),
        ]))
        .unwrap_err();
        assert!(format!("{err:#}").to_lowercase().contains("postgresql"));
    }
}
