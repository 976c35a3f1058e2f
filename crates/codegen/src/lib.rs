//! # Tablesmith Codegen
//!
//! Migration and code generation engine for Tablesmith.
//!
//! This crate turns a resolved, validated data model into files:
//!
//! ## Features
//!
//! - **Schema Diff**: ALTER/ADD/DROP statements between an as-is and a to-be model
//! - **Migration Generation**: SQL scripts for a new schema or a schema change
//! - **Model Generation**: one Rust struct per entity with table metadata and
//!   SQL accessors for references, collectors and many-to-many mappings
//!

// ============================================================================
// Modules
// ============================================================================

pub mod context;
pub mod generator;
pub mod migrations;
pub mod rust;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::GenerationContext;
pub use generator::{GenerationSummary, Generator, summarize};
pub use migrations::diff::{MigrationPlan, TableChange, TableMigration, diff_containers};
pub use migrations::{
    ColumnMigrator, MySqlColumnMigrator, TABLE_PLACEHOLDER, bind_statements, column_migrator,
};
pub use rust::generate_models;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tablesmith_core::{DatabaseType, EngineError, EngineResult};

// ============================================================================
// GeneratorConfig
// ============================================================================

/// Configuration for the code generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// SQL dialect of the generated migrations
    pub database: DatabaseType,

    /// Output directory for generated files
    pub output_dir: PathBuf,

    /// Whether to generate Rust model files
    pub generate_models: bool,

    /// Whether to generate migrations
    pub generate_migrations: bool,

    /// Whether to overwrite existing files
    pub overwrite: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            database: DatabaseType::MySQL,
            output_dir: PathBuf::from("./generated"),
            generate_models: true,
            generate_migrations: true,
            overwrite: false,
        }
    }
}

impl GeneratorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        toml::from_str(content).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Set the SQL dialect
    pub fn with_database(mut self, database: DatabaseType) -> Self {
        self.database = database;
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Disable model generation
    pub fn without_models(mut self) -> Self {
        self.generate_models = false;
        self
    }

    /// Disable migration generation
    pub fn without_migrations(mut self) -> Self {
        self.generate_migrations = false;
        self
    }

    /// Allow overwriting existing files
    pub fn allow_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }
}

// ============================================================================
// Generated output
// ============================================================================

/// Kind of a generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Model source under `src/models/`
    Rust,
    /// Migration script under `migrations/`
    Sql,
}

impl FileType {
    /// File extension without the dot
    pub fn extension(&self) -> &str {
        match self {
            FileType::Rust => "rs",
            FileType::Sql => "sql",
        }
    }
}

/// One file produced by a generator, relative to the output directory
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
    pub file_type: FileType,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, file_type: FileType) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            file_type,
        }
    }

    /// Model source file
    pub fn rust(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self::new(path, content, FileType::Rust)
    }

    /// Migration script
    pub fn sql(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self::new(path, content, FileType::Sql)
    }

    pub fn extension(&self) -> &str {
        self.file_type.extension()
    }
}

/// Everything one generator run produced, plus the non-fatal problems it hit
#[derive(Debug, Clone, Default)]
pub struct GeneratedProject {
    pub files: Vec<GeneratedFile>,
    pub warnings: Vec<String>,
}

impl GeneratedProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: GeneratedFile) {
        self.files.push(file);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Files of one kind, in generation order
    pub fn files_by_type(&self, file_type: FileType) -> Vec<&GeneratedFile> {
        self.files.iter().filter(|f| f.file_type == file_type).collect()
    }

    /// Look up a file by its relative path
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&GeneratedFile> {
        let path = path.as_ref();
        self.files.iter().find(|f| f.path == path)
    }

    /// Write every file below `base_dir`.
    ///
    /// Without `overwrite` nothing is written when any target already exists.
    pub fn write_to_disk(&self, base_dir: impl AsRef<Path>, overwrite: bool) -> EngineResult<()> {
        let base_dir = base_dir.as_ref();
        let targets: Vec<PathBuf> = self.files.iter().map(|f| base_dir.join(&f.path)).collect();

        if !overwrite {
            if let Some(existing) = targets.iter().find(|p| p.exists()) {
                return Err(EngineError::OutputExists(existing.clone()));
            }
        }

        for (file, target) in self.files.iter().zip(&targets) {
            write_file(target, &file.content)?;
        }

        tracing::debug!(
            base_dir = %base_dir.display(),
            files = targets.len(),
            "generated files written",
        );
        Ok(())
    }
}

fn write_file(target: &Path, content: &str) -> EngineResult<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::DirectoryCreate {
            path: parent.to_path_buf(),
            message: e.to_string(),
        })?;
    }

    std::fs::write(target, content).map_err(|e| EngineError::FileWrite {
        path: target.to_path_buf(),
        message: e.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
