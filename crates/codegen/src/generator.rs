//! # Code Generator Orchestrator
//!
//! The `Generator` is the top-level entry point for code generation. It takes
//! a resolved to-be [`DataModelContainer`], optionally the as-is container the
//! database currently reflects, and a [`GeneratorConfig`], and produces a
//! [`GeneratedProject`].
//!
//! ## Pipeline
//!
//! ```text
//! to-be container (+ as-is container) + GeneratorConfig
//!         │
//!         ▼
//!   validate_all() ── errors ──► EngineError::Validation
//!         │
//!         ▼
//!   GenerationContext::new()
//!         │
//!         ├──► rust::generate_models()          → Vec<GeneratedFile>
//!         ├──► diff_containers() + generate_migration() → GeneratedFile
//!         │
//!         ▼
//!   GeneratedProject { files, warnings }
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tablesmith_codegen::{Generator, GeneratorConfig};
//! use tablesmith_ir::load_container;
//!
//! let mut to_be = load_container(&["schema/shop.xml"], None)?;
//! to_be.resolve_all();
//!
//! let output = Generator::new(GeneratorConfig::default()).generate(&to_be, None)?;
//! println!("Generated {} files", output.file_count());
//! ```

use tablesmith_core::EngineResult;
use tablesmith_ir::{DataModelContainer, ValidationLog};

use crate::context::GenerationContext;
use crate::migrations::{self, diff_containers};
use crate::rust;
use crate::{FileType, GeneratedProject, GeneratorConfig};

// ============================================================================
// Generator
// ============================================================================

/// Top-level code generator that orchestrates the full generation pipeline.
///
/// The `Generator` is stateless aside from its configuration.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    // ====================================================================
    // Construction
    // ====================================================================

    /// Create a new generator with the given configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Create a generator with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(GeneratorConfig::default())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: GeneratorConfig) {
        self.config = config;
    }

    // ====================================================================
    // Generation
    // ====================================================================

    /// Run the full pipeline on a resolved to-be model.
    ///
    /// Without an `as_is` model the migration creates the whole schema;
    /// with one it contains only the statements that turn `as_is` into
    /// `to_be`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`](tablesmith_core::EngineError::Validation)
    /// if the to-be model has validation errors, and
    /// [`EngineError::NotImplemented`](tablesmith_core::EngineError::NotImplemented)
    /// for a database without a column migrator. Problems that only affect
    /// a single accessor become warnings on the output.
    pub fn generate(
        &self,
        to_be: &DataModelContainer,
        as_is: Option<&DataModelContainer>,
    ) -> EngineResult<GeneratedProject> {
        // ── 1. Validate ──────────────────────────────────────────────────
        let mut log = ValidationLog::new();
        to_be.validate_all(&mut log);
        log.to_result()?;

        // ── 2. Build context ─────────────────────────────────────────────
        let ctx = GenerationContext::new(to_be, self.config.clone());
        let migrator = migrations::column_migrator(self.config.database)?;

        let mut output = GeneratedProject::new();
        for warning in log.warnings() {
            output.add_warning(warning.message.clone());
        }
        if ctx.entity_count() == 0 {
            output.add_warning("No entities defined, nothing to generate for models or tables");
        }

        // ── 3. Generate models ───────────────────────────────────────────
        if self.config.generate_models {
            let mut warnings = Vec::new();
            for file in rust::generate_models(&ctx, migrator.as_ref(), &mut warnings) {
                output.add_file(file);
            }
            for warning in warnings {
                output.add_warning(warning);
            }
        }

        // ── 4. Generate migration ────────────────────────────────────────
        if self.config.generate_migrations {
            let empty = DataModelContainer::new();
            let plan = diff_containers(as_is.unwrap_or(&empty), to_be, migrator.as_ref());
            match migrations::generate_migration(&ctx, &plan, as_is.is_none()) {
                Some(file) => output.add_file(file),
                None => output.add_warning("Schema is unchanged, no migration generated"),
            }
        }

        tracing::info!(
            files = output.file_count(),
            warnings = output.warnings.len(),
            database = %self.config.database,
            "code generation complete",
        );

        Ok(output)
    }

    // ====================================================================
    // Convenience: generate and write to disk
    // ====================================================================

    /// Generate and write all files to the configured output directory.
    ///
    /// Existing files are only replaced when the configuration allows
    /// overwriting.
    pub fn generate_and_write(
        &self,
        to_be: &DataModelContainer,
        as_is: Option<&DataModelContainer>,
    ) -> EngineResult<GeneratedProject> {
        let output = self.generate(to_be, as_is)?;
        output.write_to_disk(&self.config.output_dir, self.config.overwrite)?;
        tracing::info!(
            output_dir = %self.config.output_dir.display(),
            files = output.file_count(),
            "files written to disk",
        );
        Ok(output)
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// GenerationSummary
// ============================================================================

/// A human-readable summary of a completed generation run.
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    /// Total number of files generated.
    pub total_files: usize,
    /// Number of Rust source files.
    pub rust_files: usize,
    /// Number of SQL migration files.
    pub sql_files: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Total bytes of generated content.
    pub total_bytes: usize,
}

impl GenerationSummary {
    /// Build a summary from a generated project.
    pub fn from_project(project: &GeneratedProject) -> Self {
        Self {
            total_files: project.file_count(),
            rust_files: project.files_by_type(FileType::Rust).len(),
            sql_files: project.files_by_type(FileType::Sql).len(),
            warning_count: project.warnings.len(),
            total_bytes: project.files.iter().map(|f| f.content.len()).sum(),
        }
    }

    /// Format the summary as a human-readable string.
    pub fn display(&self) -> String {
        let size = if self.total_bytes < 1024 {
            format!("{} B", self.total_bytes)
        } else {
            format!("{:.1} KB", self.total_bytes as f64 / 1024.0)
        };

        let mut out = String::with_capacity(256);
        out.push_str(&format!("Files:     {}\n", self.total_files));
        out.push_str(&format!("  Rust:    {}\n", self.rust_files));
        out.push_str(&format!("  SQL:     {}\n", self.sql_files));
        out.push_str(&format!("Warnings:  {}\n", self.warning_count));
        out.push_str(&format!("Size:      {size}\n"));
        out
    }
}

impl std::fmt::Display for GenerationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Produce a [`GenerationSummary`] from a [`GeneratedProject`].
pub fn summarize(project: &GeneratedProject) -> GenerationSummary {
    GenerationSummary::from_project(project)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tablesmith_core::{DatabaseType, EngineError};
    use tablesmith_ir::{Attribute, Entity, Reference};

    fn resolved(entities: Vec<Entity>) -> DataModelContainer {
        let mut container = DataModelContainer::new();
        for entity in entities {
            container.register_entity(entity).unwrap();
        }
        container.resolve_all();
        container
    }

    fn shop() -> DataModelContainer {
        resolved(vec![
            Entity::new("Customer", "customers").with_attribute(Attribute::primary_key()),
            Entity::new("Order", "orders")
                .with_attribute(Attribute::primary_key())
                .with_reference(Reference::new("customer", "Customer").with_default_mapping("id")),
        ])
    }

    fn generator() -> Generator {
        Generator::new(GeneratorConfig::default())
    }

    // ── Generator construction ───────────────────────────────────────────

    #[test]
    fn test_generator_defaults() {
        let generator = Generator::default();
        assert!(generator.config().generate_models);
        assert!(generator.config().generate_migrations);
        assert_eq!(generator.config().database, DatabaseType::MySQL);
    }

    #[test]
    fn test_generator_set_config() {
        let mut generator = Generator::with_defaults();
        generator.set_config(GeneratorConfig::new().without_models());
        assert!(!generator.config().generate_models);
    }

    // ── Generation ───────────────────────────────────────────────────────

    #[test]
    fn test_generate_initial_schema() {
        let output = generator().generate(&shop(), None).unwrap();

        assert_eq!(output.files_by_type(FileType::Rust).len(), 3);
        let sql = output.files_by_type(FileType::Sql);
        assert_eq!(sql.len(), 1);
        assert!(sql[0].path.to_string_lossy().ends_with("_create_schema.sql"));

        let content = &sql[0].content;
        let customers = content.find("CREATE TABLE `customers`").unwrap();
        let orders = content.find("CREATE TABLE `orders`").unwrap();
        assert!(customers < orders);
        assert!(!output.has_warnings());
    }

    #[test]
    fn test_generate_migration_between_models() {
        let as_is = shop();
        let to_be = resolved(vec![
            Entity::new("Customer", "customers")
                .with_attribute(Attribute::primary_key())
                .with_attribute(Attribute::new("email", "VARCHAR(100)")),
            Entity::new("Order", "orders")
                .with_attribute(Attribute::primary_key())
                .with_reference(Reference::new("customer", "Customer").with_default_mapping("id")),
        ]);

        let output = Generator::new(GeneratorConfig::new().without_models())
            .generate(&to_be, Some(&as_is))
            .unwrap();

        assert_eq!(output.file_count(), 1);
        let file = &output.files[0];
        assert!(file.path.to_string_lossy().ends_with("_migrate_schema.sql"));
        assert!(file.content.contains("ALTER TABLE `customers` ADD `email` VARCHAR(100);\n"));
        assert!(!file.content.contains("orders"));
    }

    #[test]
    fn test_unchanged_schema_warns() {
        let output = Generator::new(GeneratorConfig::new().without_models())
            .generate(&shop(), Some(&shop()))
            .unwrap();

        assert_eq!(output.file_count(), 0);
        assert!(output.warnings.iter().any(|w| w.contains("unchanged")));
    }

    #[test]
    fn test_validation_errors_abort_generation() {
        let broken = resolved(vec![Entity::new("Order", "orders")]);
        let err = generator().generate(&broken, None).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("E412"));
    }

    #[test]
    fn test_unsupported_database() {
        let config = GeneratorConfig::new().with_database(DatabaseType::PostgreSQL);
        let err = Generator::new(config).generate(&shop(), None).unwrap_err();
        assert!(matches!(err, EngineError::NotImplemented(_)));
    }

    #[test]
    fn test_generate_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new().with_output_dir(dir.path());
        let generator = Generator::new(config);

        let output = generator.generate_and_write(&shop(), None).unwrap();
        assert!(dir.path().join("src/models/order.rs").exists());
        assert!(dir.path().join("src/models/mod.rs").exists());

        // second run refuses to clobber the first
        let err = generator.generate_and_write(&shop(), None).unwrap_err();
        assert!(matches!(err, EngineError::OutputExists(_)));
        assert_eq!(output.file_count(), 4);
    }

    // ── GenerationSummary ────────────────────────────────────────────────

    #[test]
    fn test_summary() {
        let output = generator().generate(&shop(), None).unwrap();
        let summary = summarize(&output);

        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.rust_files, 3);
        assert_eq!(summary.sql_files, 1);
        assert_eq!(summary.warning_count, 0);
        assert!(summary.total_bytes > 0);
        assert!(summary.to_string().contains("SQL:     1"));
    }
}
