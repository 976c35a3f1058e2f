//! # Migration Generation
//!
//! This module turns model differences into SQL DDL. A dialect implements
//! [`ColumnMigrator`], which diffs one schema element at a time; the
//! [`diff`] module walks two containers and assembles a [`MigrationPlan`]
//! that is rendered into a migration file.
//!
//! Statements produced by a migrator address their table through
//! [`TABLE_PLACEHOLDER`]; [`bind_statements`] substitutes the concrete
//! table once the caller knows it.
//!
//! ## Generated Files
//!
//! ```text
//! migrations/{timestamp}_create_schema.sql    (no as-is model)
//! migrations/{timestamp}_migrate_schema.sql   (as-is model given)
//! ```

pub mod diff;
pub mod mysql;

pub use diff::{MigrationPlan, MigrationStep, diff_containers};
pub use mysql::MySqlColumnMigrator;

use crate::GeneratedFile;
use crate::context::GenerationContext;
use tablesmith_core::{DatabaseType, EngineError, EngineResult};
use tablesmith_ir::{Attribute, Entity, Index, Reference};

/// Stand-in for the table name in migrator output
pub const TABLE_PLACEHOLDER: &str = "!TABLE!";

// ============================================================================
// ColumnMigrator Trait
// ============================================================================

/// Dialect-specific DDL generation for single schema elements.
///
/// Every method is a pure function of its inputs. `None` on the as-is side
/// means the element is new, `None` on the to-be side means it goes away;
/// both `None` yields no statements. Inputs are expected to be resolved and
/// validated, so no method reports errors.
pub trait ColumnMigrator: Send + Sync + std::fmt::Debug {
    /// Dialect this migrator writes
    fn database(&self) -> DatabaseType;

    /// Quote an identifier
    fn quote(&self, identifier: &str) -> String;

    /// `DROP TABLE` for the placeholder table
    fn drop_table_statement(&self) -> String;

    /// `CREATE TABLE` for the placeholder table with all columns, keys,
    /// indexes and foreign keys of `entity`
    fn create_table_statement(&self, entity: &Entity) -> String;

    /// `CREATE TABLE` with columns, keys and indexes but no foreign key
    /// constraints; those are added later from [`reference_statements`](Self::reference_statements)
    fn create_table_without_foreign_keys(&self, entity: &Entity) -> String;

    /// Statements turning one column into another
    fn attribute_statements(
        &self,
        as_is: Option<&Attribute>,
        to_be: Option<&Attribute>,
    ) -> Vec<String>;

    /// Statements turning one foreign key into another.
    ///
    /// A drop starts with the constraint drop followed by the column drops;
    /// an add lists the column adds followed by the constraint add.
    fn reference_statements(
        &self,
        as_is: Option<&Reference>,
        to_be: Option<&Reference>,
    ) -> Vec<String>;

    /// Statements turning one index into another
    fn index_statements(&self, as_is: Option<&Index>, to_be: Option<&Index>) -> Vec<String>;
}

/// Select the migrator for a dialect
pub fn column_migrator(database: DatabaseType) -> EngineResult<Box<dyn ColumnMigrator>> {
    match database {
        DatabaseType::MySQL => Ok(Box::new(MySqlColumnMigrator::new())),
        other => Err(EngineError::NotImplemented(format!("migrations for {other}"))),
    }
}

/// Replace the table placeholder with a concrete (already quoted) table name
pub fn bind_statements(statements: &[String], table: &str) -> Vec<String> {
    statements
        .iter()
        .map(|s| s.replace(TABLE_PLACEHOLDER, table))
        .collect()
}

// ============================================================================
// Migration files
// ============================================================================

/// Render a plan into a migration file; `None` when there is nothing to do
pub fn generate_migration(
    ctx: &GenerationContext,
    plan: &MigrationPlan,
    is_initial: bool,
) -> Option<GeneratedFile> {
    if plan.is_empty() {
        return None;
    }

    let name = if is_initial {
        "create_schema"
    } else {
        "migrate_schema"
    };

    let mut content = String::with_capacity(plan.statement_count() * 64 + 128);
    content.push_str(&format!(
        "-- Generated by tablesmith ({})\n-- {} statement(s) for {} table(s)\n\n",
        ctx.config.database,
        plan.statement_count(),
        plan.table_count()
    ));
    content.push_str(&plan.to_sql());

    Some(GeneratedFile::sql(ctx.migration_filename(name), content))
}

// ============================================================================
// Tests
// ============================================================================
