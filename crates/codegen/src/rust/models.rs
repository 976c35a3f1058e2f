//! # Model Generator
//!
//! Generates one plain Rust struct per entity.
//!
//! ## Generated Files
//!
//! - `src/models/mod.rs`: module declarations and re-exports
//! - `src/models/order.rs`: for an entity `Order`:
//!   - `Order` struct with one field per attribute and reference column
//!   - `TABLE`, `COLUMNS` and `PRIMARY_KEY` constants
//!   - one `get_*` accessor per reference, collector and inbound
//!     many-to-many mapping, returning the parameterized SELECT for it
//!
//! ## Type Mapping
//!
//! Column types are mapped with [`GenerationContext::rust_type`]; columns
//! that may be NULL become `Option<T>`.

use std::collections::HashSet;
use tablesmith_ir::{Collector, CollectorKind, Entity, NMMapping, Reference};

use crate::GeneratedFile;
use crate::context::GenerationContext;
use crate::migrations::ColumnMigrator;
use crate::rust::{doc_comment, file_header};

// ============================================================================
// Public API
// ============================================================================

/// Generate all model files (`src/models/mod.rs` + one file per entity).
///
/// Entities whose schema files did not change since the last generation keep
/// their existing model file; `mod.rs` is always regenerated. Accessors that
/// cannot be generated are skipped and reported in `warnings`.
pub fn generate_models(
    ctx: &GenerationContext,
    migrator: &dyn ColumnMigrator,
    warnings: &mut Vec<String>,
) -> Vec<GeneratedFile> {
    let mut files = Vec::with_capacity(ctx.entity_count() + 1);
    files.push(generate_models_mod(ctx));

    let mut unchanged = 0;
    for &entity in ctx.entities() {
        if !entity.has_changed_since_last_generation {
            unchanged += 1;
            continue;
        }
        let builder = ModelBuilder {
            ctx,
            entity,
            q: migrator,
        };
        files.push(builder.generate(warnings));
    }

    if unchanged > 0 {
        tracing::debug!(unchanged, "skipped models of unchanged entities");
    }
    files
}

// ============================================================================
// models/mod.rs
// ============================================================================

fn generate_models_mod(ctx: &GenerationContext) -> GeneratedFile {
    let mut content = String::with_capacity(512);
    content.push_str(&file_header("Model definitions."));

    for entity in ctx.entities() {
        content.push_str(&format!("pub mod {};\n", GenerationContext::module_name(entity)));
    }

    if ctx.entity_count() > 0 {
        content.push('\n');
        for entity in ctx.entities() {
            content.push_str(&format!(
                "pub use {}::{};\n",
                GenerationContext::module_name(entity),
                struct_name(entity)
            ));
        }
    }

    GeneratedFile::rust("src/models/mod.rs", content)
}

fn struct_name(entity: &Entity) -> String {
    GenerationContext::pascal(entity.short_name())
}

// ============================================================================
// Per-entity model file
// ============================================================================

struct ModelBuilder<'c, 'a> {
    ctx: &'c GenerationContext<'a>,
    entity: &'a Entity,
    q: &'c dyn ColumnMigrator,
}

/// One generated accessor
struct Accessor {
    name: String,
    doc: String,
    sql: String,
}

impl ModelBuilder<'_, '_> {
    fn generate(&self, warnings: &mut Vec<String>) -> GeneratedFile {
        let entity = self.entity;
        let name = struct_name(entity);
        let path = format!("src/models/{}.rs", GenerationContext::module_name(entity));

        let mut content = String::with_capacity(2048);
        content.push_str(&file_header(&format!(
            "{} model (table `{}`).",
            entity.fully_qualified_class_name(),
            entity.table
        )));

        content.push_str(&self.generate_struct(&name));
        content.push('\n');
        content.push_str(&self.generate_impl(&name, warnings));

        GeneratedFile::rust(path, content)
    }

    fn generate_struct(&self, name: &str) -> String {
        let mut out = doc_comment(&format!("Row of table `{}`", self.entity.table), 0);
        out.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
        out.push_str(&format!("pub struct {name} {{\n"));

        for attribute in &self.entity.attributes {
            let nullable = !attribute.is_required && !attribute.is_primary_key;
            out.push_str(&format!(
                "    pub {}: {},\n",
                GenerationContext::field_name(&attribute.database_name),
                GenerationContext::rust_type(&attribute.database_type, nullable)
            ));
        }

        for reference in &self.entity.references {
            for column in reference.columns() {
                out.push_str(&doc_comment(&format!("Column of reference `{}`", reference.name), 4));
                out.push_str(&format!(
                    "    pub {}: {},\n",
                    GenerationContext::field_name(&column.database_name),
                    GenerationContext::rust_type(&column.database_type, !reference.is_required)
                ));
            }
        }

        out.push_str("}\n");
        out
    }

    fn generate_impl(&self, name: &str, warnings: &mut Vec<String>) -> String {
        let entity = self.entity;
        let mut out = format!("impl {name} {{\n");

        out.push_str(&doc_comment("Table name", 4));
        out.push_str(&format!(
            "    pub const TABLE: &'static str = {:?};\n\n",
            entity.table
        ));

        out.push_str(&doc_comment("Column names in declaration order", 4));
        out.push_str(&format!(
            "    pub const COLUMNS: &'static [&'static str] = &[{}];\n\n",
            string_list(entity.column_names())
        ));

        out.push_str(&doc_comment("Primary key columns", 4));
        out.push_str(&format!(
            "    pub const PRIMARY_KEY: &'static [&'static str] = &[{}];\n",
            string_list(entity.primary_key_attributes().map(|a| a.database_name.as_str()))
        ));

        let mut seen = HashSet::new();
        for accessor in self.accessors(warnings) {
            if !seen.insert(accessor.name.clone()) {
                warnings.push(format!(
                    "Entity '{}': accessor '{}' is declared more than once, keeping the first",
                    entity.class_name, accessor.name
                ));
                continue;
            }
            out.push('\n');
            out.push_str(&doc_comment(&accessor.doc, 4));
            out.push_str(&format!(
                "    pub fn {}() -> &'static str {{\n        {:?}\n    }}\n",
                accessor.name, accessor.sql
            ));
        }

        out.push_str("}\n");
        out
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    fn accessors(&self, warnings: &mut Vec<String>) -> Vec<Accessor> {
        let entity = self.entity;
        let mut accessors = Vec::new();

        for reference in &entity.references {
            match self.reference_accessor(reference) {
                Some(accessor) => accessors.push(accessor),
                None => warnings.push(format!(
                    "Entity '{}': reference '{}' is unresolved, no accessor generated",
                    entity.class_name, reference.name
                )),
            }
        }

        for collector in &entity.collectors {
            match self.collector_accessor(collector) {
                Some(accessor) => accessors.push(accessor),
                None => warnings.push(format!(
                    "Entity '{}': collector '{}' is incomplete, no accessor generated",
                    entity.class_name, collector.name
                )),
            }
        }

        for mapping in self.ctx.nm_mappings_for(entity.id) {
            match self.nm_mapping_accessor(mapping) {
                Some(accessor) => accessors.push(accessor),
                None => warnings.push(format!(
                    "Entity '{}': many-to-many mapping '{}' has no usable mapping entity, \
                     no accessor generated",
                    entity.class_name,
                    mapping.method_name()
                )),
            }
        }

        accessors
    }

    /// `SELECT` of the row a reference points to; binds the local columns
    fn reference_accessor(&self, reference: &Reference) -> Option<Accessor> {
        let foreign_table = reference.foreign_table()?;
        let columns = reference.columns();
        let condition = columns
            .iter()
            .map(|c| format!("{} = ?", self.q.quote(&c.referenced_database_name)))
            .collect::<Vec<_>>()
            .join(" AND ");

        Some(Accessor {
            name: getter_name(&reference.method_name()),
            doc: format!(
                "Select the `{}` referenced by `{}`.\n\nBind: {}",
                reference.foreign_class,
                reference.name,
                bind_list(columns.iter().map(|c| c.database_name.as_str()))
            ),
            sql: format!(
                "SELECT * FROM {} WHERE {}",
                self.q.quote(foreign_table),
                condition
            ),
        })
    }

    fn collector_accessor(&self, collector: &Collector) -> Option<Accessor> {
        let container = self.ctx.container();
        if !collector.is_complete(container) {
            return None;
        }

        let foreign = self.ctx.entity_by_id(collector.foreign_entity()?)?;
        let handle = collector.reference()?;

        match &collector.kind {
            CollectorKind::OneToMany { .. } => {
                let reference = foreign.get_reference_by_name(&handle.name)?;
                let columns = reference.columns();
                let condition = columns
                    .iter()
                    .map(|c| format!("{} = ?", self.q.quote(&c.database_name)))
                    .collect::<Vec<_>>()
                    .join(" AND ");

                Some(Accessor {
                    name: getter_name(&collector.method_name()),
                    doc: format!(
                        "Select the `{}` rows collected by `{}`.\n\nBind: {}",
                        foreign.class_name,
                        collector.name,
                        bind_list(columns.iter().map(|c| c.referenced_database_name.as_str()))
                    ),
                    sql: format!(
                        "SELECT * FROM {} WHERE {}",
                        self.q.quote(&foreign.table),
                        condition
                    ),
                })
            }
            CollectorKind::ManyToMany { .. } => {
                let mapping = self.ctx.entity_by_id(collector.mapping_entity()?)?;
                let to_target = mapping.get_reference_by_name(&handle.name)?;
                let to_source = mapping.references.iter().find(|r| {
                    r.name != handle.name
                        && r.foreign_table() == Some(self.entity.table.as_str())
                })?;

                Some(Accessor {
                    name: getter_name(&collector.method_name()),
                    doc: format!(
                        "Select the `{}` rows linked through `{}`.\n\nBind: {}",
                        foreign.class_name,
                        mapping.class_name,
                        bind_list(
                            to_source
                                .columns()
                                .iter()
                                .map(|c| c.referenced_database_name.as_str())
                        )
                    ),
                    sql: self.join_select(foreign, mapping, to_target, to_source),
                })
            }
        }
    }

    /// Reciprocal accessor requested by a many-to-many collector elsewhere
    fn nm_mapping_accessor(&self, nm: &NMMapping) -> Option<Accessor> {
        let origin = self.ctx.entity_by_id(nm.foreign_entity)?;
        let mapping = self.ctx.entity_by_id(nm.mapping_entity?)?;
        let collector = origin.get_collector(&nm.collector)?;
        let reference_name = collector.kind.reference_name();

        let to_this = mapping.get_reference_by_name(reference_name)?;
        let to_origin = mapping.references.iter().find(|r| {
            r.name != reference_name && r.foreign_table() == Some(origin.table.as_str())
        })?;

        Some(Accessor {
            name: getter_name(&nm.method_name()),
            doc: format!(
                "Select the `{}` rows linking here through `{}` (collector `{}`).\n\nBind: {}",
                origin.class_name,
                mapping.class_name,
                nm.collector,
                bind_list(to_this.columns().iter().map(|c| c.referenced_database_name.as_str()))
            ),
            sql: self.join_select(origin, mapping, to_origin, to_this),
        })
    }

    /// `SELECT t.* FROM target t JOIN mapping m ON ... WHERE m.<to_source cols> = ?`
    fn join_select(
        &self,
        target: &Entity,
        mapping: &Entity,
        to_target: &Reference,
        to_source: &Reference,
    ) -> String {
        let q = self.q;
        let join = to_target
            .columns()
            .iter()
            .map(|c| {
                format!(
                    "m.{} = t.{}",
                    q.quote(&c.database_name),
                    q.quote(&c.referenced_database_name)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        let condition = to_source
            .columns()
            .iter()
            .map(|c| format!("m.{} = ?", q.quote(&c.database_name)))
            .collect::<Vec<_>>()
            .join(" AND ");

        format!(
            "SELECT t.* FROM {} t JOIN {} m ON {} WHERE {}",
            q.quote(&target.table),
            q.quote(&mapping.table),
            join,
            condition
        )
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `Customer` → `get_customer`
fn getter_name(method_name: &str) -> String {
    format!("get_{}", GenerationContext::snake(method_name))
}

fn string_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .map(|s| format!("{s:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let list = items
        .into_iter()
        .map(|s| format!("`{s}`"))
        .collect::<Vec<_>>()
        .join(", ");
    if list.is_empty() {
        "nothing".to_string()
    } else {
        list
    }
}

// ============================================================================
// Tests
// ============================================================================
