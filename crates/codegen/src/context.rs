//! # Generation Context
//!
//! The `GenerationContext` holds all the information needed by code generators
//! to produce output files. It is built from a resolved `DataModelContainer`
//! and provides:
//!
//! - Entities in dependency order (referenced tables first)
//! - Lookups by id and the inbound many-to-many mappings per entity
//! - Case conversion utilities (snake_case, PascalCase)
//! - Data type mapping (SQL column type → Rust type)
//!

use heck::{ToPascalCase, ToSnakeCase};
use tablesmith_core::EntityId;
use tablesmith_ir::{DataModelContainer, Entity, NMMapping};

use crate::GeneratorConfig;

/// Rust keywords that cannot be used as plain field names
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "yield",
];

// ============================================================================
// GenerationContext
// ============================================================================

/// Context carrying all information needed for code generation.
///
/// Built once per run and shared (by reference) with every generator module.
#[derive(Debug, Clone)]
pub struct GenerationContext<'a> {
    /// Generator configuration (dialect, output dir, flags, …)
    pub config: GeneratorConfig,

    container: &'a DataModelContainer,

    /// All entities, sorted by dependency order (referenced first)
    entities: Vec<&'a Entity>,

    /// Timestamp prefix for migration files (YYYYMMDDHHMMSS)
    pub migration_timestamp: String,
}

impl<'a> GenerationContext<'a> {
    // ====================================================================
    // Construction
    // ====================================================================

    /// Build a context for a resolved container
    pub fn new(container: &'a DataModelContainer, config: GeneratorConfig) -> Self {
        let migration_timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();

        Self {
            config,
            container,
            entities: container.entities_in_dependency_order(),
            migration_timestamp,
        }
    }

    /// Replace the migration timestamp (reproducible output in tests)
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.migration_timestamp = timestamp.into();
        self
    }

    // ====================================================================
    // Entity accessors
    // ====================================================================

    /// All entities in dependency order (referenced tables first)
    pub fn entities(&self) -> &[&'a Entity] {
        &self.entities
    }

    /// Number of entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Find an entity by id
    pub fn entity_by_id(&self, id: EntityId) -> Option<&'a Entity> {
        self.container.entity(id)
    }

    /// Many-to-many accessors other entities requested for this one
    pub fn nm_mappings_for(&self, id: EntityId) -> &'a [NMMapping] {
        self.container.nm_mappings_for(id)
    }

    /// The underlying container
    pub fn container(&self) -> &'a DataModelContainer {
        self.container
    }

    // ====================================================================
    // Naming helpers
    // ====================================================================

    /// Convert a name to `snake_case` (e.g. "OrderLine" → "order_line")
    pub fn snake(name: &str) -> String {
        name.to_snake_case()
    }

    /// Convert a name to `PascalCase` (e.g. "order_line" → "OrderLine")
    pub fn pascal(name: &str) -> String {
        name.to_pascal_case()
    }

    /// Entity → module file name (e.g. "OrderLine" → "order_line")
    pub fn module_name(entity: &Entity) -> String {
        Self::field_name(entity.short_name())
    }

    /// Column or accessor → Rust identifier, escaping keywords (`type` → `r#type`)
    pub fn field_name(name: &str) -> String {
        let snake = Self::snake(name);
        if RUST_KEYWORDS.contains(&snake.as_str()) {
            format!("r#{snake}")
        } else {
            snake
        }
    }

    // ====================================================================
    // Type mapping helpers
    // ====================================================================

    /// Map a SQL column type to a Rust type; nullable columns become `Option`
    pub fn rust_type(database_type: &str, nullable: bool) -> String {
        let base = Self::base_rust_type(database_type);
        if nullable {
            format!("Option<{base}>")
        } else {
            base.to_string()
        }
    }

    fn base_rust_type(database_type: &str) -> &'static str {
        let normalized = database_type.trim().to_ascii_uppercase();
        let unsigned = normalized.contains("UNSIGNED");
        let name = normalized
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match name {
            "BOOL" | "BOOLEAN" | "BIT" => "bool",
            "TINYINT" if normalized.starts_with("TINYINT(1)") => "bool",
            "TINYINT" if unsigned => "u8",
            "TINYINT" => "i8",
            "SMALLINT" if unsigned => "u16",
            "SMALLINT" => "i16",
            "INT" | "INTEGER" | "MEDIUMINT" if unsigned => "u32",
            "INT" | "INTEGER" | "MEDIUMINT" => "i32",
            "BIGINT" if unsigned => "u64",
            "BIGINT" => "i64",
            "FLOAT" => "f32",
            "DOUBLE" | "REAL" => "f64",
            "DATE" => "chrono::NaiveDate",
            "TIME" => "chrono::NaiveTime",
            "DATETIME" | "TIMESTAMP" => "chrono::NaiveDateTime",
            "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => "Vec<u8>",
            _ => "String",
        }
    }

    // ====================================================================
    // Migration naming
    // ====================================================================

    /// Migration file path (e.g. `migrations/20261019120000_create_schema.sql`)
    pub fn migration_filename(&self, name: &str) -> String {
        format!("migrations/{}_{}.sql", self.migration_timestamp, name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tablesmith_ir::{Attribute, Reference};

    #[test]
    fn test_rust_type_mapping() {
        assert_eq!(GenerationContext::rust_type("INT", false), "i32");
        assert_eq!(GenerationContext::rust_type("int unsigned", false), "u32");
        assert_eq!(GenerationContext::rust_type("BIGINT(20)", true), "Option<i64>");
        assert_eq!(GenerationContext::rust_type("TINYINT(1)", false), "bool");
        assert_eq!(GenerationContext::rust_type("VARCHAR(100)", false), "String");
        assert_eq!(GenerationContext::rust_type("decimal(10,2)", false), "String");
        assert_eq!(GenerationContext::rust_type("DATETIME", true), "Option<chrono::NaiveDateTime>");
        assert_eq!(GenerationContext::rust_type("BLOB", false), "Vec<u8>");
    }

    #[test]
    fn test_naming() {
        assert_eq!(GenerationContext::field_name("orderNumber"), "order_number");
        assert_eq!(GenerationContext::field_name("type"), "r#type");
        assert_eq!(GenerationContext::pascal("order_line"), "OrderLine");
        assert_eq!(
            GenerationContext::module_name(&Entity::new("OrderLine", "order_lines")),
            "order_line"
        );
    }

    #[test]
    fn test_context_orders_entities() {
        let mut container = DataModelContainer::new();
        container
            .register_entity(
                Entity::new("Order", "orders")
                    .with_attribute(Attribute::primary_key())
                    .with_reference(
                        Reference::new("customer", "Customer").with_default_mapping("id"),
                    ),
            )
            .unwrap();
        container
            .register_entity(
                Entity::new("Customer", "customers").with_attribute(Attribute::primary_key()),
            )
            .unwrap();
        container.resolve_all();

        let ctx = GenerationContext::new(&container, GeneratorConfig::default())
            .with_timestamp("20260101000000");
        let names: Vec<&str> = ctx.entities().iter().map(|e| e.class_name.as_str()).collect();
        assert_eq!(names, vec!["Customer", "Order"]);
        assert_eq!(ctx.entity_count(), 2);
        assert_eq!(
            ctx.migration_filename("create_schema"),
            "migrations/20260101000000_create_schema.sql"
        );
    }
}
