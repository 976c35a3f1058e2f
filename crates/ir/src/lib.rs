//! # Tablesmith IR (Intermediate Representation)
//!
//! This crate provides the in-memory data model read from schema XML.
//! It contains the structures describing tables and their relations, and the
//! container that resolves the links between them.
//!
//! ## Core Concepts
//!
//! - **Entity**: A class that maps to a database table (e.g., Order)
//! - **Attribute**: A property of an entity that maps to a column
//! - **Reference**: A foreign key from one entity to another
//! - **Index**: A named table index over one or more columns
//! - **Collector**: A derived one-to-many or many-to-many accessor
//! - **DataModelContainer**: The root that owns, resolves and validates entities
//!
//! ## Example
//!
//! ```rust,ignore
//! use tablesmith_ir::prelude::*;
//!
//! let mut container = DataModelContainer::new();
//! container.register_entity(
//!     Entity::new("Order", "orders")
//!         .with_attribute(Attribute::primary_key())
//!         .with_collector(Collector::one_to_many("items", "OrderLine", "order")),
//! )?;
//!
//! let log = container.resolve_and_validate();
//! assert!(log.has_errors());
//! ```

// Module declarations
pub mod attribute;
pub mod collector;
pub mod container;
pub mod entity;
pub mod index;
pub mod naming;
pub mod reference;
pub mod validation;
pub mod xml;

// Re-export commonly used types at crate root
pub use attribute::Attribute;
pub use collector::{Collector, CollectorBinding, NMMapping, ReferenceHandle};
pub use container::DataModelContainer;
pub use entity::{Entity, EntityExtension};
pub use index::{Index, IndexPart, SortOrder};
pub use reference::{
    Reference, ReferenceColumn, ReferenceFault, ReferenceMapping, ResolvedReference,
};
pub use validation::{Severity, ValidationEntry, ValidationLog};
pub use xml::{SchemaDocument, load_container, parse_file, parse_str};

// Re-export core types that are commonly used with IR
pub use tablesmith_core::{
    CollectorKind, DatabaseType, EngineError, EngineResult, EntityId, ReferentialAction,
    Resolution, Validatable, ValidationErrorCode, ValidationLogger,
};

/// File extension of schema files
pub const SCHEMA_FILE_EXTENSION: &str = "xml";

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::{
        // Model
        Attribute,
        Collector,
        CollectorKind,
        DataModelContainer,
        // Re-exported from core
        DatabaseType,
        EngineError,
        EngineResult,
        Entity,
        EntityExtension,
        Index,
        IndexPart,
        NMMapping,
        Reference,
        ReferentialAction,
        SortOrder,
        Validatable,
        ValidationLog,
        ValidationLogger,
        // Loading
        load_container,
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_schema_file_extension() {
        assert_eq!(super::SCHEMA_FILE_EXTENSION, "xml");
    }

    #[test]
    fn test_prelude_pipeline() {
        let mut container = DataModelContainer::new();
        container
            .register_entity(
                Entity::new("Order", "orders")
                    .with_attribute(Attribute::primary_key())
                    .with_collector(Collector::one_to_many("items", "OrderLine", "order")),
            )
            .unwrap();

        let log = container.resolve_and_validate();
        assert_eq!(log.codes(), vec![401, 402]);
    }
}
