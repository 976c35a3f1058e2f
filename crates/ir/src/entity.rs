//! Entity definitions for data models
//!
//! This module contains the `Entity` struct, which maps one class to one
//! table, and `EntityExtension`, which adds members to an entity declared
//! elsewhere in the schema.

use crate::attribute::Attribute;
use crate::collector::Collector;
use crate::index::Index;
use crate::naming::{constraint_name, short_class_name};
use crate::reference::Reference;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tablesmith_core::{EntityId, Validatable, ValidationErrorCode, ValidationLogger};
use uuid::Uuid;

// ============================================================================
// Entity
// ============================================================================

/// Represents a data entity (maps to a database table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier for this entity
    pub id: EntityId,

    /// Class name without namespace (e.g., "OrderLine")
    pub class_name: String,

    /// Optional namespace (e.g., "App\\Model")
    pub namespace: Option<String>,

    /// Database table name (e.g., "order_lines")
    pub table: String,

    /// Columns, in declaration order
    pub attributes: Vec<Attribute>,

    /// Outgoing foreign keys
    pub references: Vec<Reference>,

    /// Table indexes
    pub indexes: Vec<Index>,

    /// Derived collection accessors
    pub collectors: Vec<Collector>,

    /// Whether the declaring file (or an extending one) changed since the
    /// last generation run
    #[serde(default = "changed_by_default")]
    pub has_changed_since_last_generation: bool,
}

fn changed_by_default() -> bool {
    true
}

impl Entity {
    /// Create a new entity for the given class and table
    pub fn new(class_name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            class_name: class_name.into(),
            namespace: None,
            table: table.into(),
            attributes: Vec::new(),
            references: Vec::new(),
            indexes: Vec::new(),
            collectors: Vec::new(),
            has_changed_since_last_generation: true,
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the change flag
    pub fn with_changed_since_last_generation(mut self, changed: bool) -> Self {
        self.has_changed_since_last_generation = changed;
        self
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.trim().is_empty()).then_some(namespace);
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.add_attribute(attribute);
        self
    }

    /// Add a reference
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.add_reference(reference);
        self
    }

    /// Add an index
    pub fn with_index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    /// Add a collector
    pub fn with_collector(mut self, collector: Collector) -> Self {
        self.add_collector(collector);
        self
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add an attribute
    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Add a reference, filling in the default constraint name
    pub fn add_reference(&mut self, mut reference: Reference) {
        if reference.constraint_name.trim().is_empty() {
            reference.constraint_name = constraint_name(&self.table, &reference.name);
        }
        self.references.push(reference);
    }

    /// Add an index
    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// Add a collector
    pub fn add_collector(&mut self, collector: Collector) {
        self.collectors.push(collector);
    }

    /// Merge the members of an extension into this entity.
    ///
    /// A changed extension marks the entity as changed.
    pub fn extend(&mut self, extension: EntityExtension) {
        tracing::debug!(
            entity = %self.class_name,
            attributes = extension.attributes.len(),
            references = extension.references.len(),
            indexes = extension.indexes.len(),
            collectors = extension.collectors.len(),
            "applying entity extension",
        );

        self.has_changed_since_last_generation |= extension.has_changed_since_last_generation;
        self.attributes.extend(extension.attributes);
        for reference in extension.references {
            self.add_reference(reference);
        }
        self.indexes.extend(extension.indexes);
        self.collectors.extend(extension.collectors);
    }

    /// Resolve every index part against this entity's columns
    pub fn resolve_indexes(&mut self) {
        let resolutions: Vec<_> = self
            .indexes
            .iter()
            .map(|index| index.resolve_parts(self))
            .collect();

        for (index, columns) in self.indexes.iter_mut().zip(resolutions) {
            index.apply_resolution(columns);
        }
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Get an attribute by model name
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Get an attribute by column name
    pub fn get_attribute_by_database_name(&self, database_name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.database_name == database_name)
    }

    /// Get a reference by name
    pub fn get_reference_by_name(&self, name: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.name == name)
    }

    /// Get a reference by constraint name
    pub fn get_reference_by_constraint(&self, constraint_name: &str) -> Option<&Reference> {
        self.references
            .iter()
            .find(|r| r.constraint_name == constraint_name)
    }

    /// Get an index by name
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Get a collector by name
    pub fn get_collector(&self, name: &str) -> Option<&Collector> {
        self.collectors.iter().find(|c| c.name == name)
    }

    /// Primary key columns
    pub fn primary_key_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.is_primary_key)
    }

    /// Class name including the namespace, if any (e.g., "App\\Model\\Order")
    pub fn fully_qualified_class_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}\\{}", namespace.trim_end_matches('\\'), self.class_name),
            None => self.class_name.clone(),
        }
    }

    /// Class name without any namespace prefix
    pub fn short_name(&self) -> &str {
        short_class_name(&self.class_name)
    }

    /// Every column name of the table: attributes first, then reference columns
    pub fn column_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .map(|a| a.database_name.as_str())
            .chain(self.references.iter().flat_map(|r| r.column_names()))
            .collect()
    }

    /// Ids of the entities this entity holds foreign keys to, excluding itself
    pub fn dependencies(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .references
            .iter()
            .filter_map(Reference::foreign_entity)
            .filter(|id| *id != self.id)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl Validatable for Entity {
    fn validate(&self, logger: &mut dyn ValidationLogger) {
        if self.class_name.trim().is_empty() {
            logger.error(
                format!("Entity without class name found (table '{}')", self.table),
                ValidationErrorCode::EntityClassMissing,
            );
        }

        if self.table.trim().is_empty() {
            logger.error(
                format!("Entity '{}' has no table name", self.class_name),
                ValidationErrorCode::EntityTableMissing,
            );
        }

        if self.primary_key_attributes().next().is_none() {
            logger.error(
                format!("Entity '{}' has no primary key", self.class_name),
                ValidationErrorCode::NoPrimaryKey,
            );
        }

        let mut seen = HashSet::new();
        for column in self.column_names() {
            if !seen.insert(column) {
                logger.error(
                    format!(
                        "Entity '{}' declares column '{}' more than once",
                        self.class_name, column
                    ),
                    ValidationErrorCode::DuplicateColumn,
                );
            }
        }

        for attribute in &self.attributes {
            attribute.validate(logger);
        }
        for reference in &self.references {
            reference.validate(logger);
        }
        for index in &self.indexes {
            index.validate(logger);
        }
        for collector in &self.collectors {
            collector.validate(logger);
        }
    }
}

// ============================================================================
// EntityExtension
// ============================================================================

/// Additional members for an entity declared elsewhere
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityExtension {
    /// Class name of the entity to extend
    pub class_name: String,

    pub attributes: Vec<Attribute>,
    pub references: Vec<Reference>,
    pub indexes: Vec<Index>,
    pub collectors: Vec<Collector>,

    /// Whether the declaring file changed since the last generation run
    #[serde(default = "changed_by_default")]
    pub has_changed_since_last_generation: bool,
}

impl EntityExtension {
    /// Create an empty extension for the given class
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            attributes: Vec::new(),
            references: Vec::new(),
            indexes: Vec::new(),
            collectors: Vec::new(),
            has_changed_since_last_generation: true,
        }
    }

    /// Set the change flag
    pub fn with_changed_since_last_generation(mut self, changed: bool) -> Self {
        self.has_changed_since_last_generation = changed;
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a reference
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Add an index
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a collector
    pub fn with_collector(mut self, collector: Collector) -> Self {
        self.collectors.push(collector);
        self
    }

    /// Whether the extension adds nothing
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && self.references.is_empty()
            && self.indexes.is_empty()
            && self.collectors.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationLog;
    use pretty_assertions::assert_eq;

    fn order() -> Entity {
        Entity::new("Order", "orders")
            .with_attribute(Attribute::primary_key())
            .with_attribute(Attribute::new("number", "VARCHAR(20)").required())
    }

    #[test]
    fn test_entity_creation() {
        let entity = order().with_namespace("App\\Model");

        assert_eq!(entity.class_name, "Order");
        assert_eq!(entity.table, "orders");
        assert_eq!(entity.fully_qualified_class_name(), "App\\Model\\Order");
        assert_eq!(entity.attributes.len(), 2);
        assert_eq!(entity.primary_key_attributes().count(), 1);
    }

    #[test]
    fn test_blank_namespace_is_ignored() {
        let entity = order().with_namespace("  ");
        assert_eq!(entity.namespace, None);
        assert_eq!(entity.fully_qualified_class_name(), "Order");
    }

    #[test]
    fn test_default_constraint_name() {
        let entity = order()
            .with_reference(Reference::new("customer", "Customer").with_default_mapping("id"))
            .with_reference(
                Reference::new("shipTo", "Address")
                    .with_default_mapping("id")
                    .with_constraint_name("fk_ship"),
            );

        assert_eq!(entity.references[0].constraint_name, "orders_customer");
        assert_eq!(entity.references[1].constraint_name, "fk_ship");
        assert!(entity.get_reference_by_constraint("fk_ship").is_some());
        assert_eq!(
            entity.column_names(),
            vec!["id", "number", "customer_id", "ship_to_id"]
        );
    }

    #[test]
    fn test_lookups() {
        let entity = Entity::new("User", "users")
            .with_attribute(Attribute::new("email", "VARCHAR(100)").with_database_name("mail"))
            .with_index(Index::new("idx_mail").on("email"))
            .with_collector(Collector::one_to_many("orders", "Order", "user"));

        assert!(entity.get_attribute("email").is_some());
        assert!(entity.get_attribute("mail").is_none());
        assert!(entity.get_attribute_by_database_name("mail").is_some());
        assert!(entity.get_index("idx_mail").is_some());
        assert!(entity.get_collector("orders").is_some());
        assert!(entity.get_reference_by_name("orders").is_none());
    }

    #[test]
    fn test_extend() {
        let mut entity = order();
        let extension = EntityExtension::new("Order")
            .with_attribute(Attribute::new("note", "TEXT"))
            .with_reference(Reference::new("customer", "Customer").with_default_mapping("id"));
        assert!(!extension.is_empty());

        entity.extend(extension);

        assert!(entity.get_attribute("note").is_some());
        assert_eq!(entity.references[0].constraint_name, "orders_customer");
    }

    #[test]
    fn test_changed_extension_marks_entity_changed() {
        let mut entity = order().with_changed_since_last_generation(false);
        entity.extend(EntityExtension::new("Order").with_changed_since_last_generation(false));
        assert!(!entity.has_changed_since_last_generation);

        entity.extend(EntityExtension::new("Order"));
        assert!(entity.has_changed_since_last_generation);

        // an unchanged extension never clears the flag
        entity.extend(EntityExtension::new("Order").with_changed_since_last_generation(false));
        assert!(entity.has_changed_since_last_generation);
    }

    #[test]
    fn test_resolve_indexes() {
        let mut entity = order().with_index(Index::new("idx_number").unique().on("number"));
        entity.resolve_indexes();
        assert_eq!(
            entity.indexes[0].parts[0].resolved_database_name(),
            Some("number")
        );
    }

    #[test]
    fn test_validate_entity() {
        let entity = Entity::new("", "")
            .with_attribute(Attribute::new("code", "CHAR(3)"))
            .with_attribute(Attribute::new("code", "CHAR(3)"));

        let mut log = ValidationLog::new();
        entity.validate(&mut log);
        assert_eq!(log.codes(), vec![410, 411, 412, 422]);
    }

    #[test]
    fn test_valid_entity() {
        let mut log = ValidationLog::new();
        order().validate(&mut log);
        assert!(!log.has_errors());
    }
}
