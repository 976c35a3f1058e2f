//! Reference (foreign key) definitions
//!
//! A `Reference` belongs to the entity that owns the foreign key columns and
//! points at another entity by class name. The link is resolved lazily by the
//! [`DataModelContainer`](crate::DataModelContainer); until then the
//! reference only knows the names it was declared with.

use crate::container::DataModelContainer;
use crate::naming::{method_name, reference_column_name};
use serde::{Deserialize, Serialize};
use tablesmith_core::{
    EntityId, ReferentialAction, Resolution, Validatable, ValidationErrorCode, ValidationLogger,
};

// ============================================================================
// ReferenceMapping
// ============================================================================

/// One local column → referenced attribute pair, as declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMapping {
    /// Local column name
    pub column_name: String,

    /// Name of the referenced attribute on the foreign entity
    pub foreign_attribute: String,
}

impl ReferenceMapping {
    /// Create a mapping
    pub fn new(column_name: impl Into<String>, foreign_attribute: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            foreign_attribute: foreign_attribute.into(),
        }
    }
}

// ============================================================================
// ReferenceColumn
// ============================================================================

/// A mapping column after resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceColumn {
    /// Local column name
    pub database_name: String,

    /// Column type, taken from the referenced attribute
    pub database_type: String,

    /// Referenced column name on the foreign table
    pub referenced_database_name: String,
}

/// Outcome of a successful reference resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub foreign_entity: EntityId,
    pub foreign_table: String,
    pub columns: Vec<ReferenceColumn>,
}

/// Why a reference could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceFault {
    UnknownForeignClass(String),
    UnknownAttribute { foreign_class: String, attribute: String },
}

impl std::fmt::Display for ReferenceFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceFault::UnknownForeignClass(class) => {
                write!(f, "refers to unknown entity {class}")
            }
            ReferenceFault::UnknownAttribute {
                foreign_class,
                attribute,
            } => write!(f, "maps unknown attribute {foreign_class}.{attribute}"),
        }
    }
}

// ============================================================================
// Reference
// ============================================================================

/// Foreign key relationship from the owning entity to a foreign entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// Reference name, used for lookups (e.g., "customer")
    pub name: String,

    /// Class name of the referenced entity
    pub foreign_class: String,

    /// Constraint name; filled with `{table}_{name}` when added to an entity
    pub constraint_name: String,

    /// Referential action on delete
    pub on_delete: ReferentialAction,

    /// Referential action on update
    pub on_update: ReferentialAction,

    /// Declared column mappings
    pub mappings: Vec<ReferenceMapping>,

    /// Whether the reference columns are NOT NULL
    pub is_required: bool,

    #[serde(skip)]
    resolution: Resolution<ResolvedReference, ReferenceFault>,
}

impl Reference {
    /// Create a new reference to the given class
    pub fn new(name: impl Into<String>, foreign_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            foreign_class: foreign_class.into(),
            constraint_name: String::new(),
            on_delete: ReferentialAction::Restrict,
            on_update: ReferentialAction::Restrict,
            mappings: Vec::new(),
            is_required: false,
            resolution: Resolution::Unresolved,
        }
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Add a column mapping
    pub fn with_mapping(
        mut self,
        column_name: impl Into<String>,
        foreign_attribute: impl Into<String>,
    ) -> Self {
        self.mappings
            .push(ReferenceMapping::new(column_name, foreign_attribute));
        self
    }

    /// Add a mapping with the conventional column name `{reference}_{attribute}`
    pub fn with_default_mapping(self, foreign_attribute: impl Into<String>) -> Self {
        let foreign_attribute = foreign_attribute.into();
        let column = reference_column_name(&self.name, &foreign_attribute);
        self.with_mapping(column, foreign_attribute)
    }

    /// Set the constraint name
    pub fn with_constraint_name(mut self, constraint_name: impl Into<String>) -> Self {
        self.constraint_name = constraint_name.into();
        self
    }

    /// Set the on delete action
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the on update action
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// Mark the reference columns as NOT NULL
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve the foreign entity and the referenced columns.
    ///
    /// Pure lookup against the container; the result is stored with
    /// [`set_resolution`](Self::set_resolution).
    pub fn resolve(
        &self,
        container: &DataModelContainer,
    ) -> Resolution<ResolvedReference, ReferenceFault> {
        let Some(foreign) = container.get_entity_by_classname(&self.foreign_class) else {
            return Resolution::Invalid(ReferenceFault::UnknownForeignClass(
                self.foreign_class.clone(),
            ));
        };

        let mut columns = Vec::with_capacity(self.mappings.len());
        for mapping in &self.mappings {
            let Some(attribute) = foreign.get_attribute(&mapping.foreign_attribute) else {
                return Resolution::Invalid(ReferenceFault::UnknownAttribute {
                    foreign_class: self.foreign_class.clone(),
                    attribute: mapping.foreign_attribute.clone(),
                });
            };
            columns.push(ReferenceColumn {
                database_name: mapping.column_name.clone(),
                database_type: attribute.database_type.clone(),
                referenced_database_name: attribute.database_name.clone(),
            });
        }

        Resolution::Resolved(ResolvedReference {
            foreign_entity: foreign.id,
            foreign_table: foreign.table.clone(),
            columns,
        })
    }

    /// Store the outcome of [`resolve`](Self::resolve)
    pub fn set_resolution(&mut self, resolution: Resolution<ResolvedReference, ReferenceFault>) {
        self.resolution = resolution;
    }

    /// Current resolution state
    pub fn resolution(&self) -> &Resolution<ResolvedReference, ReferenceFault> {
        &self.resolution
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Resolved foreign entity id
    pub fn foreign_entity(&self) -> Option<EntityId> {
        self.resolution.resolved().map(|r| r.foreign_entity)
    }

    /// Resolved foreign table name
    pub fn foreign_table(&self) -> Option<&str> {
        self.resolution.resolved().map(|r| r.foreign_table.as_str())
    }

    /// Resolved columns; empty while unresolved
    pub fn columns(&self) -> &[ReferenceColumn] {
        self.resolution
            .resolved()
            .map(|r| r.columns.as_slice())
            .unwrap_or_default()
    }

    /// Local column names as declared (available before resolution)
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.column_name.as_str())
    }

    /// Accessor name used by generated code (e.g., "Customer")
    pub fn method_name(&self) -> String {
        method_name(&self.name)
    }
}

impl Validatable for Reference {
    fn validate(&self, logger: &mut dyn ValidationLogger) {
        if self.name.trim().is_empty() {
            logger.error(
                "Reference without name found".to_string(),
                ValidationErrorCode::ReferenceNameMissing,
            );
        }

        if self.mappings.is_empty() {
            logger.error(
                format!("Reference '{}' has no column mapping", self.name),
                ValidationErrorCode::ReferenceWithoutMapping,
            );
        }

        match &self.resolution {
            Resolution::Resolved(_) => {}
            Resolution::Invalid(fault @ ReferenceFault::UnknownForeignClass(_)) => logger.error(
                format!("Reference '{}' {}", self.name, fault),
                ValidationErrorCode::ReferenceForeignClassUnknown,
            ),
            Resolution::Invalid(fault @ ReferenceFault::UnknownAttribute { .. }) => logger.error(
                format!("Reference '{}' {}", self.name, fault),
                ValidationErrorCode::ReferencedAttributeUnknown,
            ),
            Resolution::Unresolved => logger.error(
                format!(
                    "Reference '{}' was never resolved against entity {}",
                    self.name, self.foreign_class
                ),
                ValidationErrorCode::ReferenceForeignClassUnknown,
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, Entity, ValidationLog};

    fn container() -> DataModelContainer {
        let mut container = DataModelContainer::new();
        container
            .register_entity(
                Entity::new("Customer", "customers")
                    .with_attribute(Attribute::primary_key())
                    .with_attribute(
                        Attribute::new("code", "CHAR(8)").with_database_name("cust_code"),
                    ),
            )
            .unwrap();
        container
    }

    #[test]
    fn test_reference_builders() {
        let reference = Reference::new("customer", "Customer")
            .with_default_mapping("id")
            .on_delete(ReferentialAction::Cascade)
            .required();

        assert_eq!(reference.mappings[0].column_name, "customer_id");
        assert_eq!(reference.on_delete, ReferentialAction::Cascade);
        assert_eq!(reference.on_update, ReferentialAction::Restrict);
        assert!(reference.is_required);
        assert_eq!(reference.method_name(), "Customer");
        assert!(reference.resolution().is_pending());
    }

    #[test]
    fn test_resolve_copies_foreign_types() {
        let container = container();
        let reference = Reference::new("customer", "Customer")
            .with_mapping("customer_id", "id")
            .with_mapping("customer_code", "code");

        let resolution = reference.resolve(&container);
        let resolved = resolution.resolved().unwrap();

        assert_eq!(resolved.foreign_table, "customers");
        assert_eq!(resolved.columns.len(), 2);
        assert_eq!(resolved.columns[0].database_type, "INT");
        assert_eq!(resolved.columns[1].database_type, "CHAR(8)");
        assert_eq!(resolved.columns[1].referenced_database_name, "cust_code");
    }

    #[test]
    fn test_resolve_unknown_class() {
        let container = container();
        let mut reference = Reference::new("supplier", "Supplier").with_default_mapping("id");
        reference.set_resolution(reference.resolve(&container));

        assert!(reference.columns().is_empty());
        assert!(reference.foreign_table().is_none());

        let mut log = ValidationLog::new();
        reference.validate(&mut log);
        assert_eq!(log.codes(), vec![431]);
    }

    #[test]
    fn test_resolve_unknown_attribute() {
        let container = container();
        let mut reference = Reference::new("customer", "Customer").with_default_mapping("uuid");
        reference.set_resolution(reference.resolve(&container));

        let mut log = ValidationLog::new();
        reference.validate(&mut log);
        assert_eq!(log.codes(), vec![433]);
        assert!(log.errors()[0].message.contains("Customer.uuid"));
    }

    #[test]
    fn test_reference_without_mapping() {
        let container = container();
        let mut reference = Reference::new("customer", "Customer");
        reference.set_resolution(reference.resolve(&container));

        let mut log = ValidationLog::new();
        reference.validate(&mut log);
        assert_eq!(log.codes(), vec![432]);
    }
}
