//! Collector definitions
//!
//! A `Collector` is a named accessor on an entity that yields the records of
//! another entity: one-to-many through a reference on the foreign entity, or
//! many-to-many through a reference on a mapping (join) entity.
//!
//! Collectors are resolved only after every entity is registered, because
//! they point at entities that may be declared anywhere in the schema.
//! Resolution tolerates missing entities and references; the validation pass
//! reports them afterwards.

use crate::container::DataModelContainer;
use crate::entity::Entity;
use crate::naming::{method_name, short_class_name};
use serde::{Deserialize, Serialize};
use tablesmith_core::{
    CollectorKind, EntityId, Resolution, Validatable, ValidationErrorCode, ValidationLogger,
};

// ============================================================================
// Resolution Types
// ============================================================================

/// A reference identified by its owning entity and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceHandle {
    pub entity: EntityId,
    pub name: String,
}

/// The links a collector resolved to.
///
/// For one-to-many collectors `mapping_entity` stays `Unresolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorBinding {
    pub foreign_entity: Resolution<EntityId>,
    pub mapping_entity: Resolution<EntityId>,
    pub reference: Resolution<ReferenceHandle>,
}

/// Request for a reciprocal accessor, raised by a many-to-many collector on
/// another entity and stored under the receiving entity's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NMMapping {
    /// Entity that receives the reciprocal accessor (the collector's foreign entity)
    pub entity: EntityId,

    /// Mapping (join) entity, if it could be resolved
    pub mapping_entity: Option<EntityId>,

    /// Entity declaring the collector
    pub foreign_entity: EntityId,

    /// Class name of the declaring entity
    pub foreign_class: String,

    /// Name of the originating collector
    pub collector: String,
}

impl NMMapping {
    /// Accessor name for the receiving side (e.g., `Order` + `tags` → "OrderTags")
    pub fn method_name(&self) -> String {
        format!(
            "{}{}",
            method_name(short_class_name(&self.foreign_class)),
            method_name(&self.collector)
        )
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Derived collection accessor on an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collector {
    /// Collector name (e.g., "items")
    pub name: String,

    /// Relationship type and the names it requires
    pub kind: CollectorKind,

    #[serde(skip)]
    binding: CollectorBinding,
}

impl Collector {
    /// Create a new collector
    pub fn new(name: impl Into<String>, kind: CollectorKind) -> Self {
        Self {
            name: name.into(),
            kind,
            binding: CollectorBinding::default(),
        }
    }

    /// One-to-many collector through `reference_name` on `foreign_class`
    pub fn one_to_many(
        name: impl Into<String>,
        foreign_class: impl Into<String>,
        reference_name: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            CollectorKind::OneToMany {
                foreign_class: foreign_class.into(),
                reference_name: reference_name.into(),
            },
        )
    }

    /// Many-to-many collector through `reference_name` on `mapping_class`
    pub fn many_to_many(
        name: impl Into<String>,
        foreign_class: impl Into<String>,
        mapping_class: impl Into<String>,
        reference_name: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            CollectorKind::ManyToMany {
                foreign_class: foreign_class.into(),
                mapping_class: mapping_class.into(),
                reference_name: reference_name.into(),
            },
        )
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve against the container.
    ///
    /// Returns the binding and, for many-to-many collectors whose foreign
    /// entity exists, the [`NMMapping`] to register for that entity. The
    /// mapping is produced even when the mapping entity or its reference is
    /// missing so the foreign side still learns about the relationship.
    pub fn resolve(
        &self,
        owner: &Entity,
        container: &DataModelContainer,
    ) -> (CollectorBinding, Option<NMMapping>) {
        match &self.kind {
            CollectorKind::OneToMany {
                foreign_class,
                reference_name,
            } => (
                Self::resolve_one_to_many(foreign_class, reference_name, container),
                None,
            ),
            CollectorKind::ManyToMany {
                foreign_class,
                mapping_class,
                reference_name,
            } => {
                let foreign = container.get_entity_by_classname(foreign_class);
                let mapping = container.get_entity_by_classname(mapping_class);

                let reference = match mapping {
                    Some(mapping) => lookup_reference(mapping, reference_name),
                    None => Resolution::Invalid(format!(
                        "mapping entity {mapping_class} is unknown"
                    )),
                };

                let nm_mapping = foreign.map(|foreign| NMMapping {
                    entity: foreign.id,
                    mapping_entity: mapping.map(|m| m.id),
                    foreign_entity: owner.id,
                    foreign_class: owner.class_name.clone(),
                    collector: self.name.clone(),
                });

                if nm_mapping.is_none() {
                    tracing::warn!(
                        entity = %owner.class_name,
                        collector = %self.name,
                        foreign_class = %foreign_class,
                        "many-to-many collector targets an unknown entity, \
                         no reciprocal accessor registered",
                    );
                }

                let binding = CollectorBinding {
                    foreign_entity: entity_resolution(foreign, foreign_class),
                    mapping_entity: entity_resolution(mapping, mapping_class),
                    reference,
                };
                (binding, nm_mapping)
            }
        }
    }

    fn resolve_one_to_many(
        foreign_class: &str,
        reference_name: &str,
        container: &DataModelContainer,
    ) -> CollectorBinding {
        let foreign = container.get_entity_by_classname(foreign_class);
        let reference = match foreign {
            Some(foreign) => lookup_reference(foreign, reference_name),
            None => Resolution::Invalid(format!("foreign entity {foreign_class} is unknown")),
        };

        CollectorBinding {
            foreign_entity: entity_resolution(foreign, foreign_class),
            mapping_entity: Resolution::Unresolved,
            reference,
        }
    }

    /// Store the outcome of [`resolve`](Self::resolve)
    pub fn set_binding(&mut self, binding: CollectorBinding) {
        self.binding = binding;
    }

    /// Current binding
    pub fn binding(&self) -> &CollectorBinding {
        &self.binding
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Resolved foreign entity id
    pub fn foreign_entity(&self) -> Option<EntityId> {
        self.binding.foreign_entity.resolved().copied()
    }

    /// Resolved mapping entity id (many-to-many only)
    pub fn mapping_entity(&self) -> Option<EntityId> {
        self.binding.mapping_entity.resolved().copied()
    }

    /// Resolved reference
    pub fn reference(&self) -> Option<&ReferenceHandle> {
        self.binding.reference.resolved()
    }

    /// Whether every link is in place.
    ///
    /// A many-to-many collector additionally needs the named reference on
    /// the mapping entity to point at the foreign entity's table.
    pub fn is_complete(&self, container: &DataModelContainer) -> bool {
        let (Some(foreign), Some(handle)) = (self.foreign_entity(), self.reference()) else {
            return false;
        };

        if !self.kind.is_many_to_many() {
            return true;
        }

        let (Some(foreign), Some(mapping)) = (
            container.entity(foreign),
            self.mapping_entity().and_then(|id| container.entity(id)),
        ) else {
            return false;
        };

        mapping
            .get_reference_by_name(&handle.name)
            .and_then(|r| r.foreign_table())
            .is_some_and(|table| table == foreign.table)
    }

    /// Fully qualified class name of the foreign entity, empty if unresolved
    pub fn referenced_class_name(&self, container: &DataModelContainer) -> String {
        self.foreign_entity()
            .and_then(|id| container.entity(id))
            .map(Entity::fully_qualified_class_name)
            .unwrap_or_default()
    }

    /// Accessor name (e.g., "items" → "Items")
    pub fn method_name(&self) -> String {
        method_name(&self.name)
    }

    /// Accessor name of the reference the collector goes through
    pub fn reference_method_name(&self) -> String {
        method_name(self.kind.reference_name())
    }

    /// Method name of the named reference on the mapping entity.
    ///
    /// `None` for one-to-many collectors and while the mapping entity is
    /// unresolved.
    pub fn nm_this_method_name(&self, container: &DataModelContainer) -> Option<String> {
        let mapping = container.entity(self.mapping_entity()?)?;
        mapping
            .get_reference_by_name(self.kind.reference_name())
            .map(|r| r.method_name())
    }

    /// Method name of the first mapping entity reference that points at the
    /// foreign entity's table.
    pub fn nm_foreign_method_name(&self, container: &DataModelContainer) -> Option<String> {
        let mapping = container.entity(self.mapping_entity()?)?;
        let foreign = container.entity(self.foreign_entity()?)?;
        mapping
            .references
            .iter()
            .find(|r| r.foreign_table() == Some(foreign.table.as_str()))
            .map(|r| r.method_name())
    }
}

impl Validatable for Collector {
    fn validate(&self, logger: &mut dyn ValidationLogger) {
        if self.name.trim().is_empty() {
            logger.error(
                "Collector without name found".to_string(),
                ValidationErrorCode::CollectorNameMissing,
            );
        }

        if !self.binding.foreign_entity.is_resolved() {
            logger.error(
                format!(
                    "Collector '{}' refers to unknown entity {}",
                    self.name,
                    self.kind.foreign_class()
                ),
                ValidationErrorCode::UnknownEntityReferenced,
            );
        }

        match &self.kind {
            CollectorKind::OneToMany { reference_name, .. } => {
                if !self.binding.reference.is_resolved() {
                    logger.error(
                        format!(
                            "Collector '{}' refers to unknown reference {}",
                            self.name, reference_name
                        ),
                        ValidationErrorCode::UnknownReference,
                    );
                }
            }
            CollectorKind::ManyToMany { mapping_class, .. } => {
                if !self.binding.mapping_entity.is_resolved() {
                    logger.error(
                        format!(
                            "Collector '{}' refers to unknown mapping entity {}",
                            self.name, mapping_class
                        ),
                        ValidationErrorCode::UnknownMappingClass,
                    );
                }
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn entity_resolution(entity: Option<&Entity>, class_name: &str) -> Resolution<EntityId> {
    match entity {
        Some(entity) => Resolution::Resolved(entity.id),
        None => Resolution::Invalid(format!("unknown entity {class_name}")),
    }
}

fn lookup_reference(entity: &Entity, reference_name: &str) -> Resolution<ReferenceHandle> {
    match entity.get_reference_by_name(reference_name) {
        Some(reference) => Resolution::Resolved(ReferenceHandle {
            entity: entity.id,
            name: reference.name.clone(),
        }),
        None => Resolution::Invalid(format!(
            "entity {} has no reference {}",
            entity.class_name, reference_name
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
