//! The data model container
//!
//! `DataModelContainer` owns every entity of a schema and indexes them by
//! fully-qualified class name, short class name, table name and id. Its
//! lifecycle is one-way: entities are registered, then
//! [`resolve_all`](DataModelContainer::resolve_all) links references, index
//! parts and collectors, after which the container is frozen and only read by
//! validation, diffing and code generation.

use crate::collector::{CollectorBinding, NMMapping};
use crate::entity::{Entity, EntityExtension};
use crate::naming::short_class_name;
use crate::reference::{ReferenceFault, ResolvedReference};
use crate::validation::ValidationLog;
use std::collections::{HashMap, HashSet};
use tablesmith_core::{
    EngineError, EngineResult, EntityId, Resolution, Validatable, ValidationLogger,
};

type ReferenceResolution = Resolution<ResolvedReference, ReferenceFault>;

// ============================================================================
// DataModelContainer
// ============================================================================

/// Root of the data model
#[derive(Debug, Clone, Default)]
pub struct DataModelContainer {
    entities: Vec<Entity>,
    by_class: HashMap<String, usize>,
    by_short_name: HashMap<String, Vec<usize>>,
    by_table: HashMap<String, usize>,
    by_id: HashMap<EntityId, usize>,

    /// Reciprocal accessor requests, keyed by the receiving entity
    nm_mappings: HashMap<EntityId, Vec<NMMapping>>,

    resolved: bool,
}

impl DataModelContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Add an entity.
    ///
    /// Fails if the fully-qualified class name or the table name is already
    /// taken, or if the container has been resolved.
    pub fn register_entity(&mut self, entity: Entity) -> EngineResult<EntityId> {
        let class = entity.fully_qualified_class_name();
        if self.resolved {
            return Err(EngineError::frozen("register", class));
        }
        if self.by_class.contains_key(&class) {
            return Err(EngineError::duplicate_class(class));
        }
        if self.by_table.contains_key(&entity.table) {
            return Err(EngineError::duplicate_table(&entity.table));
        }

        tracing::debug!(
            class = %entity.class_name,
            table = %entity.table,
            "registering entity",
        );

        let position = self.entities.len();
        let id = entity.id;
        self.by_class.insert(class, position);
        self.by_short_name
            .entry(entity.short_name().to_string())
            .or_default()
            .push(position);
        self.by_table.insert(entity.table.clone(), position);
        self.by_id.insert(id, position);
        self.entities.push(entity);
        Ok(id)
    }

    /// Merge an extension into the registered entity with the same class name
    pub fn apply_extension(&mut self, extension: EntityExtension) -> EngineResult<()> {
        if self.resolved {
            return Err(EngineError::frozen("extend", extension.class_name));
        }

        let position = self
            .position_by_classname(&extension.class_name)
            .ok_or_else(|| EngineError::EntityNotFound(extension.class_name.clone()))?;

        self.entities[position].extend(extension);
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Exact fully-qualified match first, then a unique short-name match.
    ///
    /// A qualified name only falls back to entities declared without a
    /// namespace, so `App\Other\Order` never finds `App\Model\Order`.
    fn position_by_classname(&self, name: &str) -> Option<usize> {
        if let Some(&position) = self.by_class.get(name) {
            return Some(position);
        }

        let short = short_class_name(name);
        let qualified = short.len() != name.len();
        let mut candidates = self
            .by_short_name
            .get(short)?
            .iter()
            .copied()
            .filter(|&i| !qualified || self.entities[i].namespace.is_none());
        let first = candidates.next()?;
        candidates.next().is_none().then_some(first)
    }

    /// Find an entity by class name.
    ///
    /// Accepts the fully-qualified name or, when it is unambiguous, the short
    /// class name.
    pub fn get_entity_by_classname(&self, name: &str) -> Option<&Entity> {
        self.position_by_classname(name).map(|i| &self.entities[i])
    }

    /// Find an entity by table name
    pub fn get_entity_by_table(&self, table: &str) -> Option<&Entity> {
        self.by_table.get(table).map(|&i| &self.entities[i])
    }

    /// Find an entity by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.by_id.get(&id).map(|&i| &self.entities[i])
    }

    /// All entities in registration order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Reciprocal accessors other entities requested for this one
    pub fn nm_mappings_for(&self, id: EntityId) -> &[NMMapping] {
        self.nm_mappings
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entity is registered
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether [`resolve_all`](Self::resolve_all) has run
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve references, index parts and collectors of every entity.
    ///
    /// Lookup failures are recorded as invalid resolutions and reported by
    /// [`validate_all`](Self::validate_all). Running it again recomputes
    /// every link.
    pub fn resolve_all(&mut self) {
        self.resolved = true;
        self.nm_mappings.clear();

        // References first: index parts and collectors read their columns.
        let references: Vec<Vec<ReferenceResolution>> = self
            .entities
            .iter()
            .map(|entity| {
                entity
                    .references
                    .iter()
                    .map(|reference| reference.resolve(self))
                    .collect()
            })
            .collect();

        for (entity, resolutions) in self.entities.iter_mut().zip(references) {
            for (reference, resolution) in entity.references.iter_mut().zip(resolutions) {
                reference.set_resolution(resolution);
            }
            entity.resolve_indexes();
        }

        let mut bindings: Vec<Vec<CollectorBinding>> = Vec::with_capacity(self.entities.len());
        let mut pending_mappings = Vec::new();
        for entity in &self.entities {
            let mut entity_bindings = Vec::with_capacity(entity.collectors.len());
            for collector in &entity.collectors {
                let (binding, nm_mapping) = collector.resolve(entity, self);
                entity_bindings.push(binding);
                pending_mappings.extend(nm_mapping);
            }
            bindings.push(entity_bindings);
        }

        for (entity, entity_bindings) in self.entities.iter_mut().zip(bindings) {
            for (collector, binding) in entity.collectors.iter_mut().zip(entity_bindings) {
                collector.set_binding(binding);
            }
        }

        for mapping in pending_mappings {
            self.nm_mappings
                .entry(mapping.entity)
                .or_default()
                .push(mapping);
        }

        tracing::debug!(
            entities = self.entities.len(),
            nm_mappings = self.nm_mappings.values().map(Vec::len).sum::<usize>(),
            "resolved data model",
        );
    }

    /// Validate every entity and its members, collecting all findings
    pub fn validate_all(&self, logger: &mut dyn ValidationLogger) {
        if !self.resolved {
            tracing::warn!("validating a container that has not been resolved");
            logger.warn("data model validated before resolution".to_string());
        }

        for entity in &self.entities {
            entity.validate(logger);
        }
    }

    /// Resolve, then validate into a fresh log
    pub fn resolve_and_validate(&mut self) -> ValidationLog {
        self.resolve_all();
        let mut log = ValidationLog::new();
        self.validate_all(&mut log);
        log
    }

    /// Entities ordered so that referenced tables come before the tables
    /// referencing them. Entities on a reference cycle keep registration
    /// order after everything that can be ordered.
    pub fn entities_in_dependency_order(&self) -> Vec<&Entity> {
        let mut ordered = Vec::with_capacity(self.entities.len());
        let mut placed: HashSet<EntityId> = HashSet::new();

        loop {
            let before = ordered.len();
            for entity in &self.entities {
                if placed.contains(&entity.id) {
                    continue;
                }
                let ready = entity
                    .dependencies()
                    .iter()
                    .all(|dep| placed.contains(dep) || self.entity(*dep).is_none());
                if ready {
                    placed.insert(entity.id);
                    ordered.push(entity);
                }
            }
            if ordered.len() == before {
                break;
            }
        }

        for entity in &self.entities {
            if !placed.contains(&entity.id) {
                ordered.push(entity);
            }
        }
        ordered
    }
}

// ============================================================================
// Tests
// ============================================================================
