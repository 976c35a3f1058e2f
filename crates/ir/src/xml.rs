//! XML schema reader
//!
//! Parses schema documents into entities and entity extensions with a
//! quick-xml pull parser. `entity` and `entity-extension` elements are picked
//! up at any depth; their children describe attributes, references, indexes
//! and collectors:
//!
//! ```xml
//! <entity name="OrderLine" namespace="App\Model" table="order_lines">
//!     <attribute name="id" dbType="INT" primaryKey="true" autoValue="autoincrement"/>
//!     <reference name="order" foreignClass="Order" onDelete="cascade">
//!         <mapping name="order_id" foreignAttribute="id"/>
//!     </reference>
//!     <index name="idx_order" unique="false" type="btree">
//!         <indexPart attributeName="order_id" sortOrder="ASC"/>
//!     </index>
//! </entity>
//! <entity-extension name="Order">
//!     <collector name="items" type="1n" foreignClass="OrderLine" reference="order"/>
//! </entity-extension>
//! ```
//!
//! Given the time of the last generation run, the loader flags every entity
//! and extension with whether its file was modified since then.

use crate::attribute::Attribute;
use crate::collector::Collector;
use crate::container::DataModelContainer;
use crate::entity::{Entity, EntityExtension};
use crate::index::{Index, IndexPart};
use crate::naming::{default_table_name, reference_column_name};
use crate::reference::Reference;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tablesmith_core::{CollectorKind, EngineError, EngineResult};

// ============================================================================
// SchemaDocument
// ============================================================================

/// Everything read from one or more schema files
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    pub entities: Vec<Entity>,
    pub extensions: Vec<EntityExtension>,
}

impl SchemaDocument {
    /// Append the contents of another document
    pub fn merge(&mut self, other: SchemaDocument) {
        self.entities.extend(other.entities);
        self.extensions.extend(other.extensions);
    }

    /// Flag every entity and extension as changed or unchanged
    pub fn mark_changed(&mut self, changed: bool) {
        for entity in &mut self.entities {
            entity.has_changed_since_last_generation = changed;
        }
        for extension in &mut self.extensions {
            extension.has_changed_since_last_generation = changed;
        }
    }

    /// Register every entity, then apply every extension
    pub fn into_container(self) -> EngineResult<DataModelContainer> {
        let mut container = DataModelContainer::new();
        for entity in self.entities {
            container.register_entity(entity)?;
        }
        for extension in self.extensions {
            container.apply_extension(extension)?;
        }
        Ok(container)
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Read a single schema file.
///
/// Without `last_generation` everything counts as changed; otherwise the
/// document's entities and extensions are changed when the file was
/// modified after that time.
pub fn parse_file(
    path: impl AsRef<Path>,
    last_generation: Option<SystemTime>,
) -> EngineResult<SchemaDocument> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut document = parse_str(&content, path)?;
    document.mark_changed(has_changed(path, last_generation));
    Ok(document)
}

/// Load every file into a fresh container.
///
/// Entities from all files are registered before any extension is applied,
/// so an extension may target an entity declared in a later file.
pub fn load_container<P: AsRef<Path>>(
    paths: &[P],
    last_generation: Option<SystemTime>,
) -> EngineResult<DataModelContainer> {
    let mut document = SchemaDocument::default();
    for path in paths {
        document.merge(parse_file(path, last_generation)?);
    }

    tracing::info!(
        files = paths.len(),
        entities = document.entities.len(),
        extensions = document.extensions.len(),
        changed = document
            .entities
            .iter()
            .filter(|e| e.has_changed_since_last_generation)
            .count(),
        "loaded schema",
    );

    document.into_container()
}

/// Modified after `last_generation`; an unreadable mtime counts as changed
fn has_changed(path: &Path, last_generation: Option<SystemTime>) -> bool {
    let Some(last_generation) = last_generation else {
        return true;
    };
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified > last_generation,
        Err(err) => {
            tracing::debug!(
                path = %path.display(),
                %err,
                "no modification time, assuming changed",
            );
            true
        }
    }
}

/// Parse schema XML; `source` names the input in error messages
pub fn parse_str(xml: &str, source: impl AsRef<Path>) -> EngineResult<SchemaDocument> {
    let source = source.as_ref();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut parser = SchemaParser::new(source);
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            EngineError::xml(
                source,
                format!("XML parse error at position {}: {}", reader.buffer_position(), e),
            )
        })?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) => {
                let tag_name = local_name_str(e.name().as_ref());
                let attrs = collect_attributes(e, source)?;
                parser.start(&tag_name, &attrs)?;

                if matches!(event, Event::Empty(_)) {
                    parser.end(&tag_name)?;
                }
            }
            Event::End(ref e) => {
                let tag_name = local_name_str(e.name().as_ref());
                parser.end(&tag_name)?;
            }
            _ => {}
        }

        buf.clear();
    }

    parser.finish()
}

// ============================================================================
// Parser state
// ============================================================================

/// Entity or extension currently being filled
enum Target {
    Entity(Entity),
    Extension(EntityExtension),
}

impl Target {
    fn add_attribute(&mut self, attribute: Attribute) {
        match self {
            Target::Entity(entity) => entity.add_attribute(attribute),
            Target::Extension(extension) => extension.attributes.push(attribute),
        }
    }

    fn add_reference(&mut self, reference: Reference) {
        match self {
            Target::Entity(entity) => entity.add_reference(reference),
            Target::Extension(extension) => extension.references.push(reference),
        }
    }

    fn add_index(&mut self, index: Index) {
        match self {
            Target::Entity(entity) => entity.add_index(index),
            Target::Extension(extension) => extension.indexes.push(index),
        }
    }

    fn add_collector(&mut self, collector: Collector) {
        match self {
            Target::Entity(entity) => entity.add_collector(collector),
            Target::Extension(extension) => extension.collectors.push(collector),
        }
    }
}

struct SchemaParser<'a> {
    source: &'a Path,
    document: SchemaDocument,
    target: Option<Target>,
    reference: Option<Reference>,
    index: Option<Index>,
}

type Attrs = [(String, String)];

impl<'a> SchemaParser<'a> {
    fn new(source: &'a Path) -> Self {
        Self {
            source,
            document: SchemaDocument::default(),
            target: None,
            reference: None,
            index: None,
        }
    }

    fn error(&self, message: impl Into<String>) -> EngineError {
        EngineError::xml(self.source, message)
    }

    fn target(&mut self, tag: &str) -> EngineResult<&mut Target> {
        let source = self.source;
        self.target.as_mut().ok_or_else(|| {
            EngineError::xml(
                source,
                format!("<{tag}> must be inside <entity> or <entity-extension>"),
            )
        })
    }

    fn start(&mut self, tag: &str, attrs: &Attrs) -> EngineResult<()> {
        match tag {
            "entity" | "entity-extension" => {
                if self.target.is_some() {
                    return Err(self.error(format!("<{tag}> cannot be nested")));
                }
                self.target = Some(if tag == "entity" {
                    Target::Entity(self.read_entity(attrs))
                } else {
                    let class_name = get_attr(attrs, "name").unwrap_or_default();
                    Target::Extension(EntityExtension::new(class_name))
                });
            }
            "attribute" => {
                let attribute = self.read_attribute(attrs)?;
                self.target(tag)?.add_attribute(attribute);
            }
            "reference" => {
                self.target(tag)?;
                self.reference = Some(self.read_reference(attrs)?);
            }
            "mapping" => {
                let source = self.source;
                let reference = self.reference.as_mut().ok_or_else(|| {
                    EngineError::xml(source, "<mapping> must be inside <reference>")
                })?;
                let foreign_attribute = get_attr(attrs, "foreignAttribute").unwrap_or_default();
                let column = get_attr(attrs, "name")
                    .unwrap_or_else(|| reference_column_name(&reference.name, &foreign_attribute));
                reference
                    .mappings
                    .push(crate::reference::ReferenceMapping::new(column, foreign_attribute));
            }
            "index" => {
                self.target(tag)?;
                self.index = Some(self.read_index(attrs)?);
            }
            "indexPart" => {
                let part = self.read_index_part(attrs)?;
                let source = self.source;
                let index = self.index.as_mut().ok_or_else(|| {
                    EngineError::xml(source, "<indexPart> must be inside <index>")
                })?;
                index.parts.push(part);
            }
            "collector" => {
                let collector = self.read_collector(attrs)?;
                self.target(tag)?.add_collector(collector);
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, tag: &str) -> EngineResult<()> {
        match tag {
            "entity" | "entity-extension" => match self.target.take() {
                Some(Target::Entity(entity)) => self.document.entities.push(entity),
                Some(Target::Extension(extension)) => self.document.extensions.push(extension),
                None => {}
            },
            "reference" => {
                if let Some(reference) = self.reference.take() {
                    self.target(tag)?.add_reference(reference);
                }
            }
            "index" => {
                if let Some(index) = self.index.take() {
                    self.target(tag)?.add_index(index);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> EngineResult<SchemaDocument> {
        if self.target.is_some() {
            return Err(self.error("unexpected end of document inside <entity>"));
        }
        Ok(self.document)
    }

    // ========================================================================
    // Element readers
    // ========================================================================

    fn read_entity(&self, attrs: &Attrs) -> Entity {
        let class_name = get_attr(attrs, "name").unwrap_or_default();
        let table = get_attr(attrs, "table").unwrap_or_else(|| default_table_name(&class_name));
        let mut entity = Entity::new(class_name, table);
        if let Some(namespace) = get_attr(attrs, "namespace") {
            entity = entity.with_namespace(namespace);
        }
        entity
    }

    fn read_attribute(&self, attrs: &Attrs) -> EngineResult<Attribute> {
        let name = get_attr(attrs, "name").unwrap_or_default();
        let mut attribute = Attribute::new(name, get_attr(attrs, "dbType").unwrap_or_default());

        if let Some(database_name) = get_attr(attrs, "dbName") {
            attribute = attribute.with_database_name(database_name);
        }
        attribute.is_primary_key = self.read_bool(attrs, "primaryKey")?;
        attribute.is_required = self.read_bool(attrs, "required")?;
        attribute.auto_value = get_attr(attrs, "autoValue");
        attribute.default_value = get_attr(attrs, "defaultValue");
        Ok(attribute)
    }

    fn read_reference(&self, attrs: &Attrs) -> EngineResult<Reference> {
        let mut reference = Reference::new(
            get_attr(attrs, "name").unwrap_or_default(),
            get_attr(attrs, "foreignClass").unwrap_or_default(),
        );

        if let Some(constraint_name) = get_attr(attrs, "constraintName") {
            reference = reference.with_constraint_name(constraint_name);
        }
        if let Some(action) = get_attr(attrs, "onDelete") {
            reference.on_delete = action.parse().map_err(|e: String| self.error(e))?;
        }
        if let Some(action) = get_attr(attrs, "onUpdate") {
            reference.on_update = action.parse().map_err(|e: String| self.error(e))?;
        }
        reference.is_required = self.read_bool(attrs, "required")?;
        Ok(reference)
    }

    fn read_index(&self, attrs: &Attrs) -> EngineResult<Index> {
        let mut index = Index::new(get_attr(attrs, "name").unwrap_or_default());
        index.is_unique = self.read_bool(attrs, "unique")?;
        if let Some(index_type) = get_attr(attrs, "type") {
            index.set_index_type(index_type);
        }
        Ok(index)
    }

    fn read_index_part(&self, attrs: &Attrs) -> EngineResult<IndexPart> {
        let mut part = IndexPart::new(get_attr(attrs, "attributeName").unwrap_or_default());

        if let Some(sort_order) = get_attr(attrs, "sortOrder").filter(|s| !s.trim().is_empty()) {
            part.sort_order = Some(sort_order.parse().map_err(|e: String| self.error(e))?);
        }
        if let Some(length) = get_attr(attrs, "length").filter(|s| !s.trim().is_empty()) {
            let length = length
                .trim()
                .parse::<u32>()
                .map_err(|e| self.error(format!("invalid index part length '{length}': {e}")))?;
            part.length = Some(length);
        }
        Ok(part)
    }

    fn read_collector(&self, attrs: &Attrs) -> EngineResult<Collector> {
        let name = get_attr(attrs, "name").unwrap_or_default();
        let kind = CollectorKind::from_tag(
            &get_attr(attrs, "type").unwrap_or_default(),
            get_attr(attrs, "foreignClass").unwrap_or_default(),
            get_attr(attrs, "mappingClass"),
            get_attr(attrs, "reference").unwrap_or_default(),
        )
        .map_err(|e| self.error(format!("collector '{name}': {e}")))?;
        Ok(Collector::new(name, kind))
    }

    fn read_bool(&self, attrs: &Attrs, name: &str) -> EngineResult<bool> {
        match get_attr(attrs, name) {
            None => Ok(false),
            Some(value) => parse_bool(&value)
                .ok_or_else(|| self.error(format!("invalid boolean '{value}' for '{name}'"))),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

fn get_attr(attrs: &Attrs, name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Collect attributes of a start tag into (name, value) pairs
fn collect_attributes(e: &BytesStart<'_>, source: &Path) -> EngineResult<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|err| {
            EngineError::xml(source, format!("Failed to parse XML attribute: {err}"))
        })?;
        let key = local_name_str(attr.key.as_ref());
        let value = attr
            .unescape_value()
            .map_err(|err| EngineError::xml(source, format!("Invalid attribute value: {err}")))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

/// Local name of a possibly prefixed tag (`s:entity` → `entity`)
fn local_name_str(name: &[u8]) -> String {
    let full = String::from_utf8_lossy(name);
    match full.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => full.to_string(),
    }
}

/// Path used in errors for in-memory input
pub fn inline_source() -> PathBuf {
    PathBuf::from("<inline>")
}

// ============================================================================
// Tests
// ============================================================================
