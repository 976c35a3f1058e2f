//! Index definitions for entities

use crate::entity::Entity;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tablesmith_core::{Validatable, ValidationErrorCode, ValidationLogger};

// ============================================================================
// SortOrder
// ============================================================================

/// Sort direction of an index part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Get SQL keyword
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

// ============================================================================
// IndexPart
// ============================================================================

/// One column of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPart {
    /// Attribute name (or reference column name) the part binds to
    pub column: String,

    /// Optional sort direction
    pub sort_order: Option<SortOrder>,

    /// Optional prefix length
    pub length: Option<u32>,

    /// Column name after resolution against the owning entity
    #[serde(skip)]
    database_name: Option<String>,
}

impl IndexPart {
    /// Create a part for the given column
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sort_order: None,
            length: None,
            database_name: None,
        }
    }

    /// Set the sort direction
    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    /// Set the prefix length
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Resolved column name, if the part binds to a known column
    pub fn resolved_database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    /// Column name to emit: the resolved name, or the declared one
    pub fn database_name(&self) -> &str {
        self.database_name.as_deref().unwrap_or(&self.column)
    }

    /// Whether two parts describe the same index column
    pub fn same_as(&self, other: &IndexPart) -> bool {
        let sort_order = |part: &IndexPart| part.sort_order.unwrap_or(SortOrder::Asc);
        self.database_name() == other.database_name()
            && sort_order(self) == sort_order(other)
            && self.length == other.length
    }
}

// ============================================================================
// Index
// ============================================================================

/// Represents a table index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name
    pub name: String,

    /// Whether the index is unique
    pub is_unique: bool,

    /// Index type, lower-case (e.g., "btree", "hash", "fulltext")
    index_type: Option<String>,

    /// Ordered index parts
    pub parts: Vec<IndexPart>,
}

impl Index {
    /// Create a new non-unique index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_unique: false,
            index_type: None,
            parts: Vec::new(),
        }
    }

    /// Mark as unique
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Set the index type
    pub fn with_index_type(mut self, index_type: impl Into<String>) -> Self {
        self.set_index_type(index_type);
        self
    }

    /// Add a part
    pub fn with_part(mut self, part: IndexPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a part for a column with default direction and length
    pub fn on(self, column: impl Into<String>) -> Self {
        self.with_part(IndexPart::new(column))
    }

    /// Set the index type; stored lower-case, blank clears it
    pub fn set_index_type(&mut self, index_type: impl Into<String>) {
        let index_type = index_type.into().trim().to_lowercase();
        self.index_type = (!index_type.is_empty()).then_some(index_type);
    }

    /// Index type, lower-case
    pub fn index_type(&self) -> Option<&str> {
        self.index_type.as_deref()
    }

    /// Look up the column every part binds to on the owning entity.
    ///
    /// Parts match an attribute by name or database name, then a reference
    /// column by name. Unmatched parts yield `None` and are reported by
    /// validation.
    pub fn resolve_parts(&self, entity: &Entity) -> Vec<Option<String>> {
        self.parts
            .iter()
            .map(|part| {
                entity
                    .get_attribute(&part.column)
                    .or_else(|| entity.get_attribute_by_database_name(&part.column))
                    .map(|attr| attr.database_name.clone())
                    .or_else(|| {
                        entity
                            .references
                            .iter()
                            .flat_map(|r| r.column_names())
                            .find(|c| *c == part.column)
                            .map(str::to_string)
                    })
            })
            .collect()
    }

    /// Store the outcome of [`resolve_parts`](Self::resolve_parts)
    pub fn apply_resolution(&mut self, columns: Vec<Option<String>>) {
        for (part, column) in self.parts.iter_mut().zip(columns) {
            part.database_name = column;
        }
    }

    /// Resolve against an entity this index is not (yet) part of
    pub fn resolve(&mut self, entity: &Entity) {
        let columns = self.resolve_parts(entity);
        self.apply_resolution(columns);
    }

    /// Whether both indexes have the same uniqueness, type and parts
    pub fn same_definition(&self, other: &Index) -> bool {
        self.is_unique == other.is_unique
            && self.index_type == other.index_type
            && self.parts.len() == other.parts.len()
            && self.parts.iter().zip(&other.parts).all(|(a, b)| a.same_as(b))
    }
}

impl Validatable for Index {
    fn validate(&self, logger: &mut dyn ValidationLogger) {
        if self.name.trim().is_empty() {
            logger.error(
                "Index without name found".to_string(),
                ValidationErrorCode::IndexNameMissing,
            );
        }

        if self.parts.is_empty() {
            logger.error(
                format!("Index '{}' has no index parts", self.name),
                ValidationErrorCode::IndexWithoutParts,
            );
        }

        for part in &self.parts {
            if part.resolved_database_name().is_none() {
                logger.error(
                    format!(
                        "Index '{}' refers to unknown column {}",
                        self.name, part.column
                    ),
                    ValidationErrorCode::IndexPartUnknownColumn,
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
