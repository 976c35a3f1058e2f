//! Core type definitions for Tablesmith
//!
//! This module contains the shared value types used across the workspace:
//! identifiers, the SQL dialect selector, referential actions, collector
//! kinds and the explicit resolution state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for entities
pub type EntityId = uuid::Uuid;

// ============================================================================
// Database Types
// ============================================================================

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
}

impl DatabaseType {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            DatabaseType::MySQL => "MySQL",
            DatabaseType::PostgreSQL => "PostgreSQL",
            DatabaseType::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mysqli" | "mariadb" => Ok(DatabaseType::MySQL),
            "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
            "sqlite" => Ok(DatabaseType::SQLite),
            other => Err(format!("unknown database type '{other}'")),
        }
    }
}

// ============================================================================
// Referential Actions
// ============================================================================

/// Foreign key action on delete/update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// Delete related records when parent is deleted
    Cascade,
    /// Set foreign key to NULL when parent is deleted
    SetNull,
    /// Prevent deletion if related records exist
    #[default]
    Restrict,
    /// Do nothing (database default)
    NoAction,
    /// Set to default value
    SetDefault,
}

impl ReferentialAction {
    /// Get SQL keyword
    pub fn to_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

impl FromStr for ReferentialAction {
    type Err = String;

    /// Accepts the SQL keyword in any case, with spaces or underscores
    /// (`set null`, `SET_NULL`, `setnull`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "cascade" => Ok(ReferentialAction::Cascade),
            "setnull" => Ok(ReferentialAction::SetNull),
            "restrict" => Ok(ReferentialAction::Restrict),
            "noaction" => Ok(ReferentialAction::NoAction),
            "setdefault" => Ok(ReferentialAction::SetDefault),
            _ => Err(format!("unknown referential action '{}'", s.trim())),
        }
    }
}

// ============================================================================
// Collector Kinds
// ============================================================================

/// Relationship type of a collector, with the fields each variant requires
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectorKind {
    /// One-to-many: the foreign entity holds a reference back to this entity
    OneToMany {
        foreign_class: String,
        reference_name: String,
    },
    /// Many-to-many through a mapping (join) entity
    ManyToMany {
        foreign_class: String,
        mapping_class: String,
        reference_name: String,
    },
}

impl CollectorKind {
    /// Tag used in the XML `type` attribute for one-to-many
    pub const ONE_N: &'static str = "1n";

    /// Tag used in the XML `type` attribute for many-to-many
    pub const N_M: &'static str = "nm";

    /// Build a kind from its XML tag. `mapping_class` is required for `nm`.
    pub fn from_tag(
        tag: &str,
        foreign_class: impl Into<String>,
        mapping_class: Option<String>,
        reference_name: impl Into<String>,
    ) -> Result<Self, String> {
        match tag.trim().to_ascii_lowercase().as_str() {
            Self::ONE_N => Ok(CollectorKind::OneToMany {
                foreign_class: foreign_class.into(),
                reference_name: reference_name.into(),
            }),
            Self::N_M => match mapping_class {
                Some(mapping_class) => Ok(CollectorKind::ManyToMany {
                    foreign_class: foreign_class.into(),
                    mapping_class,
                    reference_name: reference_name.into(),
                }),
                None => Err("collector type 'nm' requires a mapping class".to_string()),
            },
            other => Err(format!(
                "unknown collector type '{other}' (expected '1n' or 'nm')"
            )),
        }
    }

    /// Get the XML tag
    pub fn tag(&self) -> &'static str {
        match self {
            CollectorKind::OneToMany { .. } => Self::ONE_N,
            CollectorKind::ManyToMany { .. } => Self::N_M,
        }
    }

    /// Class name of the collected entity
    pub fn foreign_class(&self) -> &str {
        match self {
            CollectorKind::OneToMany { foreign_class, .. }
            | CollectorKind::ManyToMany { foreign_class, .. } => foreign_class,
        }
    }

    /// Name of the reference the collector goes through
    pub fn reference_name(&self) -> &str {
        match self {
            CollectorKind::OneToMany { reference_name, .. }
            | CollectorKind::ManyToMany { reference_name, .. } => reference_name,
        }
    }

    /// Class name of the mapping entity (many-to-many only)
    pub fn mapping_class(&self) -> Option<&str> {
        match self {
            CollectorKind::OneToMany { .. } => None,
            CollectorKind::ManyToMany { mapping_class, .. } => Some(mapping_class),
        }
    }

    /// Check if this is a many-to-many collector
    pub fn is_many_to_many(&self) -> bool {
        matches!(self, CollectorKind::ManyToMany { .. })
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            CollectorKind::OneToMany { .. } => "One to Many",
            CollectorKind::ManyToMany { .. } => "Many to Many",
        }
    }
}

impl std::fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Resolution State
// ============================================================================

/// Lazily resolved cross-entity link.
///
/// `Unresolved` means resolution has not run yet; `Invalid` means it ran and
/// the link could not be established, with the reason `E`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T, E = String> {
    Unresolved,
    Resolved(T),
    Invalid(E),
}

impl<T, E> Resolution<T, E> {
    /// Get the resolved value
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Resolution::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Check if resolution succeeded
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Check if resolution has not run yet
    pub fn is_pending(&self) -> bool {
        matches!(self, Resolution::Unresolved)
    }

    /// Get the failure reason
    pub fn invalid_reason(&self) -> Option<&E> {
        match self {
            Resolution::Invalid(reason) => Some(reason),
            _ => None,
        }
    }
}

impl<T, E> Default for Resolution<T, E> {
    fn default() -> Self {
        Resolution::Unresolved
    }
}

impl<T, E> From<Result<T, E>> for Resolution<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Resolution::Resolved(value),
            Err(reason) => Resolution::Invalid(reason),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
