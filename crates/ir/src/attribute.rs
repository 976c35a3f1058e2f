//! Attribute definitions for entities
//!
//! An `Attribute` maps to one column of the entity's table.

use serde::{Deserialize, Serialize};
use tablesmith_core::{Validatable, ValidationErrorCode, ValidationLogger};

// ============================================================================
// Attribute
// ============================================================================

/// Represents one column of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Model name (e.g., "email")
    pub name: String,

    /// Column name in the database (defaults to `name`)
    pub database_name: String,

    /// Column type as written in the schema (e.g., "VARCHAR(100)")
    pub database_type: String,

    /// Whether the column is part of the primary key
    pub is_primary_key: bool,

    /// Whether the column is NOT NULL
    pub is_required: bool,

    /// Value generator (e.g., "autoincrement", "uuid")
    pub auto_value: Option<String>,

    /// Default value as SQL literal
    pub default_value: Option<String>,
}

impl Attribute {
    /// Create a new attribute; the database name defaults to the model name
    pub fn new(name: impl Into<String>, database_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            database_name: name.clone(),
            name,
            database_type: database_type.into(),
            is_primary_key: false,
            is_required: false,
            auto_value: None,
            default_value: None,
        }
    }

    /// Integer auto-increment primary key column named `id`
    pub fn primary_key() -> Self {
        Self::new("id", "INT")
            .primary()
            .with_auto_value("autoincrement")
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the column name
    pub fn with_database_name(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = database_name.into();
        self
    }

    /// Mark as primary key (implies required)
    pub fn primary(mut self) -> Self {
        self.is_primary_key = true;
        self.is_required = true;
        self
    }

    /// Mark as NOT NULL
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Set the value generator
    pub fn with_auto_value(mut self, auto_value: impl Into<String>) -> Self {
        self.auto_value = Some(auto_value.into());
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Database type trimmed and upper-cased, used for comparisons
    pub fn normalized_type(&self) -> String {
        self.database_type.trim().to_ascii_uppercase()
    }

    /// Whether two attributes have the same column type
    pub fn same_type_as(&self, other: &Attribute) -> bool {
        self.normalized_type() == other.normalized_type()
    }

    /// Whether the value is generated by the database on insert
    pub fn is_auto_increment(&self) -> bool {
        self.auto_value
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("autoincrement"))
    }
}

impl Validatable for Attribute {
    fn validate(&self, logger: &mut dyn ValidationLogger) {
        if self.name.trim().is_empty() {
            logger.error(
                "Attribute without name found".to_string(),
                ValidationErrorCode::AttributeNameMissing,
            );
        }

        if self.database_type.trim().is_empty() {
            logger.error(
                format!("Attribute '{}' has no database type", self.name),
                ValidationErrorCode::AttributeTypeMissing,
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationLog;

    #[test]
    fn test_attribute_new() {
        let attr = Attribute::new("email", "VARCHAR(100)");
        assert_eq!(attr.name, "email");
        assert_eq!(attr.database_name, "email");
        assert!(!attr.is_primary_key);
        assert!(!attr.is_required);
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::new("createdAt", "datetime")
            .with_database_name("created_at")
            .required()
            .with_default("CURRENT_TIMESTAMP");

        assert_eq!(attr.database_name, "created_at");
        assert!(attr.is_required);
        assert_eq!(attr.default_value.as_deref(), Some("CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_primary_key() {
        let pk = Attribute::primary_key();
        assert!(pk.is_primary_key);
        assert!(pk.is_required);
        assert!(pk.is_auto_increment());
    }

    #[test]
    fn test_type_comparison_ignores_case() {
        let a = Attribute::new("name", "varchar(50)");
        let b = Attribute::new("name", " VARCHAR(50) ");
        let c = Attribute::new("name", "VARCHAR(80)");

        assert!(a.same_type_as(&b));
        assert!(!a.same_type_as(&c));
    }

    #[test]
    fn test_attribute_validation() {
        let mut log = ValidationLog::new();
        Attribute::new("", "").validate(&mut log);

        assert_eq!(log.codes(), vec![420, 421]);
    }
}
