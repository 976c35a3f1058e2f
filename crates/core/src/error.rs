//! Error types for Tablesmith
//!
//! This module provides unified error handling across the workspace. Schema
//! problems found by the validation pass are *not* reported through these
//! errors; they are collected by a [`ValidationLogger`](crate::ValidationLogger).
//! `EngineError` covers contract violations, IO and parse failures.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Tablesmith
#[derive(Debug, Error)]
pub enum EngineError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// General validation error (e.g. generation refused on an invalid model)
    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // Not Found Errors
    // ========================================================================
    /// Entity not found
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    // ========================================================================
    // Container Contract Errors
    // ========================================================================
    /// Duplicate class or table name
    #[error("Duplicate entity: {kind} '{name}' already exists")]
    DuplicateEntity { kind: &'static str, name: String },

    /// Entity registered or extended after resolution started
    #[error("Cannot {action} entity '{class}': the data model container is already resolved")]
    ContainerFrozen { action: &'static str, class: String },

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// XML document could not be parsed
    #[error("Failed to parse XML '{path}': {message}")]
    XmlParse { path: PathBuf, message: String },

    /// File IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// File write error
    #[error("Failed to write file '{path}': {message}")]
    FileWrite { path: PathBuf, message: String },

    /// Directory creation failed
    #[error("Failed to create directory '{path}': {message}")]
    DirectoryCreate { path: PathBuf, message: String },

    /// Output file already exists and overwriting is disabled
    #[error("Output file already exists: {0}")]
    OutputExists(PathBuf),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Feature not implemented
    #[error("Feature not implemented: {0}")]
    NotImplemented(String),
}

impl EngineError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    /// Create a duplicate class name error
    pub fn duplicate_class(name: impl Into<String>) -> Self {
        EngineError::DuplicateEntity {
            kind: "class",
            name: name.into(),
        }
    }

    /// Create a duplicate table name error
    pub fn duplicate_table(name: impl Into<String>) -> Self {
        EngineError::DuplicateEntity {
            kind: "table",
            name: name.into(),
        }
    }

    /// Create a frozen-container error for `action` ("register", "extend")
    pub fn frozen(action: &'static str, class: impl Into<String>) -> Self {
        EngineError::ContainerFrozen {
            action,
            class: class.into(),
        }
    }

    /// Create an XML parse error
    pub fn xml(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        EngineError::XmlParse {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::Internal(msg.into())
    }

    /// Check if this error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::EntityNotFound(_))
    }

    /// Check if this error is a container misuse
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            EngineError::DuplicateEntity { .. } | EngineError::ContainerFrozen { .. }
        )
    }

    /// Check if this error is an IO error
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            EngineError::Io(_)
                | EngineError::FileRead { .. }
                | EngineError::FileWrite { .. }
                | EngineError::DirectoryCreate { .. }
        )
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_error() {
        let err = EngineError::validation("3 schema errors");
        assert!(err.is_validation());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Validation error: 3 schema errors");
    }

    #[test]
    fn test_duplicate_errors() {
        let err = EngineError::duplicate_class("Order");
        assert!(err.is_contract_violation());
        assert_eq!(
            err.to_string(),
            "Duplicate entity: class 'Order' already exists"
        );

        let err = EngineError::duplicate_table("orders");
        assert_eq!(
            err.to_string(),
            "Duplicate entity: table 'orders' already exists"
        );
    }

    #[test]
    fn test_frozen_container() {
        let err = EngineError::frozen("extend", "Order");
        assert!(err.is_contract_violation());
        assert_eq!(
            err.to_string(),
            "Cannot extend entity 'Order': the data model container is already resolved"
        );
    }

    #[test]
    fn test_not_found_errors() {
        let err = EngineError::EntityNotFound("Order".to_string());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Entity not found: Order");
    }

    #[test]
    fn test_xml_error() {
        let err = EngineError::xml("schema.xml", "unexpected end of file");
        assert_eq!(
            err.to_string(),
            "Failed to parse XML 'schema.xml': unexpected end of file"
        );
    }

    #[test]
    fn test_output_exists() {
        let err = EngineError::OutputExists("out/src/models/mod.rs".into());
        assert!(!err.is_io());
        assert_eq!(
            err.to_string(),
            "Output file already exists: out/src/models/mod.rs"
        );
    }

    #[test]
    fn test_io_error_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EngineError = io_err.into();
        assert!(err.is_io());
    }
}
