//! Validation results for the data model
//!
//! `ValidationLog` is the standard [`ValidationLogger`]: it keeps every
//! finding in the order it was reported so callers can print, count or
//! serialize them after the pass completes.

use serde::Serialize;
use tablesmith_core::{EngineError, EngineResult, ValidationErrorCode, ValidationLogger};

// ============================================================================
// ValidationEntry
// ============================================================================

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationEntry {
    /// Human-readable message
    pub message: String,

    /// Stable numeric code; `None` for warnings
    pub code: Option<u16>,

    pub severity: Severity,
}

impl std::fmt::Display for ValidationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.severity, self.code) {
            (Severity::Error, Some(code)) => write!(f, "[E{}] {}", code, self.message),
            (Severity::Error, None) => write!(f, "[E] {}", self.message),
            (Severity::Warning, _) => write!(f, "[W] {}", self.message),
        }
    }
}

// ============================================================================
// ValidationLog
// ============================================================================

/// Collect-all validation sink
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationLog {
    errors: Vec<ValidationEntry>,
    warnings: Vec<ValidationEntry>,
}

impl ValidationLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors in report order
    pub fn errors(&self) -> &[ValidationEntry] {
        &self.errors
    }

    /// Warnings in report order
    pub fn warnings(&self) -> &[ValidationEntry] {
        &self.warnings
    }

    /// Numeric codes of all errors, in report order
    pub fn codes(&self) -> Vec<u16> {
        self.errors.iter().filter_map(|e| e.code).collect()
    }

    /// Whether an error with the given code was reported
    pub fn has_code(&self, code: u16) -> bool {
        self.errors.iter().any(|e| e.code == Some(code))
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether nothing at all was reported
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Merge another log into this one
    pub fn merge(&mut self, other: ValidationLog) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::internal(format!("failed to serialize validation log: {e}")))
    }

    /// Convert to EngineResult (fails if any errors)
    pub fn to_result(&self) -> EngineResult<()> {
        if self.errors.is_empty() {
            return Ok(());
        }

        let msg = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(EngineError::validation(msg))
    }
}

impl ValidationLogger for ValidationLog {
    fn error(&mut self, message: String, code: ValidationErrorCode) {
        tracing::debug!(code = code.code(), %message, "validation error");
        self.errors.push(ValidationEntry {
            message,
            code: Some(code.code()),
            severity: Severity::Error,
        });
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(ValidationEntry {
            message,
            code: None,
            severity: Severity::Warning,
        });
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl std::fmt::Display for ValidationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in self.errors.iter().chain(&self.warnings) {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log_is_ok() {
        let log = ValidationLog::new();
        assert!(log.is_empty());
        assert!(!log.has_errors());
        assert!(log.to_result().is_ok());
    }

    #[test]
    fn test_collects_everything() {
        let mut log = ValidationLog::new();
        log.error(
            "Collector without name found".to_string(),
            ValidationErrorCode::CollectorNameMissing,
        );
        log.warn("unused mapping entity".to_string());
        log.error(
            "Collector 'items' refers to unknown reference order".to_string(),
            ValidationErrorCode::UnknownReference,
        );

        assert_eq!(log.codes(), vec![400, 402]);
        assert!(log.has_code(402));
        assert!(!log.has_code(403));
        assert!(log.has_warnings());

        let err = log.to_result().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("[E402]"));
    }

    #[test]
    fn test_display_and_json() {
        let mut log = ValidationLog::new();
        log.error(
            "Entity 'Order' has no primary key".to_string(),
            ValidationErrorCode::NoPrimaryKey,
        );
        log.warn("careful".to_string());

        let text = log.to_string();
        assert_eq!(text, "[E412] Entity 'Order' has no primary key\n[W] careful\n");

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["errors"][0]["code"], 412);
        assert_eq!(json["warnings"][0]["severity"], "warning");
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationLog::new();
        let mut b = ValidationLog::new();
        b.error("x".to_string(), ValidationErrorCode::IndexNameMissing);
        a.merge(b);
        assert_eq!(a.codes(), vec![440]);
    }
}
