//! Core traits for Tablesmith
//!
//! Model elements report schema problems through a [`ValidationLogger`]
//! instead of returning early, so a single run can list every problem in the
//! model at once.

// ============================================================================
// ValidationErrorCode
// ============================================================================

/// Stable numeric error categories reported by the validation pass.
///
/// Report consumers match on the numeric value, so the numbers never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorCode {
    // Collector errors
    CollectorNameMissing,
    UnknownEntityReferenced,
    UnknownReference,
    UnknownMappingClass,

    // Entity errors
    EntityClassMissing,
    EntityTableMissing,
    NoPrimaryKey,

    // Attribute errors
    AttributeNameMissing,
    AttributeTypeMissing,
    DuplicateColumn,

    // Reference errors
    ReferenceNameMissing,
    ReferenceForeignClassUnknown,
    ReferenceWithoutMapping,
    ReferencedAttributeUnknown,

    // Index errors
    IndexNameMissing,
    IndexWithoutParts,
    IndexPartUnknownColumn,
}

impl ValidationErrorCode {
    /// Numeric code
    pub fn code(&self) -> u16 {
        match self {
            ValidationErrorCode::CollectorNameMissing => 400,
            ValidationErrorCode::UnknownEntityReferenced => 401,
            ValidationErrorCode::UnknownReference => 402,
            ValidationErrorCode::UnknownMappingClass => 403,
            ValidationErrorCode::EntityClassMissing => 410,
            ValidationErrorCode::EntityTableMissing => 411,
            ValidationErrorCode::NoPrimaryKey => 412,
            ValidationErrorCode::AttributeNameMissing => 420,
            ValidationErrorCode::AttributeTypeMissing => 421,
            ValidationErrorCode::DuplicateColumn => 422,
            ValidationErrorCode::ReferenceNameMissing => 430,
            ValidationErrorCode::ReferenceForeignClassUnknown => 431,
            ValidationErrorCode::ReferenceWithoutMapping => 432,
            ValidationErrorCode::ReferencedAttributeUnknown => 433,
            ValidationErrorCode::IndexNameMissing => 440,
            ValidationErrorCode::IndexWithoutParts => 441,
            ValidationErrorCode::IndexPartUnknownColumn => 442,
        }
    }
}

impl std::fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// ValidationLogger Trait
// ============================================================================

/// Sink for validation findings
pub trait ValidationLogger {
    /// Record an error
    fn error(&mut self, message: String, code: ValidationErrorCode);

    /// Record a non-fatal warning
    fn warn(&mut self, message: String);

    /// Whether any error has been recorded
    fn has_errors(&self) -> bool;
}

// ============================================================================
// Validatable Trait
// ============================================================================

/// Trait for model elements that can be validated
///
/// # Example
///
/// ```rust,ignore
/// use tablesmith_core::{Validatable, ValidationErrorCode, ValidationLogger};
///
/// struct Column {
///     name: String,
/// }
///
/// impl Validatable for Column {
///     fn validate(&self, logger: &mut dyn ValidationLogger) {
///         if self.name.is_empty() {
///             logger.error(
///                 "Column without name found".to_string(),
///                 ValidationErrorCode::AttributeNameMissing,
///             );
///         }
///     }
/// }
/// ```
pub trait Validatable {
    /// Append every problem found to the logger. Must not stop at the first.
    fn validate(&self, logger: &mut dyn ValidationLogger);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct VecLogger {
        errors: Vec<(String, u16)>,
        warnings: Vec<String>,
    }

    impl ValidationLogger for VecLogger {
        fn error(&mut self, message: String, code: ValidationErrorCode) {
            self.errors.push((message, code.code()));
        }

        fn warn(&mut self, message: String) {
            self.warnings.push(message);
        }

        fn has_errors(&self) -> bool {
            !self.errors.is_empty()
        }
    }

    struct TwoProblems;

    impl Validatable for TwoProblems {
        fn validate(&self, logger: &mut dyn ValidationLogger) {
            logger.error("first".to_string(), ValidationErrorCode::UnknownReference);
            logger.error("second".to_string(), ValidationErrorCode::UnknownMappingClass);
        }
    }

    #[test]
    fn test_collector_codes_are_stable() {
        assert_eq!(ValidationErrorCode::CollectorNameMissing.code(), 400);
        assert_eq!(ValidationErrorCode::UnknownEntityReferenced.code(), 401);
        assert_eq!(ValidationErrorCode::UnknownReference.code(), 402);
        assert_eq!(ValidationErrorCode::UnknownMappingClass.code(), 403);
        assert_eq!(ValidationErrorCode::UnknownReference.to_string(), "402");
    }

    #[test]
    fn test_validate_collects_all() {
        let mut logger = VecLogger::default();
        TwoProblems.validate(&mut logger);

        assert!(logger.has_errors());
        assert!(logger.warnings.is_empty());
        assert_eq!(
            logger.errors,
            vec![("first".to_string(), 402), ("second".to_string(), 403)]
        );
    }
}
