//! # Tablesmith Core
//!
//! Core types, traits, and error handling for Tablesmith.
//!
//! This crate provides the foundational building blocks used throughout
//! the workspace, including:
//!
//! - **Types**: dialect selector, referential actions, collector kinds and
//!   the explicit [`Resolution`] state of cross-entity links
//! - **Traits**: [`Validatable`] and the [`ValidationLogger`] sink
//! - **Errors**: Unified error handling with `EngineError` and `EngineResult`
//!

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{EngineError, EngineResult};
pub use traits::{Validatable, ValidationErrorCode, ValidationLogger};
pub use types::{CollectorKind, DatabaseType, EntityId, ReferentialAction, Resolution};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
