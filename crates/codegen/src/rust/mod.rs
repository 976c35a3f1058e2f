//! # Rust Code Generation
//!
//! Generators that emit Rust source files. Generated code is built as
//! plain strings; every file starts with [`file_header`].

pub mod models;

pub use models::generate_models;

/// Module-level header for a generated file
pub fn file_header(description: &str) -> String {
    format!("//! {description}\n//!\n//! Generated by tablesmith. Do not edit by hand.\n\n")
}

/// `///` doc comment lines at the given indentation
pub fn doc_comment(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                format!("{pad}///\n")
            } else {
                format!("{pad}/// {line}\n")
            }
        })
        .collect()
}
