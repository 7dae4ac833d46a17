//! Diagnostics published for a document.
//!
//! Diagnostics come from external analysers; the only one wired up is
//! [`phpstan`], which turns `phpstan analyse --error-format=json` output into
//! protocol diagnostics against the analysed document.

pub mod phpstan;

pub use lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};
